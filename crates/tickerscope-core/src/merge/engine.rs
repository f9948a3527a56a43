//! Folding a crawl into the persistent per-symbol record.
//!
//! Scalar fields take the crawl's inferred values except where a field is
//! protected and already set. Each source keeps only its latest crawl.

use tracing::debug;

use crate::models::{CanonicalKey, MergeConfig, PageCrawlRecord, TickerRecord};
use crate::schedule::{Clock, SystemClock};

/// Result of merging one crawl.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub record: TickerRecord,
    /// Whether anything other than timestamps differs from the prior record.
    pub changed: bool,
    /// Scalar keys that were added or got a new value.
    pub changed_keys: Vec<CanonicalKey>,
}

/// Folds crawl records into a [`TickerRecord`].
///
/// Protected fields are written once; later crawls never overwrite them.
#[derive(Debug, Clone)]
pub struct MergeEngine<C = SystemClock> {
    protected: Vec<CanonicalKey>,
    clock: C,
}

impl Default for MergeEngine<SystemClock> {
    fn default() -> Self {
        Self::new(MergeConfig::default(), SystemClock)
    }
}

impl<C: Clock> MergeEngine<C> {
    pub fn new(config: MergeConfig, clock: C) -> Self {
        Self {
            protected: config.protected_fields,
            clock,
        }
    }

    pub fn is_protected(&self, key: &CanonicalKey) -> bool {
        self.protected.contains(key)
    }

    /// Merge `crawl` into `existing`, or seed a new record for `symbol`.
    pub fn merge(
        &self,
        existing: Option<TickerRecord>,
        crawl: PageCrawlRecord,
        symbol: &str,
    ) -> MergeOutcome {
        let now = self.clock.now();
        let before = existing.clone();
        let mut record = existing.unwrap_or_else(|| TickerRecord::new(symbol, now));

        let mut changed_keys = Vec::new();
        for (key, value) in &crawl.inferred_values {
            let current = record.scalar_fields.get(key);
            if current.is_some() && self.is_protected(key) {
                if current != Some(value) {
                    debug!(symbol = %record.symbol, field = %key, "protected field kept");
                }
                continue;
            }
            if current != Some(value) {
                record.scalar_fields.insert(key.clone(), value.clone());
                changed_keys.push(key.clone());
            }
        }

        record.crawls_by_source.insert(crawl.source_id.clone(), crawl);
        record.last_updated_at = now;

        let changed = before
            .as_ref()
            .is_none_or(|before| !record.same_content(before));
        debug!(
            symbol = %record.symbol,
            changed,
            changed_keys = changed_keys.len(),
            "merged crawl"
        );

        MergeOutcome {
            record,
            changed,
            changed_keys,
        }
    }
}
