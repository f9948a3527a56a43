//! One pass over a document: scan, merge, then persist only on change.

use tracing::{debug, info};

use crate::document::DocumentNode;
use crate::error::{Result, ScopeError, Skip};
use crate::extract::PageCrawler;
use crate::models::{CanonicalKey, ScopeConfig, TickerRecord};
use crate::schedule::{Clock, SystemClock};
use super::engine::MergeEngine;
use super::store::{TickerStore, TrackedSymbols};

/// What one session pass did.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    /// Normalized (uppercase) symbol.
    pub symbol: String,
    /// Merged record; `None` when the scan was refused.
    pub record: Option<TickerRecord>,
    /// Whether the record was persisted.
    pub written: bool,
    /// Whether this pass added the symbol to the tracked list.
    pub newly_tracked: bool,
    pub changed_keys: Vec<CanonicalKey>,
    pub skips: Vec<Skip>,
}

/// One end-to-end pass: scan, build the crawl, read, merge, persist on change.
pub struct CrawlSession<S, T, C = SystemClock> {
    crawler: PageCrawler,
    engine: MergeEngine<C>,
    store: S,
    tracked: T,
    clock: C,
}

impl<S: TickerStore, T: TrackedSymbols, C: Clock + Clone> CrawlSession<S, T, C> {
    pub fn new(config: &ScopeConfig, store: S, tracked: T, clock: C) -> Self {
        Self {
            crawler: PageCrawler::new(config.classifier.clone()),
            engine: MergeEngine::new(config.merge.clone(), clock.clone()),
            store,
            tracked,
            clock,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tracked(&self) -> &T {
        &self.tracked
    }

    pub fn crawler(&self) -> &PageCrawler {
        &self.crawler
    }

    /// Crawl `root` for `symbol` and fold the result into the store.
    pub async fn run<N: DocumentNode>(
        &self,
        root: &N,
        symbol: &str,
        source_id: &str,
        source_location: &str,
    ) -> Result<SessionOutcome> {
        let symbol = normalize_symbol(symbol)?;

        let report = match self
            .crawler
            .crawl(root, source_id, source_location, self.clock.now())
        {
            Ok(report) => report,
            Err(skip) => {
                debug!(%symbol, %skip, "session pass skipped");
                return Ok(SessionOutcome {
                    symbol,
                    record: None,
                    written: false,
                    newly_tracked: false,
                    changed_keys: Vec::new(),
                    skips: vec![skip],
                });
            }
        };

        let existing = self.store.read(&symbol).await?;
        let outcome = self.engine.merge(existing, report.record, &symbol);
        let mut skips = report.skips;

        if !outcome.changed {
            debug!(%symbol, "merge produced no change, skipping write");
            skips.push(Skip::MergeNoop);
            return Ok(SessionOutcome {
                symbol,
                record: Some(outcome.record),
                written: false,
                newly_tracked: false,
                changed_keys: outcome.changed_keys,
                skips,
            });
        }

        self.store.write(&symbol, &outcome.record).await?;
        let newly_tracked = if self.tracked.contains(&symbol).await? {
            false
        } else {
            self.tracked.insert(&symbol).await?
        };

        info!(
            %symbol,
            source_id,
            changed_keys = outcome.changed_keys.len(),
            newly_tracked,
            "record updated"
        );

        Ok(SessionOutcome {
            symbol,
            record: Some(outcome.record),
            written: true,
            newly_tracked,
            changed_keys: outcome.changed_keys,
            skips,
        })
    }
}

/// `" acme "` → `"ACME"`.
fn normalize_symbol(symbol: &str) -> Result<String> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(ScopeError::InvalidSymbol(symbol));
    }
    Ok(symbol)
}
