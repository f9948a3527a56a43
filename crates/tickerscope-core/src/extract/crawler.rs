//! Assembly of one crawl: canonicalize, classify, bucket and infer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::document::DocumentNode;
use crate::error::Skip;
use crate::models::{ClassifierConfig, FieldBuckets, PageCrawlRecord};
use super::canonical::LabelCanonicalizer;
use super::sanitize::ValueClassifier;
use super::scanner::{DocumentScanner, ScanOutput};
use super::transform::FieldTransformer;

/// A crawl record plus everything that was skipped on the way.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub record: PageCrawlRecord,
    pub skips: Vec<Skip>,
}

/// Turns a document into a [`PageCrawlRecord`].
#[derive(Debug, Default)]
pub struct PageCrawler {
    scanner: DocumentScanner,
    canonicalizer: LabelCanonicalizer,
    classifier: ValueClassifier,
    transformer: FieldTransformer,
}

impl PageCrawler {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            scanner: DocumentScanner::new(config.clone()),
            canonicalizer: LabelCanonicalizer::new(),
            classifier: ValueClassifier::new(config),
            transformer: FieldTransformer::new(),
        }
    }

    pub fn scanner(&self) -> &DocumentScanner {
        &self.scanner
    }

    /// Scan `root` and build the crawl record stamped with `now`.
    ///
    /// Fails only with [`Skip::ConcurrentScanAborted`] when this crawler is
    /// already scanning.
    pub fn crawl<N: DocumentNode>(
        &self,
        root: &N,
        source_id: &str,
        source_location: &str,
        now: DateTime<Utc>,
    ) -> Result<CrawlReport, Skip> {
        info!(source_id, source_location, "crawling document");

        let scan = self.scanner.scan(root)?;
        let report = self.assemble(scan, source_id, source_location, now);

        info!(
            source_id,
            fields = report.record.inferred_values.len(),
            tables = report.record.tables.len(),
            skipped = report.skips.len(),
            "crawl assembled"
        );
        Ok(report)
    }

    /// Build a crawl record from scanner output.
    pub fn assemble(
        &self,
        scan: ScanOutput,
        source_id: &str,
        source_location: &str,
        now: DateTime<Utc>,
    ) -> CrawlReport {
        let mut skips = scan.skips;
        let mut buckets = FieldBuckets::new();

        for occurrence in scan.occurrences {
            let Some(key) = self.canonicalizer.canonicalize(&occurrence.label) else {
                debug!(label = %occurrence.label, "label discarded");
                continue;
            };
            if !self.classifier.keep(&occurrence.value, &key) {
                skips.push(Skip::ParseSkip {
                    field: key.to_string(),
                    value: occurrence.value,
                });
                continue;
            }
            buckets.push(key, occurrence);
        }

        let mut inferred_values = BTreeMap::new();
        for bucket in buckets.iter() {
            let chosen = bucket
                .occurrences
                .iter()
                .find_map(|o| self.transformer.transform(&bucket.key, &o.value));
            match chosen {
                Some(value) => {
                    inferred_values.insert(bucket.key.clone(), value);
                }
                None => {
                    let value = bucket
                        .occurrences
                        .first()
                        .map(|o| o.value.clone())
                        .unwrap_or_default();
                    debug!(field = %bucket.key, %value, "no occurrence parsed");
                    skips.push(Skip::ParseSkip {
                        field: bucket.key.to_string(),
                        value,
                    });
                }
            }
        }

        CrawlReport {
            record: PageCrawlRecord {
                source_id: source_id.to_string(),
                crawled_at: now,
                source_location: source_location.to_string(),
                buckets,
                inferred_values,
                tables: scan.tables,
            },
            skips,
        }
    }
}
