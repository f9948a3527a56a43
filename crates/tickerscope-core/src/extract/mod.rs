//! Structured-data extraction from rendered documents.

pub mod canonical;
mod crawler;
pub mod patterns;
pub mod sanitize;
mod scanner;
pub mod table;
pub mod transform;

pub use canonical::{camel_case, is_blacklisted_key, normalize_label, LabelCanonicalizer};
pub use crawler::{CrawlReport, PageCrawler};
pub use sanitize::{sanitize, ValueClassifier};
pub use scanner::{DocumentScanner, ScanGuard, ScanOutput};
pub use table::{normalize_table_key, TableExtractor, TableGrid};
pub use transform::{parse_currency, parse_percent, parse_share_count, FieldTransformer};
