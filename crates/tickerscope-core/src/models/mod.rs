//! Data models shared across the pipeline.

pub mod config;
pub mod key;
pub mod record;

pub use config::{ClassifierConfig, MergeConfig, ScheduleConfig, ScopeConfig};
pub use key::{CanonicalKey, FieldKind};
pub use record::{
    FieldBucket, FieldBuckets, FieldValue, Occurrence, PageCrawlRecord, Strategy, Table,
    TableRow, TickerRecord,
};
