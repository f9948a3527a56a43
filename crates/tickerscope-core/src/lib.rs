//! Core library for ticker metadata extraction.
//!
//! This crate provides:
//! - A minimal document tree interface and an arena-backed snapshot
//! - Label/value discovery over definition pairs, tables and inline prose
//! - Label canonicalization, value sanitization and unit normalization
//! - Merge of repeated crawls into one persistent record per symbol
//! - Explicit TTL caches, request dedup and change coalescing

pub mod document;
pub mod error;
pub mod extract;
pub mod merge;
pub mod models;
pub mod schedule;

pub use document::{DocumentNode, Snapshot, SnapshotNode};
pub use error::{ConfigError, Result, ScopeError, Skip, StoreError};
pub use extract::{CrawlReport, DocumentScanner, FieldTransformer, LabelCanonicalizer, PageCrawler};
pub use merge::{
    CrawlSession, MemoryStore, MemoryTrackedSymbols, MergeEngine, MergeOutcome, SessionOutcome,
    TickerStore, TrackedSymbols,
};
pub use models::{
    CanonicalKey, FieldValue, Occurrence, PageCrawlRecord, ScopeConfig, Strategy, Table,
    TableRow, TickerRecord,
};
pub use schedule::{Clock, Coalescer, ManualClock, RequestDeduper, SystemClock, TtlCache};
