//! Error types for the tickerscope-core library.
//!
//! Extraction never fails hard: malformed fragments become a [`Skip`] and the
//! crawl carries on. Only the collaborator seams (store, config, snapshot
//! decoding) produce a [`ScopeError`].

use std::fmt;

use thiserror::Error;

/// Main error type for the tickerscope library.
#[derive(Error, Debug)]
pub enum ScopeError {
    /// Persistent store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A document snapshot could not be decoded.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// A ticker symbol was empty after normalization.
    #[error("invalid symbol: {0:?}")]
    InvalidSymbol(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by a [`TickerStore`](crate::merge::TickerStore) implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing store rejected a read.
    #[error("failed to read {symbol}: {reason}")]
    Read { symbol: String, reason: String },

    /// The backing store rejected a write.
    #[error("failed to write {symbol}: {reason}")]
    Write { symbol: String, reason: String },

    /// A stored record could not be decoded.
    #[error("corrupt record for {0}")]
    Corrupt(String),
}

/// Errors related to loading or saving configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error while reading or writing a config file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid JSON for [`ScopeConfig`](crate::models::config::ScopeConfig).
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of its accepted range.
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Non-fatal outcomes of the extraction pipeline.
///
/// These are informational: they are logged and counted, never propagated as
/// errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skip {
    /// An occurrence or cell failed classification or transformation.
    ParseSkip { field: String, value: String },

    /// A strategy found none of the structural anchors it looks for.
    SourceUnavailable(&'static str),

    /// A scan was requested while another was still walking the document.
    ConcurrentScanAborted,

    /// A merge produced no change, so persistence was skipped.
    MergeNoop,
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Skip::ParseSkip { field, value } => write!(f, "skipped {field}: {value:?}"),
            Skip::SourceUnavailable(strategy) => write!(f, "{strategy} strategy found no anchors"),
            Skip::ConcurrentScanAborted => f.write_str("scan already in flight"),
            Skip::MergeNoop => f.write_str("merge produced no change"),
        }
    }
}

/// Result type for the tickerscope library.
pub type Result<T> = std::result::Result<T, ScopeError>;
