//! Configuration structures for the extraction pipeline.

use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use super::key::CanonicalKey;

/// Main configuration for the tickerscope pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// Value classification thresholds.
    pub classifier: ClassifierConfig,

    /// Merge rules.
    pub merge: MergeConfig,

    /// Request dedup and re-scan coalescing.
    pub schedule: ScheduleConfig,
}

/// Thresholds used when deciding whether text is a label or a data value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Free-text values longer than this are treated as prose.
    pub max_free_text_len: usize,

    /// Values longer than this with several clauses are treated as prose.
    pub clause_text_len: usize,

    /// Number of sentence-like clauses that marks prose.
    pub min_prose_clauses: usize,

    /// Alphabetic tokens up to this length count as values for numeric fields.
    pub max_short_token_len: usize,

    /// Longest left cell accepted as a label in two-cell table rows.
    pub max_table_label_len: usize,

    /// Longest label matched inside a text block.
    pub max_inline_label_len: usize,

    /// Share of digits (over non-space characters) above which text is
    /// considered digit-heavy and therefore not a label.
    pub digit_heavy_ratio: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_free_text_len: 140,
            clause_text_len: 80,
            min_prose_clauses: 2,
            max_short_token_len: 24,
            max_table_label_len: 48,
            max_inline_label_len: 40,
            digit_heavy_ratio: 0.4,
        }
    }
}

/// Merge behaviour for persistent records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Fields set once and never overwritten by later inference.
    pub protected_fields: Vec<CanonicalKey>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            protected_fields: vec![CanonicalKey::Float, CanonicalKey::SharesOutstanding],
        }
    }
}

/// Timing used around the pipeline by its callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Quiet window before a burst of change notifications triggers a scan.
    pub coalesce_window_ms: u64,

    /// How long a (source, symbol) request is remembered for dedup.
    pub request_ttl_secs: u64,
}

/// Largest accepted `coalesce_window_ms`: one hour.
pub const MAX_COALESCE_WINDOW_MS: u64 = 60 * 60 * 1000;

/// Largest accepted `request_ttl_secs`: one week.
pub const MAX_REQUEST_TTL_SECS: u64 = 7 * 24 * 60 * 60;

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            coalesce_window_ms: 500,
            request_ttl_secs: 300,
        }
    }
}

impl ScheduleConfig {
    /// Quiet window, clamped to [`MAX_COALESCE_WINDOW_MS`].
    pub fn coalesce_window(&self) -> Duration {
        Duration::milliseconds(self.coalesce_window_ms.min(MAX_COALESCE_WINDOW_MS) as i64)
    }

    /// Request TTL, clamped to [`MAX_REQUEST_TTL_SECS`].
    pub fn request_ttl(&self) -> Duration {
        Duration::seconds(self.request_ttl_secs.min(MAX_REQUEST_TTL_SECS) as i64)
    }
}

impl ScopeConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ratio = self.classifier.digit_heavy_ratio;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(ConfigError::Invalid {
                field: "classifier.digit_heavy_ratio".to_string(),
                reason: format!("{ratio} is outside 0.0..=1.0"),
            });
        }
        if self.classifier.max_inline_label_len == 0 {
            return Err(ConfigError::Invalid {
                field: "classifier.max_inline_label_len".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.schedule.coalesce_window_ms > MAX_COALESCE_WINDOW_MS {
            return Err(ConfigError::Invalid {
                field: "schedule.coalesce_window_ms".to_string(),
                reason: format!("must be at most {MAX_COALESCE_WINDOW_MS}"),
            });
        }
        if self.schedule.request_ttl_secs > MAX_REQUEST_TTL_SECS {
            return Err(ConfigError::Invalid {
                field: "schedule.request_ttl_secs".to_string(),
                reason: format!("must be at most {MAX_REQUEST_TTL_SECS}"),
            });
        }
        Ok(())
    }
}
