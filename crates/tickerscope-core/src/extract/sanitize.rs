//! Value sanitization and data-vs-prose classification.

use unicode_normalization::UnicodeNormalization;

use crate::models::{CanonicalKey, ClassifierConfig};
use super::canonical::is_blacklisted_key;
use super::patterns::{ALPHA_TOKEN, CLAUSE_BREAK, DISCURSIVE, MONEY_OR_PERCENT, UNIT_KEYWORD};

/// Characters that render as nothing.
fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}' | '\u{034F}' | '\u{061C}' | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{2069}'
            | '\u{FEFF}'
    )
}

/// NFKC-normalize, drop invisible and control characters, collapse all
/// whitespace runs to one space and trim.
pub fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;

    for c in raw.nfkc() {
        if is_invisible(c) {
            continue;
        }
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if c.is_control() {
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }

    out
}

/// Share of digits among non-space characters.
pub fn digit_ratio(text: &str) -> f32 {
    let mut digits = 0usize;
    let mut total = 0usize;
    for c in text.chars().filter(|c| !c.is_whitespace()) {
        total += 1;
        if c.is_ascii_digit() {
            digits += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        digits as f32 / total as f32
    }
}

/// Decides whether a sanitized value is data worth keeping.
#[derive(Debug, Clone, Default)]
pub struct ValueClassifier {
    config: ClassifierConfig,
}

impl ValueClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Sanitize `raw` and return it if it should be kept under `key`.
    pub fn clean(&self, raw: &str, key: &CanonicalKey) -> Option<String> {
        let cleaned = sanitize(raw);
        self.keep(&cleaned, key).then_some(cleaned)
    }

    /// Whether a sanitized value is kept under `key`.
    pub fn keep(&self, value: &str, key: &CanonicalKey) -> bool {
        if value.is_empty() || is_blacklisted_key(key) {
            return false;
        }
        if key.is_free_text() {
            !self.looks_like_prose(value)
        } else {
            self.looks_like_value(value)
        }
    }

    /// Long text, several long clauses, or discursive wording.
    pub fn looks_like_prose(&self, value: &str) -> bool {
        let len = value.chars().count();
        if len > self.config.max_free_text_len {
            return true;
        }
        if len > self.config.clause_text_len
            && clause_count(value) >= self.config.min_prose_clauses
        {
            return true;
        }
        DISCURSIVE.is_match(value)
    }

    /// Numbers, money, percentages, unit words or a short alphabetic token.
    pub fn looks_like_value(&self, value: &str) -> bool {
        value.chars().any(|c| c.is_ascii_digit())
            || MONEY_OR_PERCENT.is_match(value)
            || UNIT_KEYWORD.is_match(value)
            || (value.chars().count() <= self.config.max_short_token_len
                && ALPHA_TOKEN.is_match(value))
    }

    /// Contains letters, is short enough and is not mostly digits.
    pub fn is_likely_label(&self, text: &str) -> bool {
        let text = text.trim();
        !text.is_empty()
            && text.chars().count() <= self.config.max_table_label_len
            && text.chars().any(|c| c.is_alphabetic())
            && digit_ratio(text) <= self.config.digit_heavy_ratio
    }
}

/// Number of sentence-like clauses (at least two words each).
fn clause_count(value: &str) -> usize {
    CLAUSE_BREAK
        .split(value)
        .filter(|clause| clause.split_whitespace().count() >= 2)
        .count()
}
