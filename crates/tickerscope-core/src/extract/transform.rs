//! Normalization of cleaned values into absolute numbers and percentages.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::models::{CanonicalKey, FieldKind, FieldValue};
use super::patterns::{CURRENCY_CODES, NUMBER_TOKEN, SCALED_NUMBER, SHARE_UNITS};

/// Bare float/shares-outstanding numbers below this are quoted in millions.
const MILLIONS_CONVENTION_LIMIT: i64 = 1_000_000;

/// Normalizes sanitized values per canonical key.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldTransformer;

impl FieldTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Normalized value, or `None` when the value does not parse for `key`.
    pub fn transform(&self, key: &CanonicalKey, value: &str) -> Option<FieldValue> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        match key.kind() {
            FieldKind::ShareCount => {
                let millions_convention =
                    matches!(key, CanonicalKey::Float | CanonicalKey::SharesOutstanding);
                parse_share_count(value, millions_convention).map(FieldValue::Count)
            }
            FieldKind::Currency => parse_currency(value).map(FieldValue::Count),
            FieldKind::Percent => parse_percent(value).map(FieldValue::Percent),
            FieldKind::Text => Some(FieldValue::Text(value.to_string())),
        }
    }
}

fn suffix_multiplier(suffix: &str, allow_trillions: bool) -> Option<Decimal> {
    let factor: i64 = match suffix.to_ascii_lowercase().as_str() {
        "k" | "thousand" => 1_000,
        "m" | "mm" | "mln" | "million" => 1_000_000,
        "b" | "bn" | "billion" => 1_000_000_000,
        "t" | "trillion" if allow_trillions => 1_000_000_000_000,
        _ => return None,
    };
    Some(Decimal::from(factor))
}

/// Parsed number, with whether a magnitude suffix was present.
fn parse_scaled(cleaned: &str, negative: bool, allow_trillions: bool) -> Option<(Decimal, bool)> {
    let caps = SCALED_NUMBER.captures(cleaned)?;
    let mut number = Decimal::from_str(&caps["num"]).ok()?;
    let has_suffix = match caps.name("suffix") {
        Some(suffix) => {
            number = number.checked_mul(suffix_multiplier(suffix.as_str(), allow_trillions)?)?;
            true
        }
        None => false,
    };
    if negative || caps.name("sign").is_some() {
        number.set_sign_negative(true);
    }
    Some((number, has_suffix))
}

/// Strip wrapping parentheses (accounting negatives) and thousands separators.
fn strip_common(value: &str) -> (String, bool) {
    let trimmed = value.trim();
    let negative = trimmed.starts_with('(') && trimmed.contains(')');
    let cleaned: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ',' | '(' | ')' | '\u{2019}' | '\''))
        .collect();
    (cleaned, negative)
}

/// `"1.96M"` → `1960000`. Unit words and separators are ignored.
pub fn parse_share_count(value: &str, millions_convention: bool) -> Option<Decimal> {
    let (cleaned, negative) = strip_common(value);
    let cleaned = SHARE_UNITS.replace_all(&cleaned, " ");
    let (mut number, has_suffix) = parse_scaled(cleaned.trim(), negative, false)?;

    if millions_convention && !has_suffix && number.abs() < Decimal::from(MILLIONS_CONVENTION_LIMIT) {
        debug!(value, "bare share count below one million read as millions");
        number = number.checked_mul(Decimal::from(1_000_000))?;
    }

    Some(
        number
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .normalize(),
    )
}

/// `"$22.9M"` → `22900000`. Accepts K/M/B/T suffixes.
pub fn parse_currency(value: &str) -> Option<Decimal> {
    let (cleaned, negative) = strip_common(value);
    let cleaned: String = cleaned
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | '¥'))
        .collect();
    let cleaned = CURRENCY_CODES.replace_all(&cleaned, " ");
    let (number, _) = parse_scaled(cleaned.trim(), negative, true)?;
    Some(number.normalize())
}

/// Leading numeric token as `"{n}%"`. Values at or below one are not rescaled.
pub fn parse_percent(value: &str) -> Option<String> {
    let token = NUMBER_TOKEN.find(value)?;
    let digits = token.as_str().replace(',', "");
    let number = Decimal::from_str(digits.trim_start_matches('+')).ok()?;
    Some(format!("{}%", number.normalize()))
}
