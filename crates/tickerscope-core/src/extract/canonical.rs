//! Label canonicalization against the fixed field vocabulary.

use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;

use crate::models::CanonicalKey;
use super::sanitize::sanitize;

const SYNONYMS: &[(&str, CanonicalKey)] = &[
    ("float", CanonicalKey::Float),
    ("shares float", CanonicalKey::Float),
    ("share float", CanonicalKey::Float),
    ("public float", CanonicalKey::Float),
    ("free float", CanonicalKey::Float),
    ("float shares", CanonicalKey::Float),
    ("floating shares", CanonicalKey::Float),
    ("shares outstanding", CanonicalKey::SharesOutstanding),
    ("outstanding shares", CanonicalKey::SharesOutstanding),
    ("shs outstand", CanonicalKey::SharesOutstanding),
    ("shs outstanding", CanonicalKey::SharesOutstanding),
    ("shares out", CanonicalKey::SharesOutstanding),
    ("os", CanonicalKey::SharesOutstanding),
    ("o/s", CanonicalKey::SharesOutstanding),
    ("cash", CanonicalKey::EstimatedCash),
    ("estimated cash", CanonicalKey::EstimatedCash),
    ("est. cash", CanonicalKey::EstimatedCash),
    ("est cash", CanonicalKey::EstimatedCash),
    ("cash (est.)", CanonicalKey::EstimatedCash),
    ("total cash", CanonicalKey::EstimatedCash),
    ("cash & equivalents", CanonicalKey::EstimatedCash),
    ("cash and equivalents", CanonicalKey::EstimatedCash),
    ("market cap", CanonicalKey::MarketCap),
    ("mkt cap", CanonicalKey::MarketCap),
    ("market cap.", CanonicalKey::MarketCap),
    ("market capitalization", CanonicalKey::MarketCap),
    ("enterprise value", CanonicalKey::EnterpriseValue),
    ("ent. value", CanonicalKey::EnterpriseValue),
    ("ev", CanonicalKey::EnterpriseValue),
    ("institutional ownership", CanonicalKey::InstitutionalOwnership),
    ("institutional own", CanonicalKey::InstitutionalOwnership),
    ("inst own", CanonicalKey::InstitutionalOwnership),
    ("inst. own", CanonicalKey::InstitutionalOwnership),
    ("inst. own.", CanonicalKey::InstitutionalOwnership),
    ("% held by institutions", CanonicalKey::InstitutionalOwnership),
    ("insider ownership", CanonicalKey::InsiderOwnership),
    ("insider own", CanonicalKey::InsiderOwnership),
    ("insider own.", CanonicalKey::InsiderOwnership),
    ("% held by insiders", CanonicalKey::InsiderOwnership),
    ("sector", CanonicalKey::Sector),
    ("industry", CanonicalKey::Industry),
    ("country", CanonicalKey::Country),
    ("exchange", CanonicalKey::Exchange),
    ("primary exchange", CanonicalKey::Exchange),
    ("listing exchange", CanonicalKey::Exchange),
    ("description", CanonicalKey::Description),
    ("business summary", CanonicalKey::Description),
    ("company description", CanonicalKey::Description),
    ("short interest", CanonicalKey::ShortInterest),
    ("shares short", CanonicalKey::ShortInterest),
    ("short shares", CanonicalKey::ShortInterest),
    ("si", CanonicalKey::ShortInterest),
    ("short interest ratio", CanonicalKey::ShortInterestRatio),
    ("short ratio", CanonicalKey::ShortInterestRatio),
    ("si ratio", CanonicalKey::ShortInterestRatio),
    ("days to cover", CanonicalKey::ShortInterestRatio),
    ("short interest % float", CanonicalKey::ShortInterestPercentFloat),
    ("short interest % of float", CanonicalKey::ShortInterestPercentFloat),
    ("short % of float", CanonicalKey::ShortInterestPercentFloat),
    ("short % float", CanonicalKey::ShortInterestPercentFloat),
    ("short float", CanonicalKey::ShortInterestPercentFloat),
    ("short float %", CanonicalKey::ShortInterestPercentFloat),
    ("si % float", CanonicalKey::ShortInterestPercentFloat),
    ("% float short", CanonicalKey::ShortInterestPercentFloat),
    ("cost to borrow", CanonicalKey::CostToBorrow),
    ("ctb", CanonicalKey::CostToBorrow),
    ("borrow fee", CanonicalKey::CostToBorrow),
    ("borrow rate", CanonicalKey::CostToBorrow),
    ("borrow fee rate", CanonicalKey::BorrowFeeRate),
    ("indicative fee", CanonicalKey::BorrowFeeRate),
    ("short shares available", CanonicalKey::ShortSharesAvailable),
    ("shares available", CanonicalKey::ShortSharesAvailable),
    ("available shares", CanonicalKey::ShortSharesAvailable),
    ("shares available to short", CanonicalKey::ShortSharesAvailable),
    ("available to short", CanonicalKey::ShortSharesAvailable),
    ("borrowable shares", CanonicalKey::ShortSharesAvailable),
    ("finra exempt volume", CanonicalKey::FinraExemptVolume),
    ("exempt volume", CanonicalKey::FinraExemptVolume),
    ("short exempt volume", CanonicalKey::FinraExemptVolume),
    ("failure to deliver", CanonicalKey::FailureToDeliver),
    ("failures to deliver", CanonicalKey::FailureToDeliver),
    ("fails to deliver", CanonicalKey::FailureToDeliver),
    ("ftd", CanonicalKey::FailureToDeliver),
    ("ftds", CanonicalKey::FailureToDeliver),
    ("average volume", CanonicalKey::AverageVolume),
    ("avg volume", CanonicalKey::AverageVolume),
    ("avg. volume", CanonicalKey::AverageVolume),
    ("avg vol", CanonicalKey::AverageVolume),
    ("price", CanonicalKey::Price),
    ("last price", CanonicalKey::Price),
    ("share price", CanonicalKey::Price),
    ("last update", CanonicalKey::LastDataUpdate),
    ("last updated", CanonicalKey::LastDataUpdate),
    ("last data update", CanonicalKey::LastDataUpdate),
    ("data as of", CanonicalKey::LastDataUpdate),
    ("as of", CanonicalKey::LastDataUpdate),
    ("updated", CanonicalKey::LastDataUpdate),
];

const BLACKLIST: &[&str] = &[
    "title",
    "symbol",
    "ticker",
    "name",
    "company",
    "company name",
    "website",
    "ceo",
    "employees",
    "phone",
    "address",
    "news",
    "ipo",
    "ipo date",
    "logo",
    "share",
    "tweet",
    "menu",
    "login",
    "sign in",
    "search",
    "http",
    "https",
    "www",
    "copyright",
    "disclaimer",
    "source",
    "advertisement",
];

// "Label A & Label B: x / y" pairs and the labels each half stands for.
const COMPOUND_LABELS: &[(&str, &str, &str)] = &[
    ("mkt cap & ev", "Market Cap", "Enterprise Value"),
    ("market cap & ev", "Market Cap", "Enterprise Value"),
    ("market cap & enterprise value", "Market Cap", "Enterprise Value"),
    ("float & os", "Float", "Shares Outstanding"),
    ("float & o/s", "Float", "Shares Outstanding"),
    ("float & shares outstanding", "Float", "Shares Outstanding"),
    ("si & si % float", "Short Interest", "Short Interest % Float"),
    ("short interest & ratio", "Short Interest", "Short Interest Ratio"),
    ("inst & insider own", "Institutional Ownership", "Insider Ownership"),
    ("inst. & insider own.", "Institutional Ownership", "Insider Ownership"),
];

lazy_static! {
    static ref SYNONYM_TABLE: HashMap<&'static str, &'static CanonicalKey> =
        SYNONYMS.iter().map(|(label, key)| (*label, key)).collect();

    static ref BLACKLIST_LABELS: HashSet<&'static str> = BLACKLIST.iter().copied().collect();

    static ref BLACKLIST_KEYS: HashSet<String> =
        BLACKLIST.iter().filter_map(|label| camel_case(label)).collect();
}

/// Maps free-text labels to canonical keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelCanonicalizer;

impl LabelCanonicalizer {
    pub fn new() -> Self {
        Self
    }

    /// Canonical key for `label`, or `None` when the label is noise.
    ///
    /// Unknown labels are kept as [`CanonicalKey::Other`] under their
    /// camelCase form.
    pub fn canonicalize(&self, label: &str) -> Option<CanonicalKey> {
        let normalized = normalize_label(label);
        if normalized.is_empty() || BLACKLIST_LABELS.contains(normalized.as_str()) {
            return None;
        }
        if let Some(key) = SYNONYM_TABLE.get(normalized.as_str()) {
            return Some((*key).clone());
        }

        let key: CanonicalKey = camel_case(&normalized)?.parse().ok()?;
        (!is_blacklisted_key(&key)).then_some(key)
    }

    /// Whether `label` is in the synonym table.
    pub fn is_known(&self, label: &str) -> bool {
        SYNONYM_TABLE.contains_key(normalize_label(label).as_str())
    }

    /// Whether `label` is a known noise label.
    pub fn is_blacklisted(&self, label: &str) -> bool {
        BLACKLIST_LABELS.contains(normalize_label(label).as_str())
    }

    /// The two labels a compound label stands for.
    pub fn split_compound(&self, label: &str) -> Option<(&'static str, &'static str)> {
        let normalized = normalize_label(label);
        COMPOUND_LABELS
            .iter()
            .find(|(compound, _, _)| *compound == normalized)
            .map(|(_, first, second)| (*first, *second))
    }
}

/// Whether values under `key` are always discarded.
pub fn is_blacklisted_key(key: &CanonicalKey) -> bool {
    match key {
        CanonicalKey::Other(name) => BLACKLIST_KEYS.contains(name),
        _ => false,
    }
}

/// Lowercase, whitespace-collapsed label without trailing separators.
pub fn normalize_label(label: &str) -> String {
    let cleaned = sanitize(label).to_lowercase();
    cleaned
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, ':' | '*' | '"' | '\'' | '-' | '–' | '—' | '•'))
        .to_string()
}

/// `"Days to Cover (avg)"` → `"daysToCoverAvg"`.
pub fn camel_case(label: &str) -> Option<String> {
    let mut out = String::new();
    for word in label
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let lower = word.to_lowercase();
        if out.is_empty() {
            out.push_str(&lower);
        } else {
            let mut chars = lower.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    (!out.is_empty()).then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synonyms() {
        let c = LabelCanonicalizer::new();
        assert_eq!(c.canonicalize("Float"), Some(CanonicalKey::Float));
        assert_eq!(c.canonicalize("  Shs   Outstand: "), Some(CanonicalKey::SharesOutstanding));
        assert_eq!(c.canonicalize("Days to Cover"), Some(CanonicalKey::ShortInterestRatio));
        assert_eq!(c.canonicalize("Short % of Float"), Some(CanonicalKey::ShortInterestPercentFloat));
        assert_eq!(c.canonicalize("Est. Cash"), Some(CanonicalKey::EstimatedCash));
        assert_eq!(c.canonicalize("FINRA Exempt Volume"), Some(CanonicalKey::FinraExemptVolume));
    }

    #[test]
    fn test_unknown_label_falls_back_to_camel_case() {
        let c = LabelCanonicalizer::new();
        assert_eq!(
            c.canonicalize("Dividend Yield (TTM)"),
            Some(CanonicalKey::Other("dividendYieldTtm".into()))
        );
        // A fallback that spells a contract name resolves to the known key.
        assert_eq!(c.canonicalize("Market-Cap"), Some(CanonicalKey::MarketCap));
    }

    #[test]
    fn test_blacklist() {
        let c = LabelCanonicalizer::new();
        assert_eq!(c.canonicalize("Title"), None);
        assert_eq!(c.canonicalize("TICKER:"), None);
        assert_eq!(c.canonicalize("Company Name"), None);
        assert_eq!(c.canonicalize(":::"), None);
        assert!(c.is_blacklisted("CEO"));
        assert!(is_blacklisted_key(&CanonicalKey::Other("companyName".into())));
        assert!(!is_blacklisted_key(&CanonicalKey::Float));
    }

    #[test]
    fn test_canonicalization_is_pure() {
        let c = LabelCanonicalizer::new();
        let labels = ["Float", "Inst Own", "Random Thing", "title", "Mkt Cap"];
        let first: Vec<_> = labels.iter().map(|l| c.canonicalize(l)).collect();
        for _ in 0..3 {
            let again: Vec<_> = labels.iter().map(|l| c.canonicalize(l)).collect();
            assert_eq!(again, first);
        }
    }

    #[test]
    fn test_compound_labels() {
        let c = LabelCanonicalizer::new();
        assert_eq!(c.split_compound("Mkt Cap & EV"), Some(("Market Cap", "Enterprise Value")));
        assert_eq!(c.split_compound("Float & OS:"), Some(("Float", "Shares Outstanding")));
        assert_eq!(c.split_compound("Float"), None);
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("% Held by Insiders").as_deref(), Some("heldByInsiders"));
        assert_eq!(camel_case("52 Week High").as_deref(), Some("52WeekHigh"));
        assert_eq!(camel_case("--"), None);
    }
}
