//! Canonical field vocabulary.
//!
//! The camelCase names returned by [`CanonicalKey::as_str`] are a contract
//! with the presentation layer; renaming one is a breaking change.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

/// A fixed-vocabulary identifier for a financial or company field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CanonicalKey {
    Float,
    SharesOutstanding,
    EstimatedCash,
    MarketCap,
    EnterpriseValue,
    InstitutionalOwnership,
    InsiderOwnership,
    Sector,
    Industry,
    Country,
    Exchange,
    Description,
    ShortInterest,
    ShortInterestRatio,
    ShortInterestPercentFloat,
    CostToBorrow,
    BorrowFeeRate,
    ShortSharesAvailable,
    FinraExemptVolume,
    FailureToDeliver,
    AverageVolume,
    Price,
    LastDataUpdate,
    /// A label outside the known vocabulary, kept under its camelCase form.
    Other(String),
}

/// How a field's value is normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Absolute share or volume count.
    ShareCount,
    /// Absolute currency amount.
    Currency,
    /// Percentage, kept as a `"{n}%"` string.
    Percent,
    /// Passed through unchanged.
    Text,
}

const KNOWN: &[CanonicalKey] = &[
    CanonicalKey::Float,
    CanonicalKey::SharesOutstanding,
    CanonicalKey::EstimatedCash,
    CanonicalKey::MarketCap,
    CanonicalKey::EnterpriseValue,
    CanonicalKey::InstitutionalOwnership,
    CanonicalKey::InsiderOwnership,
    CanonicalKey::Sector,
    CanonicalKey::Industry,
    CanonicalKey::Country,
    CanonicalKey::Exchange,
    CanonicalKey::Description,
    CanonicalKey::ShortInterest,
    CanonicalKey::ShortInterestRatio,
    CanonicalKey::ShortInterestPercentFloat,
    CanonicalKey::CostToBorrow,
    CanonicalKey::BorrowFeeRate,
    CanonicalKey::ShortSharesAvailable,
    CanonicalKey::FinraExemptVolume,
    CanonicalKey::FailureToDeliver,
    CanonicalKey::AverageVolume,
    CanonicalKey::Price,
    CanonicalKey::LastDataUpdate,
];

impl CanonicalKey {
    /// All keys of the closed vocabulary, excluding `Other`.
    pub fn known() -> &'static [CanonicalKey] {
        KNOWN
    }

    /// Contract name of the key.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Float => "float",
            Self::SharesOutstanding => "sharesOutstanding",
            Self::EstimatedCash => "estimatedCash",
            Self::MarketCap => "marketCap",
            Self::EnterpriseValue => "enterpriseValue",
            Self::InstitutionalOwnership => "institutionalOwnership",
            Self::InsiderOwnership => "insiderOwnership",
            Self::Sector => "sector",
            Self::Industry => "industry",
            Self::Country => "country",
            Self::Exchange => "exchange",
            Self::Description => "description",
            Self::ShortInterest => "shortInterest",
            Self::ShortInterestRatio => "shortInterestRatio",
            Self::ShortInterestPercentFloat => "shortInterestPercentFloat",
            Self::CostToBorrow => "costToBorrow",
            Self::BorrowFeeRate => "borrowFeeRate",
            Self::ShortSharesAvailable => "shortSharesAvailable",
            Self::FinraExemptVolume => "finraExemptVolume",
            Self::FailureToDeliver => "failureToDeliver",
            Self::AverageVolume => "averageVolume",
            Self::Price => "price",
            Self::LastDataUpdate => "lastDataUpdate",
            Self::Other(name) => name,
        }
    }

    /// Normalization family for this key.
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Float
            | Self::SharesOutstanding
            | Self::ShortInterest
            | Self::ShortSharesAvailable
            | Self::FinraExemptVolume
            | Self::FailureToDeliver
            | Self::AverageVolume => FieldKind::ShareCount,
            Self::MarketCap | Self::EnterpriseValue | Self::EstimatedCash | Self::Price => {
                FieldKind::Currency
            }
            Self::InstitutionalOwnership
            | Self::InsiderOwnership
            | Self::ShortInterestPercentFloat
            | Self::CostToBorrow
            | Self::BorrowFeeRate => FieldKind::Percent,
            _ => FieldKind::Text,
        }
    }

    /// Fields whose values are legitimately free text.
    pub fn is_free_text(&self) -> bool {
        matches!(
            self,
            Self::Sector
                | Self::Industry
                | Self::Country
                | Self::Exchange
                | Self::Description
                | Self::MarketCap
                | Self::EnterpriseValue
                | Self::InstitutionalOwnership
                | Self::LastDataUpdate
        )
    }

    /// Whether this is an open-vocabulary key.
    pub fn is_other(&self) -> bool {
        matches!(self, Self::Other(_))
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(KNOWN
            .iter()
            .find(|k| k.as_str() == s)
            .cloned()
            .unwrap_or_else(|| Self::Other(s.to_string())))
    }
}

impl Serialize for CanonicalKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CanonicalKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyVisitor;

        impl Visitor<'_> for KeyVisitor {
            type Value = CanonicalKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a canonical field name")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                if v.is_empty() {
                    return Err(E::invalid_value(de::Unexpected::Str(v), &self));
                }
                Ok(v.parse().unwrap_or_else(|never| match never {}))
            }
        }

        deserializer.deserialize_str(KeyVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_names_round_trip() {
        for key in CanonicalKey::known() {
            let parsed: CanonicalKey = key.as_str().parse().unwrap();
            assert_eq!(&parsed, key);
        }
        assert_eq!(CanonicalKey::ShortInterestPercentFloat.as_str(), "shortInterestPercentFloat");
        assert_eq!(CanonicalKey::FinraExemptVolume.as_str(), "finraExemptVolume");
    }

    #[test]
    fn test_unknown_name_is_other() {
        let key: CanonicalKey = "dividendYield".parse().unwrap();
        assert_eq!(key, CanonicalKey::Other("dividendYield".to_string()));
        assert!(key.is_other());
        assert_eq!(key.kind(), FieldKind::Text);
    }

    #[test]
    fn test_serializes_as_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(CanonicalKey::Float, 1);
        map.insert(CanonicalKey::Other("beta".into()), 2);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"float":1,"beta":2}"#);

        let back: std::collections::BTreeMap<CanonicalKey, i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(CanonicalKey::Float.kind(), FieldKind::ShareCount);
        assert_eq!(CanonicalKey::EstimatedCash.kind(), FieldKind::Currency);
        assert_eq!(CanonicalKey::CostToBorrow.kind(), FieldKind::Percent);
        assert_eq!(CanonicalKey::ShortInterestRatio.kind(), FieldKind::Text);
        assert!(CanonicalKey::Sector.is_free_text());
        assert!(!CanonicalKey::ShortInterest.is_free_text());
    }
}
