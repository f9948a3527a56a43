//! Crawl and ticker record models.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::key::CanonicalKey;

/// Strategy that produced an occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Term/definition element pairs.
    PairedElement,
    /// Two-cell table rows.
    Table,
    /// `Label: value` runs inside a text block.
    InlineProse,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::PairedElement => "paired_element",
            Strategy::Table => "table",
            Strategy::InlineProse => "inline_prose",
        })
    }
}

/// One raw label/value observation at a specific document location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    /// Label text as found in the document.
    pub label: String,

    /// Sanitized value. Never empty once stored in a bucket.
    pub value: String,

    /// Value before sanitization.
    pub raw_value: String,

    /// Strategy that found this pair.
    pub strategy: Strategy,

    /// Provenance path of the element holding the value.
    pub structural_path: String,

    /// Text of the closest heading above the element.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearest_heading: Option<String>,
}

/// Every kept occurrence of one canonical key, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldBucket {
    pub key: CanonicalKey,
    pub occurrences: Vec<Occurrence>,
}

/// Insertion-ordered collection of field buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldBuckets(Vec<FieldBucket>);

impl FieldBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an occurrence under `key`, creating the bucket on first sight.
    pub fn push(&mut self, key: CanonicalKey, occurrence: Occurrence) {
        match self.0.iter_mut().find(|b| b.key == key) {
            Some(bucket) => bucket.occurrences.push(occurrence),
            None => self.0.push(FieldBucket {
                key,
                occurrences: vec![occurrence],
            }),
        }
    }

    pub fn get(&self, key: &CanonicalKey) -> Option<&FieldBucket> {
        self.0.iter().find(|b| &b.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldBucket> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &CanonicalKey> {
        self.0.iter().map(|b| &b.key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A normalized field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Absolute count or currency amount.
    Count(Decimal),
    /// Percentage string such as `"1.25%"`.
    Percent(String),
    /// Free text.
    Text(String),
}

impl FieldValue {
    /// Numeric value, if this is a count.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            FieldValue::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Percent(s) | FieldValue::Text(s) => Some(s),
            FieldValue::Count(_) => None,
        }
    }

    /// Plain string form, accepted back by the transformer unchanged.
    pub fn render(&self) -> String {
        match self {
            FieldValue::Count(n) => n.normalize().to_string(),
            FieldValue::Percent(s) | FieldValue::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// One table row: header → cell value, in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow(Vec<(String, String)>);

impl TableRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, header: impl Into<String>, value: impl Into<String>) {
        self.0.push((header.into(), value.into()));
    }

    pub fn get(&self, header: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(h, _)| h.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(h, v)| (h.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<H: Into<String>, V: Into<String>> FromIterator<(H, V)> for TableRow {
    fn from_iter<I: IntoIterator<Item = (H, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(h, v)| (h.into(), v.into())).collect())
    }
}

impl Serialize for TableRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (header, value) in &self.0 {
            map.serialize_entry(header, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TableRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = TableRow;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of header to cell value")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut row = TableRow::new();
                while let Some((header, value)) = access.next_entry::<String, String>()? {
                    row.insert(header, value);
                }
                Ok(row)
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}

/// A data table pulled from the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Stable snake_case identity.
    pub key: String,

    /// Human-readable name.
    pub display_name: String,

    /// Column headers in document order.
    pub headers: Vec<String>,

    /// Rows with at least one useful cell.
    pub rows: Vec<TableRow>,
}

/// Result of one crawl of one source. Rebuilt every crawl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCrawlRecord {
    pub source_id: String,

    pub crawled_at: DateTime<Utc>,

    /// Where the snapshot came from (usually a URL).
    pub source_location: String,

    pub buckets: FieldBuckets,

    /// Chosen value per key: first usable occurrence in document order.
    pub inferred_values: BTreeMap<CanonicalKey, FieldValue>,

    pub tables: Vec<Table>,
}

impl PageCrawlRecord {
    /// Empty crawl record.
    pub fn empty(
        source_id: impl Into<String>,
        source_location: impl Into<String>,
        crawled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            crawled_at,
            source_location: source_location.into(),
            buckets: FieldBuckets::new(),
            inferred_values: BTreeMap::new(),
            tables: Vec::new(),
        }
    }

    pub fn field(&self, key: &CanonicalKey) -> Option<&FieldValue> {
        self.inferred_values.get(key)
    }

    pub fn table(&self, key: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.key == key)
    }

    /// Equality that ignores the crawl timestamp.
    pub fn same_content(&self, other: &Self) -> bool {
        self.source_id == other.source_id
            && self.source_location == other.source_location
            && self.buckets == other.buckets
            && self.inferred_values == other.inferred_values
            && self.tables == other.tables
    }
}

/// Persistent per-symbol record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerRecord {
    pub symbol: String,

    pub last_updated_at: DateTime<Utc>,

    pub scalar_fields: BTreeMap<CanonicalKey, FieldValue>,

    pub crawls_by_source: BTreeMap<String, PageCrawlRecord>,
}

impl TickerRecord {
    /// Record with no fields yet.
    pub fn new(symbol: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            last_updated_at: now,
            scalar_fields: BTreeMap::new(),
            crawls_by_source: BTreeMap::new(),
        }
    }

    pub fn field(&self, key: &CanonicalKey) -> Option<&FieldValue> {
        self.scalar_fields.get(key)
    }

    /// Equality that ignores every timestamp.
    pub fn same_content(&self, other: &Self) -> bool {
        self.symbol == other.symbol
            && self.scalar_fields == other.scalar_fields
            && self.crawls_by_source.len() == other.crawls_by_source.len()
            && self
                .crawls_by_source
                .iter()
                .zip(other.crawls_by_source.iter())
                .all(|((a_id, a), (b_id, b))| a_id == b_id && a.same_content(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn occurrence(label: &str, value: &str) -> Occurrence {
        Occurrence {
            label: label.to_string(),
            value: value.to_string(),
            raw_value: value.to_string(),
            strategy: Strategy::InlineProse,
            structural_path: "body[0]>p[0]".to_string(),
            nearest_heading: None,
        }
    }

    #[test]
    fn test_buckets_keep_first_seen_order() {
        let mut buckets = FieldBuckets::new();
        buckets.push(CanonicalKey::Sector, occurrence("Sector", "Technology"));
        buckets.push(CanonicalKey::Float, occurrence("Float", "1.5M"));
        buckets.push(CanonicalKey::Sector, occurrence("Sector", "Tech"));

        let keys: Vec<_> = buckets.keys().cloned().collect();
        assert_eq!(keys, vec![CanonicalKey::Sector, CanonicalKey::Float]);

        let sector = buckets.get(&CanonicalKey::Sector).unwrap();
        assert_eq!(sector.occurrences[0].value, "Technology");
        assert_eq!(sector.occurrences[1].value, "Tech");
    }

    #[test]
    fn test_table_row_preserves_header_order() {
        let row: TableRow = [("Date", "2024-01-10"), ("Fee", "1.25%")].into_iter().collect();
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"Date":"2024-01-10","Fee":"1.25%"}"#);

        let back: TableRow = serde_json::from_str(&json).unwrap();
        assert_eq!(back.headers().collect::<Vec<_>>(), vec!["Date", "Fee"]);
    }

    #[test]
    fn test_field_value_render() {
        let count = FieldValue::Count(Decimal::from_str("1500000.0").unwrap());
        assert_eq!(count.render(), "1500000");
        assert_eq!(FieldValue::Percent("1.25%".into()).render(), "1.25%");
    }

    #[test]
    fn test_same_content_ignores_timestamps() {
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

        let mut a = TickerRecord::new("ABCD", t1);
        a.crawls_by_source
            .insert("src".into(), PageCrawlRecord::empty("src", "https://a", t1));
        let mut b = a.clone();
        b.last_updated_at = t2;
        b.crawls_by_source.get_mut("src").unwrap().crawled_at = t2;

        assert!(a.same_content(&b));
        b.scalar_fields
            .insert(CanonicalKey::Sector, FieldValue::Text("Energy".into()));
        assert!(!a.same_content(&b));
    }
}
