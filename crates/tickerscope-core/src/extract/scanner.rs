//! Document walk producing raw label/value occurrences.
//!
//! Three strategies run in a fixed order over the same tree:
//!
//! 1. paired elements (`dl > dt + dd`, `[data-label] + [data-value]`)
//! 2. tables, both as two-cell `label | value` rows and as header-keyed tables
//! 3. inline `Label: value` runs inside leaf block text
//!
//! Occurrences are returned in that order, and in document order within each
//! strategy, which is what first-occurrence inference relies on.

use std::cell::Cell;

use tracing::debug;

use crate::document::{
    descendants, find_by_tag, has_ancestor, is_heading, nearest_heading, next_element_sibling,
    structural_path, DocumentNode, BLOCK_TAGS, STRUCTURED_TAGS,
};
use crate::error::Skip;
use crate::models::{ClassifierConfig, Occurrence, Strategy, Table};
use super::canonical::LabelCanonicalizer;
use super::patterns::INLINE_LABEL;
use super::sanitize::{digit_ratio, sanitize, ValueClassifier};
use super::table::{is_marked_header, TableExtractor, TableGrid};

/// Everything one scan found.
#[derive(Debug, Clone, Default)]
pub struct ScanOutput {
    pub occurrences: Vec<Occurrence>,
    /// Tables with unique keys, in document order.
    pub tables: Vec<Table>,
    pub skips: Vec<Skip>,
}

/// Marks a scan as in flight until dropped.
#[derive(Debug)]
pub struct ScanGuard<'a> {
    flag: &'a Cell<bool>,
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

/// Walks a document with every extraction strategy.
///
/// At most one scan runs per scanner; a second request while one is in flight
/// is refused with [`Skip::ConcurrentScanAborted`].
#[derive(Debug, Default)]
pub struct DocumentScanner {
    classifier: ValueClassifier,
    canonicalizer: LabelCanonicalizer,
    tables: TableExtractor,
    in_flight: Cell<bool>,
}

impl DocumentScanner {
    pub fn new(config: ClassifierConfig) -> Self {
        let classifier = ValueClassifier::new(config);
        Self {
            tables: TableExtractor::new(classifier.clone()),
            classifier,
            canonicalizer: LabelCanonicalizer::new(),
            in_flight: Cell::new(false),
        }
    }

    /// Claim the scanner, or `None` when a scan is already running.
    pub fn begin(&self) -> Option<ScanGuard<'_>> {
        if self.in_flight.replace(true) {
            None
        } else {
            Some(ScanGuard {
                flag: &self.in_flight,
            })
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.in_flight.get()
    }

    /// Run all strategies over `root`.
    pub fn scan<N: DocumentNode>(&self, root: &N) -> Result<ScanOutput, Skip> {
        let Some(_guard) = self.begin() else {
            debug!("scan requested while another is in flight");
            return Err(Skip::ConcurrentScanAborted);
        };

        let mut output = ScanOutput::default();

        if !self.scan_paired(root, &mut output.occurrences) {
            output.skips.push(Skip::SourceUnavailable("paired_element"));
        }
        if !self.scan_tables(root, &mut output.occurrences, &mut output.tables) {
            output.skips.push(Skip::SourceUnavailable("table"));
        }
        if !self.scan_inline(root, &mut output.occurrences) {
            output.skips.push(Skip::SourceUnavailable("inline_prose"));
        }

        for skip in &output.skips {
            debug!(%skip, "strategy skipped");
        }
        debug!(
            occurrences = output.occurrences.len(),
            tables = output.tables.len(),
            "scan complete"
        );
        Ok(output)
    }

    fn scan_paired<N: DocumentNode>(&self, root: &N, out: &mut Vec<Occurrence>) -> bool {
        let mut found = false;

        for dl in find_by_tag(root, "dl") {
            found = true;
            // `dt`/`dd` may sit directly in the list or inside grouping divs.
            let terms = dl.children().into_iter().flat_map(|child| {
                if child.tag() == "div" {
                    child.children()
                } else {
                    vec![child]
                }
            });
            for dt in terms.filter(|n| n.tag() == "dt") {
                if let Some(dd) = next_element_sibling(&dt).filter(|n| n.tag() == "dd") {
                    self.push_pair(out, &dt.text(), &dd.text(), Strategy::PairedElement, &dd);
                }
            }
        }

        for label in descendants(root)
            .into_iter()
            .filter(|n| n.attribute("data-label").is_some())
        {
            if let Some(value) =
                next_element_sibling(&label).filter(|n| n.attribute("data-value").is_some())
            {
                found = true;
                self.push_pair(out, &label.text(), &value.text(), Strategy::PairedElement, &value);
            }
        }

        found
    }

    fn scan_tables<N: DocumentNode>(
        &self,
        root: &N,
        out: &mut Vec<Occurrence>,
        tables: &mut Vec<Table>,
    ) -> bool {
        let nodes = find_by_tag(root, "table");

        for node in &nodes {
            let grid = self.tables.grid(node);
            // A headerless `label | value` list has no header row to skip.
            let label_list = !grid.explicit_header && self.is_label_list(&grid);

            for (i, row) in grid.all_rows.iter().enumerate() {
                let is_header = Some(i) == grid.header_index || is_marked_header(&row.node);
                if is_header && !label_list {
                    continue;
                }
                if row.cells.len() == 2 && self.classifier.is_likely_label(&row.cells[0]) {
                    self.push_pair(
                        out,
                        &row.raw_cells[0],
                        &row.raw_cells[1],
                        Strategy::Table,
                        &row.node,
                    );
                }
            }

            let mut table = self.tables.extract(node, &grid);
            table.key = unique_key(tables, &table.key);
            tables.push(table);
        }

        !nodes.is_empty()
    }

    /// Every row is two cells with a label on the left, the first row included.
    fn is_label_list<N: DocumentNode>(&self, grid: &TableGrid<N>) -> bool {
        !grid.all_rows.is_empty()
            && grid
                .all_rows
                .iter()
                .all(|row| row.cells.len() == 2 && self.classifier.is_likely_label(&row.cells[0]))
    }

    fn scan_inline<N: DocumentNode>(&self, root: &N, out: &mut Vec<Occurrence>) -> bool {
        let mut candidates = Vec::new();
        if is_leaf_block(root) {
            candidates.push(root.clone());
        }
        candidates.extend(
            descendants(root)
                .into_iter()
                .filter(|n| is_leaf_block(n) && !has_ancestor(n, STRUCTURED_TAGS)),
        );

        let mut found = false;
        for node in candidates {
            let runs = self.inline_runs(&sanitize(&node.text()));
            found |= !runs.is_empty();
            for (label, value) in runs {
                self.push_pair(out, &label, &value, Strategy::InlineProse, &node);
            }
        }
        found
    }

    /// `(label, value)` runs of one block of sanitized text.
    ///
    /// A value runs until the next label. When a label candidate swallowed
    /// trailing words of the previous value ("Technology Industry"), the
    /// longest known suffix becomes the label and the rest goes back.
    pub fn inline_runs(&self, text: &str) -> Vec<(String, String)> {
        let config = self.classifier.config();

        // (label start, label, value start)
        let mut anchors: Vec<(usize, &str, usize)> = Vec::new();
        for caps in INLINE_LABEL.captures_iter(text) {
            let (Some(label), Some(sep)) = (caps.name("label"), caps.name("sep")) else {
                continue;
            };
            if sep.as_str() == ":" && text[sep.end()..].starts_with("//") {
                continue;
            }
            let name = label.as_str().trim();
            if name.chars().count() > config.max_inline_label_len
                || digit_ratio(name) > config.digit_heavy_ratio
            {
                continue;
            }
            // "Industry: Software - Application": an unknown label right after
            // another label's separator is part of that label's value.
            if let Some(&(_, _, previous_value)) = anchors.last() {
                let gap = text[previous_value..label.start()].trim();
                if gap.is_empty() && !self.names_anchor(name) {
                    continue;
                }
            }
            anchors.push((label.start(), name, sep.end()));
        }

        let mut runs: Vec<(String, String)> = Vec::with_capacity(anchors.len());
        for (i, (_, name, value_start)) in anchors.iter().enumerate() {
            let value_end = anchors.get(i + 1).map_or(text.len(), |next| next.0);
            let value = trim_value(&text[*value_start..value_end]);

            let (prefix, label) = self.split_known_suffix(name);
            if let (Some(prefix), Some((_, previous))) = (prefix, runs.last_mut()) {
                if previous.is_empty() {
                    *previous = prefix;
                } else {
                    previous.push(' ');
                    previous.push_str(&prefix);
                }
            }
            runs.push((label, value.to_string()));
        }
        runs
    }

    fn is_anchor(&self, label: &str) -> bool {
        self.canonicalizer.is_known(label)
            || self.canonicalizer.is_blacklisted(label)
            || self.canonicalizer.split_compound(label).is_some()
    }

    /// The label, or a trailing run of its words, is an anchor.
    fn names_anchor(&self, label: &str) -> bool {
        self.is_anchor(label) || self.split_known_suffix(label).0.is_some()
    }

    fn split_known_suffix(&self, label: &str) -> (Option<String>, String) {
        if self.is_anchor(label) {
            return (None, label.to_string());
        }
        let words: Vec<&str> = label.split_whitespace().collect();
        for i in 1..words.len() {
            let suffix = words[i..].join(" ");
            if self.is_anchor(&suffix) {
                return (Some(words[..i].join(" ")), suffix);
            }
        }
        (None, label.to_string())
    }

    /// Emit one occurrence, or two when the label is a known compound and the
    /// value splits at `/`.
    fn push_pair<N: DocumentNode>(
        &self,
        out: &mut Vec<Occurrence>,
        label: &str,
        raw_value: &str,
        strategy: Strategy,
        node: &N,
    ) {
        let label = sanitize(label);
        if label.is_empty() {
            return;
        }

        let parts: Vec<(String, &str)> = match self.canonicalizer.split_compound(&label) {
            Some((first, second)) => match raw_value
                .split_once(" / ")
                .or_else(|| raw_value.split_once('/'))
            {
                Some((a, b)) => vec![(first.to_string(), a), (second.to_string(), b)],
                None => vec![(label, raw_value)],
            },
            None => vec![(label, raw_value)],
        };

        let path = structural_path(node);
        let heading = nearest_heading(node);
        for (label, raw) in parts {
            let value = sanitize(raw);
            if value.is_empty() {
                continue;
            }
            out.push(Occurrence {
                label,
                value,
                raw_value: raw.to_string(),
                strategy,
                structural_path: path.clone(),
                nearest_heading: heading.clone(),
            });
        }
    }
}

/// A block element holding no other block, heading or structured element.
fn is_leaf_block<N: DocumentNode>(node: &N) -> bool {
    BLOCK_TAGS.contains(&node.tag())
        && !descendants(node).iter().any(|d| {
            BLOCK_TAGS.contains(&d.tag()) || STRUCTURED_TAGS.contains(&d.tag()) || is_heading(d)
        })
}

fn trim_value(value: &str) -> &str {
    value.trim().trim_end_matches(|c: char| {
        c.is_whitespace() || matches!(c, ';' | '|' | '•' | '·' | ',' | '(')
    })
}

/// `key`, or `key_2`, `key_3`, … when already taken.
fn unique_key(tables: &[Table], key: &str) -> String {
    let taken = |candidate: &str| tables.iter().any(|t| t.key == candidate);
    if !taken(key) {
        return key.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{key}_{n}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Snapshot, SnapshotNode};
    use pretty_assertions::assert_eq;

    fn scan(root: SnapshotNode) -> ScanOutput {
        let snapshot = Snapshot::from_tree(root);
        DocumentScanner::default().scan(&snapshot.root()).unwrap()
    }

    fn pairs(output: &ScanOutput) -> Vec<(&str, &str, Strategy)> {
        output
            .occurrences
            .iter()
            .map(|o| (o.label.as_str(), o.value.as_str(), o.strategy))
            .collect()
    }

    fn row(tag: &str, cells: &[&str]) -> SnapshotNode {
        SnapshotNode::new("tr").children(cells.iter().map(|c| SnapshotNode::with_text(tag, *c)))
    }

    #[test]
    fn test_paired_elements() {
        let output = scan(
            SnapshotNode::new("body")
                .child(SnapshotNode::with_text("h2", "Profile"))
                .child(
                    SnapshotNode::new("dl")
                        .child(SnapshotNode::with_text("dt", "Sector"))
                        .child(SnapshotNode::with_text("dd", " Technology\u{200B} "))
                        .child(SnapshotNode::with_text("dt", "Orphan")),
                )
                .child(
                    SnapshotNode::new("div")
                        .child(SnapshotNode::with_text("span", "Float").attr("data-label", ""))
                        .child(SnapshotNode::with_text("span", "1.5M").attr("data-value", "")),
                ),
        );

        assert_eq!(
            pairs(&output)[..2],
            [
                ("Sector", "Technology", Strategy::PairedElement),
                ("Float", "1.5M", Strategy::PairedElement),
            ]
        );
        let sector = &output.occurrences[0];
        assert_eq!(sector.raw_value, "Technology\u{200B}");
        assert_eq!(sector.nearest_heading.as_deref(), Some("Profile"));
        assert_eq!(sector.structural_path, "body[0]>dl[0]>dd[0]");
    }

    #[test]
    fn test_two_cell_rows_skip_marked_header() {
        let output = scan(
            SnapshotNode::new("body")
                .child(
                    SnapshotNode::new("table")
                        .child(row("th", &["Metric", "Value"]))
                        .child(row("td", &["Short Interest", "2.3M"]))
                        .child(row("td", &["2024-01-10", "1.25%"])),
                )
                .child(
                    SnapshotNode::new("table")
                        .child(row("td", &["Float", "1.5M"]))
                        .child(row("td", &["Shares Outstanding", "3M"])),
                ),
        );

        assert_eq!(
            pairs(&output),
            vec![
                ("Short Interest", "2.3M", Strategy::Table),
                ("Float", "1.5M", Strategy::Table),
                ("Shares Outstanding", "3M", Strategy::Table),
            ]
        );
        assert_eq!(output.tables.len(), 2);
    }

    #[test]
    fn test_implicit_header_row_not_emitted() {
        let output = scan(
            SnapshotNode::new("body").child(
                SnapshotNode::new("table")
                    .child(row("td", &["Date", "Fee"]))
                    .child(row("td", &["2024-01-10", "1.25%"])),
            ),
        );
        assert!(output.occurrences.is_empty());
        assert_eq!(output.tables[0].headers, vec!["Date", "Fee"]);
        assert_eq!(output.tables[0].rows[0].get("Fee"), Some("1.25%"));
    }

    #[test]
    fn test_structured_root() {
        let table = scan(
            SnapshotNode::new("table")
                .child(row("td", &["Float", "1.5M"]))
                .child(row("td", &["Shares Outstanding", "3M"])),
        );
        assert_eq!(
            pairs(&table),
            vec![
                ("Float", "1.5M", Strategy::Table),
                ("Shares Outstanding", "3M", Strategy::Table),
            ]
        );
        assert_eq!(table.tables.len(), 1);
        assert!(!table.skips.contains(&Skip::SourceUnavailable("table")));

        let list = scan(
            SnapshotNode::new("dl")
                .child(SnapshotNode::with_text("dt", "Sector"))
                .child(SnapshotNode::with_text("dd", "Technology")),
        );
        assert_eq!(pairs(&list), vec![("Sector", "Technology", Strategy::PairedElement)]);
        assert!(!list.skips.contains(&Skip::SourceUnavailable("paired_element")));
    }

    #[test]
    fn test_duplicate_table_keys_suffixed() {
        let table = || SnapshotNode::new("table").attr("id", "fees").child(row("th", &["Date"]));
        let output = scan(SnapshotNode::new("body").child(table()).child(table()).child(table()));
        let keys: Vec<_> = output.tables.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, vec!["fees", "fees_2", "fees_3"]);
    }

    #[test]
    fn test_inline_runs() {
        let scanner = DocumentScanner::default();
        assert_eq!(
            scanner.inline_runs("Float: 1.5M Short Interest: 2.3M"),
            vec![
                ("Float".to_string(), "1.5M".to_string()),
                ("Short Interest".to_string(), "2.3M".to_string()),
            ]
        );
        assert_eq!(
            scanner.inline_runs("Sector: Technology Industry: Software"),
            vec![
                ("Sector".to_string(), "Technology".to_string()),
                ("Industry".to_string(), "Software".to_string()),
            ]
        );
        assert_eq!(
            scanner.inline_runs("Industry: Software - Application"),
            vec![("Industry".to_string(), "Software - Application".to_string())]
        );
        assert_eq!(
            scanner.inline_runs("Industry: Software - Application Float: 1.5M"),
            vec![
                ("Industry".to_string(), "Software - Application".to_string()),
                ("Float".to_string(), "1.5M".to_string()),
            ]
        );
        assert_eq!(
            scanner.inline_runs("See https://example.com for more"),
            Vec::<(String, String)>::new()
        );
    }

    #[test]
    fn test_inline_only_in_leaf_blocks_outside_structures() {
        let output = scan(
            SnapshotNode::new("body")
                .child(
                    SnapshotNode::new("div")
                        .child(SnapshotNode::with_text("p", "Cost to Borrow: 12.5%"))
                        .child(
                            SnapshotNode::new("p")
                                .child(SnapshotNode::with_text("b", "Float:"))
                                .child(SnapshotNode::with_text("span", "1.5M")),
                        ),
                )
                .child(
                    SnapshotNode::new("table").child(
                        SnapshotNode::new("tr")
                            .child(SnapshotNode::new("td").child(SnapshotNode::with_text("p", "Ignored: 1"))),
                    ),
                ),
        );

        let inline: Vec<_> = pairs(&output)
            .into_iter()
            .filter(|(_, _, s)| *s == Strategy::InlineProse)
            .collect();
        assert_eq!(
            inline,
            vec![
                ("Cost to Borrow", "12.5%", Strategy::InlineProse),
                ("Float", "1.5M", Strategy::InlineProse),
            ]
        );
    }

    #[test]
    fn test_compound_label_split() {
        let output = scan(
            SnapshotNode::new("body").child(SnapshotNode::with_text("p", "Mkt Cap & EV: 20.4M / 83.1M")),
        );
        assert_eq!(
            pairs(&output),
            vec![
                ("Market Cap", "20.4M", Strategy::InlineProse),
                ("Enterprise Value", "83.1M", Strategy::InlineProse),
            ]
        );
    }

    #[test]
    fn test_strategy_order() {
        let output = scan(
            SnapshotNode::new("body")
                .child(SnapshotNode::with_text("p", "Float: 9M"))
                .child(SnapshotNode::new("table").child(row("td", &["Float", "8M"])))
                .child(
                    SnapshotNode::new("dl")
                        .child(SnapshotNode::with_text("dt", "Float"))
                        .child(SnapshotNode::with_text("dd", "7M")),
                ),
        );
        let values: Vec<_> = output.occurrences.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["7M", "8M", "9M"]);
    }

    #[test]
    fn test_empty_document_reports_every_strategy() {
        let output = scan(SnapshotNode::new("body"));
        assert!(output.occurrences.is_empty());
        assert!(output.tables.is_empty());
        assert_eq!(
            output.skips,
            vec![
                Skip::SourceUnavailable("paired_element"),
                Skip::SourceUnavailable("table"),
                Skip::SourceUnavailable("inline_prose"),
            ]
        );
    }

    #[test]
    fn test_second_scan_while_in_flight_is_refused() {
        let snapshot = Snapshot::from_tree(SnapshotNode::with_text("p", "Float: 1M"));
        let scanner = DocumentScanner::default();

        let guard = scanner.begin().unwrap();
        assert!(scanner.is_scanning());
        assert_eq!(scanner.scan(&snapshot.root()).unwrap_err(), Skip::ConcurrentScanAborted);

        drop(guard);
        assert!(!scanner.is_scanning());
        let output = scanner.scan(&snapshot.root()).unwrap();
        assert_eq!(output.occurrences.len(), 1);
        assert!(!scanner.is_scanning());
    }
}
