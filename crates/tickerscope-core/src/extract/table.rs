//! Header-keyed table extraction with per-column usefulness filtering.

use tracing::debug;

use crate::document::{nearest_heading, DocumentNode};
use crate::models::{Table, TableRow};
use super::patterns::{DATE_HEADER, NON_DATA_HEADER, NON_ALNUM};
use super::sanitize::{sanitize, ValueClassifier};

/// Fallback identity for tables with no id, caption or heading.
pub const DEFAULT_TABLE_KEY: &str = "table";

/// One `tr` with its cell texts.
#[derive(Debug, Clone)]
pub struct GridRow<N> {
    pub node: N,
    /// Cell text as found.
    pub raw_cells: Vec<String>,
    /// Sanitized cell text.
    pub cells: Vec<String>,
}

/// Rows of a table node, split into header and data rows.
#[derive(Debug, Clone)]
pub struct TableGrid<N> {
    pub headers: Vec<String>,
    /// Position of the header row in `all_rows`.
    pub header_index: Option<usize>,
    /// Whether the header row was marked up as one (`thead` or all `th`).
    pub explicit_header: bool,
    pub data_rows: Vec<GridRow<N>>,
    /// Every row, header included, in document order.
    pub all_rows: Vec<GridRow<N>>,
}

/// How a column is treated regardless of individual cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnRule {
    Keep,
    Drop,
    PerCell,
}

fn column_rule(header: &str) -> ColumnRule {
    if DATE_HEADER.is_match(header) {
        ColumnRule::Keep
    } else if NON_DATA_HEADER.is_match(header) {
        ColumnRule::Drop
    } else {
        ColumnRule::PerCell
    }
}

/// Converts table nodes into [`Table`]s.
#[derive(Debug, Clone, Default)]
pub struct TableExtractor {
    classifier: ValueClassifier,
}

impl TableExtractor {
    pub fn new(classifier: ValueClassifier) -> Self {
        Self { classifier }
    }

    /// Read the rows of `table` (ignoring nested tables) and pick the header.
    pub fn grid<N: DocumentNode>(&self, table: &N) -> TableGrid<N> {
        let mut raw_rows = Vec::new();
        collect_rows(table, &mut raw_rows);

        let all_rows: Vec<GridRow<N>> = raw_rows
            .into_iter()
            .map(|node| {
                let raw_cells: Vec<String> = node
                    .children()
                    .iter()
                    .filter(|c| matches!(c.tag(), "td" | "th"))
                    .map(|c| c.text())
                    .collect();
                let cells = raw_cells.iter().map(|c| sanitize(c)).collect();
                GridRow {
                    node,
                    raw_cells,
                    cells,
                }
            })
            .collect();

        let marked = all_rows.iter().position(|row| is_marked_header(&row.node));
        let header_index = marked.or(if all_rows.is_empty() { None } else { Some(0) });

        let headers = header_index
            .map(|i| header_names(&all_rows[i].cells))
            .unwrap_or_default();
        let data_rows = all_rows
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != header_index)
            .map(|(_, row)| row.clone())
            .collect();

        TableGrid {
            headers,
            header_index,
            explicit_header: marked.is_some(),
            data_rows,
            all_rows,
        }
    }

    /// Build the filtered table. `key` collisions are resolved by the caller.
    pub fn extract<N: DocumentNode>(&self, table: &N, grid: &TableGrid<N>) -> Table {
        let (display_name, key) = table_identity(table);

        let mut rows = Vec::new();
        for grid_row in &grid.data_rows {
            let mut row = TableRow::new();
            for (i, value) in grid_row.cells.iter().enumerate() {
                let header = grid
                    .headers
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| positional_header(i));
                let keep = match column_rule(&header) {
                    ColumnRule::Keep => !value.is_empty(),
                    ColumnRule::Drop => false,
                    ColumnRule::PerCell => {
                        !value.is_empty() && self.classifier.looks_like_value(value)
                    }
                };
                if keep {
                    row.insert(header, value.clone());
                }
            }
            if !row.is_empty() {
                rows.push(row);
            }
        }

        let headers = surviving_headers(&grid.headers, &rows);
        debug!(
            table = %key,
            rows = rows.len(),
            dropped = grid.data_rows.len() - rows.len(),
            "extracted table"
        );

        Table {
            key,
            display_name,
            headers,
            rows,
        }
    }
}

fn collect_rows<N: DocumentNode>(node: &N, out: &mut Vec<N>) {
    for child in node.children() {
        match child.tag() {
            "tr" => out.push(child),
            "table" => {}
            _ => collect_rows(&child, out),
        }
    }
}

pub(super) fn is_marked_header<N: DocumentNode>(row: &N) -> bool {
    if row.parent().is_some_and(|p| p.tag() == "thead") {
        return true;
    }
    let cells: Vec<N> = row
        .children()
        .into_iter()
        .filter(|c| matches!(c.tag(), "td" | "th"))
        .collect();
    !cells.is_empty() && cells.iter().all(|c| c.tag() == "th")
}

fn positional_header(index: usize) -> String {
    format!("column_{}", index + 1)
}

/// Header names with blanks replaced by positions and repeats suffixed.
fn header_names(cells: &[String]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(cells.len());
    for (i, cell) in cells.iter().enumerate() {
        let base = if cell.is_empty() {
            positional_header(i)
        } else {
            cell.clone()
        };
        let mut name = base.clone();
        let mut n = 2;
        while names.contains(&name) {
            name = format!("{base}_{n}");
            n += 1;
        }
        names.push(name);
    }
    names
}

/// Headers that still have a cell in some row; all non-dropped headers when
/// no row survived.
fn surviving_headers(headers: &[String], rows: &[TableRow]) -> Vec<String> {
    if rows.is_empty() {
        return headers
            .iter()
            .filter(|h| column_rule(h) != ColumnRule::Drop)
            .cloned()
            .collect();
    }
    let mut out: Vec<String> = headers
        .iter()
        .filter(|h| rows.iter().any(|r| r.get(h).is_some()))
        .cloned()
        .collect();
    for row in rows {
        for header in row.headers() {
            if !out.iter().any(|h| h == header) {
                out.push(header.to_string());
            }
        }
    }
    out
}

/// Display name and stable key: explicit id, caption, nearest heading, default.
fn table_identity<N: DocumentNode>(table: &N) -> (String, String) {
    let explicit = ["id", "data-table", "data-key"]
        .iter()
        .find_map(|attr| table.attribute(attr))
        .map(|s| sanitize(&s))
        .filter(|s| !s.is_empty());
    let caption = || {
        table
            .children()
            .into_iter()
            .find(|c| c.tag() == "caption")
            .map(|c| sanitize(&c.text()))
            .filter(|s| !s.is_empty())
    };

    let display = explicit
        .or_else(caption)
        .or_else(|| nearest_heading(table).map(|h| sanitize(&h)))
        .unwrap_or_else(|| "Table".to_string());
    let key = normalize_table_key(&display);
    (display, key)
}

/// `"Short Interest History"` → `"short_interest_history"`.
pub fn normalize_table_key(name: &str) -> String {
    let lower = name.to_lowercase();
    let key = NON_ALNUM.replace_all(&lower, "_");
    let key = key.trim_matches('_');
    if key.is_empty() {
        DEFAULT_TABLE_KEY.to_string()
    } else {
        key.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{find_by_tag, Snapshot, SnapshotNode};
    use pretty_assertions::assert_eq;

    fn row(tag: &str, cells: &[&str]) -> SnapshotNode {
        SnapshotNode::new("tr").children(cells.iter().map(|c| SnapshotNode::with_text(tag, *c)))
    }

    fn extract(snapshot: &Snapshot) -> Table {
        let extractor = TableExtractor::default();
        let table = &find_by_tag(&snapshot.root(), "table")[0];
        let grid = extractor.grid(table);
        extractor.extract(table, &grid)
    }

    #[test]
    fn test_notes_column_dropped_date_kept() {
        let snapshot = Snapshot::from_tree(
            SnapshotNode::new("table")
                .child(row("th", &["date", "notes"]))
                .child(row("td", &["2024-01-15", "This figure represents the settled total"])),
        );
        let table = extract(&snapshot);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(
            table.rows[0].iter().collect::<Vec<_>>(),
            vec![("date", "2024-01-15")]
        );
        assert_eq!(table.headers, vec!["date"]);
    }

    #[test]
    fn test_rows_without_useful_cells_dropped() {
        let snapshot = Snapshot::from_tree(
            SnapshotNode::new("table")
                .child(SnapshotNode::new("thead").child(row("td", &["Fee", "Comment"])))
                .child(
                    SnapshotNode::new("tbody")
                        .child(row("td", &["1.25%", "ok"]))
                        .child(row("td", &["Please read the methodology first", "n/a"])),
                ),
        );
        let table = extract(&snapshot);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].get("Fee"), Some("1.25%"));
        assert_eq!(table.rows[0].get("Comment"), None);
    }

    #[test]
    fn test_positional_and_duplicate_headers() {
        let snapshot = Snapshot::from_tree(
            SnapshotNode::new("table")
                .child(row("th", &["Volume", "", "Volume"]))
                .child(row("td", &["100", "200", "300", "400"])),
        );
        let table = extract(&snapshot);
        assert_eq!(
            table.rows[0].iter().collect::<Vec<_>>(),
            vec![
                ("Volume", "100"),
                ("column_2", "200"),
                ("Volume_2", "300"),
                ("column_4", "400"),
            ]
        );
    }

    #[test]
    fn test_identity_precedence() {
        let with_id = Snapshot::from_tree(
            SnapshotNode::new("body")
                .child(SnapshotNode::with_text("h2", "Borrow Fees"))
                .child(SnapshotNode::new("table").attr("id", "ctb-history").child(row("th", &["Date"]))),
        );
        let table = extract(&with_id);
        assert_eq!(table.key, "ctb_history");

        let with_heading = Snapshot::from_tree(
            SnapshotNode::new("body")
                .child(SnapshotNode::with_text("h2", "Short Interest History"))
                .child(SnapshotNode::new("table").child(row("th", &["Date"]))),
        );
        let table = extract(&with_heading);
        assert_eq!(table.key, "short_interest_history");
        assert_eq!(table.display_name, "Short Interest History");

        let bare = Snapshot::from_tree(SnapshotNode::new("table").child(row("th", &["Date"])));
        assert_eq!(extract(&bare).key, DEFAULT_TABLE_KEY);
    }

    #[test]
    fn test_nested_tables_not_merged() {
        let snapshot = Snapshot::from_tree(
            SnapshotNode::new("table")
                .child(row("th", &["Date", "Fee"]))
                .child(
                    SnapshotNode::new("tr")
                        .child(SnapshotNode::with_text("td", "2024-01-10"))
                        .child(SnapshotNode::new("td").child(
                            SnapshotNode::new("table").child(row("td", &["inner", "1"])),
                        )),
                ),
        );
        let extractor = TableExtractor::default();
        let tables = find_by_tag(&snapshot.root(), "table");
        let grid = extractor.grid(&tables[0]);
        assert_eq!(tables.len(), 2);
        assert_eq!(grid.all_rows.len(), 2);
        assert!(grid.explicit_header);
        assert_eq!(grid.header_index, Some(0));
    }

    #[test]
    fn test_header_index() {
        let marked = Snapshot::from_tree(
            SnapshotNode::new("table")
                .child(row("td", &["ignored", "x"]))
                .child(SnapshotNode::new("thead").child(row("td", &["Date", "Fee"])))
                .child(row("td", &["2024-01-10", "1.25%"])),
        );
        let extractor = TableExtractor::default();
        let grid = extractor.grid(&marked.root());
        assert_eq!(grid.header_index, Some(1));
        assert_eq!(grid.headers, vec!["Date", "Fee"]);
        assert_eq!(grid.data_rows.len(), 2);

        let implicit = Snapshot::from_tree(
            SnapshotNode::new("table")
                .child(row("td", &["Date", "Fee"]))
                .child(row("td", &["2024-01-10", "1.25%"])),
        );
        let grid = extractor.grid(&implicit.root());
        assert_eq!(grid.header_index, Some(0));
        assert!(!grid.explicit_header);

        let empty = Snapshot::from_tree(SnapshotNode::new("table"));
        assert_eq!(extractor.grid(&empty.root()).header_index, None);
    }
}
