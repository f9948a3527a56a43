//! Minimal document tree interface.
//!
//! The pipeline only ever walks a tree through [`DocumentNode`], so it runs
//! the same against a live page adapter or a synthetic [`Snapshot`].

mod snapshot;

pub use snapshot::{NodeRef, Snapshot, SnapshotNode};

/// A node of a rendered document.
pub trait DocumentNode: Clone {
    /// Lowercase element name (`"table"`, `"dt"`, `"#text"`, …).
    fn tag(&self) -> &str;

    /// Text content of the node and all its descendants.
    fn text(&self) -> String;

    /// Attribute value, if present.
    fn attribute(&self, name: &str) -> Option<String>;

    /// Child nodes in document order.
    fn children(&self) -> Vec<Self>;

    /// Sibling immediately before this node.
    fn previous_sibling(&self) -> Option<Self>;

    /// Parent node; `None` for the root.
    fn parent(&self) -> Option<Self>;
}

const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

/// Block-level tags whose text can hold inline `Label: value` runs.
pub const BLOCK_TAGS: &[&str] = &[
    "p", "div", "li", "section", "article", "blockquote", "header", "footer", "main", "aside",
    "pre", "body",
];

/// Tags that own their own extraction strategy.
pub const STRUCTURED_TAGS: &[&str] = &["table", "dl"];

pub fn is_heading<N: DocumentNode>(node: &N) -> bool {
    HEADING_TAGS.contains(&node.tag())
}

/// All descendants of `node` in pre-order, excluding `node` itself.
pub fn descendants<N: DocumentNode>(node: &N) -> Vec<N> {
    let mut out = Vec::new();
    let mut stack: Vec<N> = node.children().into_iter().rev().collect();
    while let Some(current) = stack.pop() {
        stack.extend(current.children().into_iter().rev());
        out.push(current);
    }
    out
}

/// `node` and its descendants whose tag is `tag`, in document order.
pub fn find_by_tag<N: DocumentNode>(node: &N, tag: &str) -> Vec<N> {
    std::iter::once(node.clone())
        .chain(descendants(node))
        .filter(|n| n.tag() == tag)
        .collect()
}

/// Whether any ancestor of `node` has one of the given tags.
pub fn has_ancestor<N: DocumentNode>(node: &N, tags: &[&str]) -> bool {
    let mut current = node.parent();
    while let Some(p) = current {
        if tags.contains(&p.tag()) {
            return true;
        }
        current = p.parent();
    }
    false
}

/// Sibling immediately after `node`, skipping bare text nodes.
pub fn next_element_sibling<N: DocumentNode>(node: &N) -> Option<N> {
    let parent = node.parent()?;
    let siblings = parent.children();
    let index = index_in_parent(node);
    siblings
        .into_iter()
        .skip(index + 1)
        .find(|s| s.tag() != "#text")
}

/// Position of `node` among all its siblings.
fn index_in_parent<N: DocumentNode>(node: &N) -> usize {
    let mut index = 0;
    let mut current = node.previous_sibling();
    while let Some(s) = current {
        index += 1;
        current = s.previous_sibling();
    }
    index
}

/// Text of the closest heading above `node` in document order.
///
/// Looks at preceding siblings (and inside them, last heading first), then
/// climbs to the parent and repeats.
pub fn nearest_heading<N: DocumentNode>(node: &N) -> Option<String> {
    let mut current = node.clone();
    loop {
        let mut sibling = current.previous_sibling();
        while let Some(s) = sibling {
            if let Some(text) = last_heading_within(&s) {
                return Some(text);
            }
            sibling = s.previous_sibling();
        }
        current = current.parent()?;
        if is_heading(&current) {
            return heading_text(&current);
        }
    }
}

fn last_heading_within<N: DocumentNode>(node: &N) -> Option<String> {
    if is_heading(node) {
        return heading_text(node);
    }
    descendants(node)
        .iter()
        .rev()
        .filter(|n| is_heading(*n))
        .find_map(heading_text)
}

fn heading_text<N: DocumentNode>(node: &N) -> Option<String> {
    let text = node.text();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Provenance path from the root: `body[0]>table[1]>tr[3]`.
///
/// Each index counts preceding siblings with the same tag.
pub fn structural_path<N: DocumentNode>(node: &N) -> String {
    let mut segments = Vec::new();
    let mut current = Some(node.clone());
    while let Some(n) = current {
        let tag = n.tag().to_string();
        let mut index = 0;
        let mut sibling = n.previous_sibling();
        while let Some(s) = sibling {
            if s.tag() == tag {
                index += 1;
            }
            sibling = s.previous_sibling();
        }
        segments.push(format!("{tag}[{index}]"));
        current = n.parent();
    }
    segments.reverse();
    segments.join(">")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Snapshot {
        Snapshot::from_tree(
            SnapshotNode::new("body")
                .child(SnapshotNode::with_text("h1", "ACME Corp"))
                .child(
                    SnapshotNode::new("section")
                        .child(SnapshotNode::with_text("h2", "Short Interest"))
                        .child(SnapshotNode::with_text("p", "intro"))
                        .child(
                            SnapshotNode::new("table")
                                .child(SnapshotNode::new("tr").child(SnapshotNode::with_text("td", "a")))
                                .child(SnapshotNode::new("tr").child(SnapshotNode::with_text("td", "b"))),
                        ),
                )
                .child(SnapshotNode::with_text("p", "footer")),
        )
    }

    #[test]
    fn test_nearest_heading_prefers_closest() {
        let snapshot = sample();
        let tables = find_by_tag(&snapshot.root(), "table");
        assert_eq!(nearest_heading(&tables[0]).as_deref(), Some("Short Interest"));

        let cells = find_by_tag(&snapshot.root(), "td");
        assert_eq!(nearest_heading(&cells[1]).as_deref(), Some("Short Interest"));
    }

    #[test]
    fn test_nearest_heading_searches_inside_previous_siblings() {
        let snapshot = sample();
        let paragraphs = find_by_tag(&snapshot.root(), "p");
        let footer = paragraphs.last().unwrap();
        assert_eq!(footer.text(), "footer");
        assert_eq!(nearest_heading(footer).as_deref(), Some("Short Interest"));
    }

    #[test]
    fn test_nearest_heading_none_at_top() {
        let snapshot = Snapshot::from_tree(
            SnapshotNode::new("body").child(SnapshotNode::with_text("p", "alone")),
        );
        let p = find_by_tag(&snapshot.root(), "p");
        assert_eq!(nearest_heading(&p[0]), None);
    }

    #[test]
    fn test_find_by_tag_includes_root() {
        let snapshot = sample();
        let sections = find_by_tag(&snapshot.root(), "section");
        let tables = find_by_tag(&sections[0], "table");
        assert_eq!(find_by_tag(&tables[0], "table"), tables);
        assert_eq!(find_by_tag(&snapshot.root(), "body"), vec![snapshot.root()]);
        assert!(find_by_tag(&tables[0], "dl").is_empty());
    }

    #[test]
    fn test_structural_path() {
        let snapshot = sample();
        let rows = find_by_tag(&snapshot.root(), "tr");
        assert_eq!(structural_path(&rows[1]), "body[0]>section[0]>table[0]>tr[1]");
    }

    #[test]
    fn test_next_element_sibling_and_ancestors() {
        let snapshot = sample();
        let h2 = find_by_tag(&snapshot.root(), "h2");
        let next = next_element_sibling(&h2[0]).unwrap();
        assert_eq!(next.tag(), "p");

        let cells = find_by_tag(&snapshot.root(), "td");
        assert!(has_ancestor(&cells[0], STRUCTURED_TAGS));
        assert!(!has_ancestor(&h2[0], STRUCTURED_TAGS));
    }
}
