//! Arena-backed synthetic document tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::DocumentNode;
use crate::error::{Result, ScopeError};

/// Nested node description, used both as a builder and as the JSON wire shape
/// handed over by the page adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub tag: String,

    /// Text placed before the node's children.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SnapshotNode>,
}

impl SnapshotNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Element holding only text.
    pub fn with_text(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn child(mut self, child: SnapshotNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = SnapshotNode>) -> Self {
        self.children.extend(children);
        self
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    tag: String,
    text: Option<String>,
    attrs: BTreeMap<String, String>,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// An immutable document snapshot.
#[derive(Debug, Clone)]
pub struct Snapshot {
    nodes: Vec<NodeData>,
}

impl Snapshot {
    /// Flatten a nested node tree into an arena.
    pub fn from_tree(root: SnapshotNode) -> Self {
        let mut nodes = Vec::new();
        let mut stack = vec![(root, None::<usize>)];

        while let Some((node, parent)) = stack.pop() {
            let id = nodes.len();
            nodes.push(NodeData {
                tag: node.tag.trim().to_lowercase(),
                text: node.text,
                attrs: node.attrs,
                parent,
                children: Vec::new(),
            });
            if let Some(p) = parent {
                nodes[p].children.push(id);
            }
            // Reversed so children pop, and get their ids, in document order.
            for child in node.children.into_iter().rev() {
                stack.push((child, Some(id)));
            }
        }

        Self { nodes }
    }

    /// Decode a snapshot from its JSON node form.
    pub fn from_json(json: &str) -> Result<Self> {
        let root: SnapshotNode = serde_json::from_str(json)?;
        validate(&root)?;
        Ok(Self::from_tree(root))
    }

    pub fn root(&self) -> NodeRef<'_> {
        NodeRef {
            snapshot: self,
            id: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree carries no text anywhere. Element-only trees, such
    /// as a `body` holding empty `div`s, count as empty.
    pub fn is_empty(&self) -> bool {
        self.nodes
            .iter()
            .all(|n| n.text.as_deref().is_none_or(|t| t.trim().is_empty()))
    }
}

fn validate(node: &SnapshotNode) -> Result<()> {
    if node.tag.trim().is_empty() {
        return Err(ScopeError::Snapshot("node with empty tag".to_string()));
    }
    node.children.iter().try_for_each(validate)
}

/// Handle to one node of a [`Snapshot`].
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    snapshot: &'a Snapshot,
    id: usize,
}

impl<'a> NodeRef<'a> {
    fn data(&self) -> &'a NodeData {
        &self.snapshot.nodes[self.id]
    }

    fn at(&self, id: usize) -> NodeRef<'a> {
        NodeRef {
            snapshot: self.snapshot,
            id,
        }
    }

    fn collect_text(&self, out: &mut Vec<&'a str>) {
        let data = self.data();
        if let Some(text) = data.text.as_deref() {
            let text = text.trim();
            if !text.is_empty() {
                out.push(text);
            }
        }
        for &child in &data.children {
            self.at(child).collect_text(out);
        }
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.snapshot, other.snapshot) && self.id == other.id
    }
}

impl DocumentNode for NodeRef<'_> {
    fn tag(&self) -> &str {
        &self.data().tag
    }

    fn text(&self) -> String {
        let mut parts = Vec::new();
        self.collect_text(&mut parts);
        parts.join(" ")
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.data().attrs.get(name).cloned()
    }

    fn children(&self) -> Vec<Self> {
        self.data().children.iter().map(|&id| self.at(id)).collect()
    }

    fn previous_sibling(&self) -> Option<Self> {
        let parent = self.data().parent?;
        let siblings = &self.snapshot.nodes[parent].children;
        let pos = siblings.iter().position(|&id| id == self.id)?;
        pos.checked_sub(1).map(|p| self.at(siblings[p]))
    }

    fn parent(&self) -> Option<Self> {
        self.data().parent.map(|id| self.at(id))
    }
}
