//! Arena-backed document tree for structured page output.
//!
//! Nodes live in one `Vec` and refer to each other by [`NodeId`]. Every node
//! has at most one parent; re-parenting goes through [`Document::move_node`],
//! which detaches and attaches in a single step so a node can never be listed
//! under two parents. Detached nodes stay in the arena but are unreachable
//! from the root.

use crate::error::{LayoutError, Result};
use crate::layout::types::{MergedRegion, TextFragment};
use crate::utils::{Rect, bbox_union};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    /// A merged region not yet classified.
    Region,
    Table,
    TitleBlock,
    Cell,
    Row,
    Column,
    Header,
    Text,
}

impl NodeKind {
    /// XML element name.
    pub const fn tag(self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Region => "rectangle",
            NodeKind::Table => "table",
            NodeKind::TitleBlock => "titleblock",
            NodeKind::Cell => "cell",
            NodeKind::Row => "row",
            NodeKind::Column => "column",
            NodeKind::Header => "header",
            NodeKind::Text => "text",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub bbox: Option<Rect>,
    pub id: Option<String>,
    pub text: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(kind: NodeKind, bbox: Option<Rect>, text: Option<String>) -> Self {
        Self {
            kind,
            bbox,
            id: None,
            text,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Document, None, None)],
            root: NodeId(0),
        }
    }

    /// One `Region` per merged region, each holding its texts.
    pub fn from_regions(regions: &[MergedRegion]) -> Self {
        let mut doc = Self::new();
        let root = doc.root();
        for region in regions {
            let node = doc.append(root, NodeKind::Region, Some(region.bbox), None);
            for text in &region.texts {
                doc.append_text(node, text);
            }
        }
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Nodes ever created, the root and detached nodes included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// True when anything is attached under the root.
    pub fn has_content(&self) -> bool {
        !self.children(self.root).is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Creates a detached node.
    pub fn create(&mut self, kind: NodeKind, bbox: Option<Rect>, text: Option<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(kind, bbox, text));
        id
    }

    /// Creates a node as the last child of `parent`.
    pub fn append(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        bbox: Option<Rect>,
        text: Option<String>,
    ) -> NodeId {
        let id = self.create(kind, bbox, text);
        self.nodes[id.0].parent = Some(parent);
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn append_text(&mut self, parent: NodeId, text: &TextFragment) -> NodeId {
        self.append(
            parent,
            NodeKind::Text,
            Some(text.bbox),
            Some(text.text.clone()),
        )
    }

    /// Removes a node from its parent's child list.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    /// Re-parents `id` as the last child of `new_parent`.
    pub fn move_node(&mut self, id: NodeId, new_parent: NodeId) -> Result<()> {
        self.insert_node(id, new_parent, None)
    }

    /// Re-parents `id` at `index` among `new_parent`'s children (clamped).
    pub fn move_node_at(&mut self, id: NodeId, new_parent: NodeId, index: usize) -> Result<()> {
        self.insert_node(id, new_parent, Some(index))
    }

    fn insert_node(&mut self, id: NodeId, new_parent: NodeId, index: Option<usize>) -> Result<()> {
        if id == self.root {
            return Err(LayoutError::InvalidDocument(
                "cannot move the document root".to_string(),
            ));
        }
        if self.is_ancestor_or_self(id, new_parent) {
            return Err(LayoutError::InvalidDocument(format!(
                "cannot move node {} under its own subtree",
                id.0
            )));
        }
        self.detach(id);
        self.nodes[id.0].parent = Some(new_parent);
        let children = &mut self.nodes[new_parent.0].children;
        match index {
            Some(i) => children.insert(i.min(children.len()), id),
            None => children.push(id),
        }
        Ok(())
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes[node.0].parent {
                Some(p) => node = p,
                None => return false,
            }
        }
    }

    /// True if the node is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.is_ancestor_or_self(self.root, id)
    }

    pub fn children_of_kind(&self, id: NodeId, kind: NodeKind) -> Vec<NodeId> {
        self.nodes[id.0]
            .children
            .iter()
            .copied()
            .filter(|&c| self.nodes[c.0].kind == kind)
            .collect()
    }

    /// Attached descendants of `id` with the given kind, in document order.
    pub fn descendants_of_kind(&self, id: NodeId, kind: NodeKind) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[id.0].children.iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            let node = &self.nodes[n.0];
            if node.kind == kind {
                out.push(n);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Text content of a node, empty when absent.
    pub fn text_of(&self, id: NodeId) -> &str {
        self.nodes[id.0].text.as_deref().unwrap_or("")
    }

    /// Union of the bboxes of the given nodes.
    pub fn union_bbox(&self, ids: &[NodeId]) -> Option<Rect> {
        bbox_union(ids.iter().filter_map(|&id| self.nodes[id.0].bbox))
    }
}
