//! The local bookmark tree as an id-indexed arena.
//!
//! Folders hold an ordered list of child ids; leaves hold a URL. The arena
//! is a read snapshot: the local store owns the real nodes and hands out
//! copies through `get_tree`.

use crate::ids::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A node of the local tree: a leaf (URL, no children) or a folder
/// (children, no URL).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeNode {
    pub id: NodeId,
    pub parent_id: Option<NodeId>,
    pub title: String,
    pub url: Option<String>,
    /// Child ids in the store's native order. Always empty for leaves.
    #[serde(default)]
    pub children: Vec<NodeId>,
}

impl NativeNode {
    /// Creates a folder node.
    pub fn folder(id: NodeId, parent_id: Option<NodeId>, title: impl Into<String>) -> Self {
        Self {
            id,
            parent_id,
            title: title.into(),
            url: None,
            children: Vec::new(),
        }
    }

    /// Creates a leaf node.
    pub fn leaf(
        id: NodeId,
        parent_id: Option<NodeId>,
        title: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id,
            parent_id,
            title: title.into(),
            url: Some(url.into()),
            children: Vec::new(),
        }
    }

    /// Returns true for bookmark leaves.
    pub fn is_leaf(&self) -> bool {
        self.url.is_some()
    }
}

/// A full snapshot of the local tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeArena {
    pub root: NodeId,
    pub nodes: HashMap<NodeId, NativeNode>,
}

impl NodeArena {
    /// Creates an arena holding only an empty root folder.
    pub fn new(root_title: impl Into<String>) -> Self {
        let root_id = NodeId::new();
        let mut nodes = HashMap::new();
        nodes.insert(root_id, NativeNode::folder(root_id, None, root_title));
        Self {
            root: root_id,
            nodes,
        }
    }

    /// Looks up a node by id.
    pub fn get(&self, id: &NodeId) -> Option<&NativeNode> {
        self.nodes.get(id)
    }

    /// Returns the root folder.
    pub fn root(&self) -> Option<&NativeNode> {
        self.nodes.get(&self.root)
    }

    /// Inserts `node` and appends it to its parent's children.
    /// Returns false (and inserts nothing) if the parent is missing or is a leaf.
    pub fn attach(&mut self, node: NativeNode) -> bool {
        let Some(parent_id) = node.parent_id else {
            return false;
        };
        match self.nodes.get_mut(&parent_id) {
            Some(parent) if !parent.is_leaf() => parent.children.push(node.id),
            _ => return false,
        }
        self.nodes.insert(node.id, node);
        true
    }

    /// Removes a node and unlinks it from its parent. Returns the removed node.
    pub fn detach(&mut self, id: &NodeId) -> Option<NativeNode> {
        let node = self.nodes.remove(id)?;
        if let Some(parent) = node.parent_id.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|child| child != id);
        }
        Some(node)
    }

    /// Number of nodes, folders included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
