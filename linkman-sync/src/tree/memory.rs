//! In-memory tree store.

use super::BookmarkTree;
use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use linkman_types::{NativeNode, NodeArena, NodeId};
use tokio::sync::RwLock;

/// A tree held in memory. New leaves from [`BookmarkTree::create`] are
/// appended to the root folder.
#[derive(Debug)]
pub struct MemoryBookmarkTree {
    arena: RwLock<NodeArena>,
}

impl MemoryBookmarkTree {
    /// Creates a store with an empty root folder.
    pub fn new() -> Self {
        Self::from_arena(NodeArena::new("Bookmarks"))
    }

    /// Wraps an existing arena.
    pub fn from_arena(arena: NodeArena) -> Self {
        Self {
            arena: RwLock::new(arena),
        }
    }

    /// Returns the root folder id.
    pub async fn root_id(&self) -> NodeId {
        self.arena.read().await.root
    }

    /// Adds a folder under `parent`.
    pub async fn add_folder(&self, parent: NodeId, title: &str) -> SyncResult<NodeId> {
        let node = NativeNode::folder(NodeId::new(), Some(parent), title);
        self.attach(node).await
    }

    /// Adds a leaf under `parent`.
    pub async fn add_leaf(&self, parent: NodeId, title: &str, url: &str) -> SyncResult<NodeId> {
        let node = NativeNode::leaf(NodeId::new(), Some(parent), title, url);
        self.attach(node).await
    }

    async fn attach(&self, node: NativeNode) -> SyncResult<NodeId> {
        let id = node.id;
        let parent = node.parent_id;
        if !self.arena.write().await.attach(node) {
            return Err(SyncError::Storage(format!(
                "parent {parent:?} is missing or not a folder"
            )));
        }
        Ok(id)
    }
}

impl Default for MemoryBookmarkTree {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookmarkTree for MemoryBookmarkTree {
    async fn get_tree(&self) -> SyncResult<NodeArena> {
        Ok(self.arena.read().await.clone())
    }

    async fn create(&self, title: &str, url: &str) -> SyncResult<NativeNode> {
        let mut arena = self.arena.write().await;
        let node = NativeNode::leaf(NodeId::new(), Some(arena.root), title, url);
        if !arena.attach(node.clone()) {
            return Err(SyncError::Storage("root folder is missing".to_string()));
        }
        Ok(node)
    }

    async fn remove(&self, id: &NodeId) -> SyncResult<()> {
        let mut arena = self.arena.write().await;
        match arena.get(id) {
            None => Err(SyncError::Storage(format!("node not found: {id}"))),
            Some(node) if !node.is_leaf() => {
                Err(SyncError::Storage(format!("refusing to remove folder {id}")))
            }
            Some(_) => {
                arena.detach(id);
                Ok(())
            }
        }
    }
}
