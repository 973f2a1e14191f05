//! Local bookmark tree stores.
//!
//! The engine only ever reads a full snapshot, creates leaves, and removes
//! leaves. Folders belong to the store and are never touched.

mod memory;
mod sqlite;

pub use memory::MemoryBookmarkTree;
pub use sqlite::SqliteBookmarkTree;

use crate::error::SyncResult;
use async_trait::async_trait;
use linkman_types::{NativeNode, NodeArena, NodeId};

/// Abstract local bookmark store.
#[async_trait]
pub trait BookmarkTree: Send + Sync {
    /// Returns a snapshot of the whole tree.
    async fn get_tree(&self) -> SyncResult<NodeArena>;

    /// Creates a leaf at the end of the default folder and returns it.
    async fn create(&self, title: &str, url: &str) -> SyncResult<NativeNode>;

    /// Removes a leaf. Removing a folder or an unknown id is an error.
    async fn remove(&self, id: &NodeId) -> SyncResult<()>;
}
