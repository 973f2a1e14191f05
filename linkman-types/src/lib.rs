//! Core type definitions for Linkman.
//!
//! This crate defines the plain data shared by the sync engine and the CLI:
//! - Node and bookmark identifiers (UUID)
//! - The local bookmark tree as an id-indexed arena
//! - Remote bookmark records and their flattened local projection
//! - The settings snapshot and partial updates to it
//!
//! Nothing here performs I/O.

mod bookmark;
mod ids;
mod settings;
mod tree;

pub use bookmark::{BookmarkRecord, FlatBookmark, NewBookmark, normalize_tags};
pub use ids::{BookmarkId, NodeId};
pub use settings::{ExtraHeader, SettingKey, Settings, SettingsPatch};
pub use tree::{NativeNode, NodeArena};

/// Errors from parsing user-supplied values.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid header: {0}")]
    InvalidHeader(String),
}
