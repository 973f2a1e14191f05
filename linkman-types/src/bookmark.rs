//! Bookmark records on both sides of the sync.

use crate::ids::{BookmarkId, NodeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bookmark as stored by the remote service.
///
/// Identity is the URL, compared case-sensitively. The service owns tags
/// and the creation time; the local tree only ever sees title and URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkRecord {
    /// Service-assigned id. Absent in payloads that were never stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BookmarkId>,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl BookmarkRecord {
    /// Creates a record with only a URL, as the remote would before tagging.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: None,
            url: url.into(),
            title: None,
            tags: Vec::new(),
            created_at: None,
        }
    }

    /// Title to use for a local leaf: the remote title, or the URL when the
    /// remote title is missing or blank.
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title,
            _ => &self.url,
        }
    }
}

/// Body of `POST /bookmarks`: create or replace the bookmark with this URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBookmark {
    pub url: String,
    pub title: Option<String>,
    pub tags: Vec<String>,
}

impl NewBookmark {
    /// Creates an upsert body. Tags are lowercased and deduplicated.
    pub fn new<I, S>(url: impl Into<String>, title: Option<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            url: url.into(),
            title,
            tags: normalize_tags(tags),
        }
    }
}

/// A leaf of the local tree, flattened out of its folder structure.
///
/// Recomputed on every reconciliation pass and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatBookmark {
    /// The local node this entry was projected from.
    pub id: NodeId,
    pub url: String,
    pub title: String,
}

/// Lowercases, trims and deduplicates tags, keeping first-seen order.
/// Empty tags are dropped.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim().to_lowercase();
        if tag.is_empty() || out.contains(&tag) {
            continue;
        }
        out.push(tag);
    }
    out
}
