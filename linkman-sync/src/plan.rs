//! Reconciliation planning.
//!
//! Each policy is a pure function from the flattened local leaves and the
//! remote records to a [`ReconciliationPlan`]. URLs are compared exactly
//! (case-sensitive, no normalisation).

use linkman_types::{BookmarkRecord, FlatBookmark};
use std::collections::HashSet;

/// Tags attached to every bookmark pushed by an import.
pub const IMPORT_TAGS: [&str; 1] = ["imported"];

/// What a policy intends to change. Computed fresh for every run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    /// Remote records to add to the local tree. No URL appears twice.
    pub to_create_locally: Vec<BookmarkRecord>,
    /// Local leaves to remove. Never shares a URL with `to_create_locally`.
    pub to_delete_locally: Vec<FlatBookmark>,
    /// Local leaves to upsert remotely.
    pub to_create_remotely: Vec<FlatBookmark>,
}

impl ReconciliationPlan {
    /// Returns true if applying the plan would change nothing.
    pub fn is_empty(&self) -> bool {
        self.to_create_locally.is_empty()
            && self.to_delete_locally.is_empty()
            && self.to_create_remotely.is_empty()
    }
}

/// Push: every local leaf is upserted remotely. Nothing is deleted.
pub fn plan_push(local: &[FlatBookmark]) -> ReconciliationPlan {
    ReconciliationPlan {
        to_create_remotely: local.to_vec(),
        ..Default::default()
    }
}

/// Pull-merge: remote records whose URL is not present locally.
pub fn plan_pull(local: &[FlatBookmark], remote: &[BookmarkRecord]) -> ReconciliationPlan {
    let local_urls: HashSet<&str> = local.iter().map(|b| b.url.as_str()).collect();
    ReconciliationPlan {
        to_create_locally: missing_locally(&local_urls, remote),
        ..Default::default()
    }
}

/// Mirror: create what only the remote has, delete what only the local
/// tree has. Leaves present on both sides are left alone.
pub fn plan_mirror(local: &[FlatBookmark], remote: &[BookmarkRecord]) -> ReconciliationPlan {
    let local_urls: HashSet<&str> = local.iter().map(|b| b.url.as_str()).collect();
    let remote_urls: HashSet<&str> = remote.iter().map(|r| r.url.as_str()).collect();

    let to_delete_locally = local
        .iter()
        .filter(|leaf| !remote_urls.contains(leaf.url.as_str()))
        .cloned()
        .collect();

    ReconciliationPlan {
        to_create_locally: missing_locally(&local_urls, remote),
        to_delete_locally,
        to_create_remotely: Vec::new(),
    }
}

fn missing_locally(local_urls: &HashSet<&str>, remote: &[BookmarkRecord]) -> Vec<BookmarkRecord> {
    let mut planned = HashSet::new();
    remote
        .iter()
        .filter(|r| !local_urls.contains(r.url.as_str()) && planned.insert(r.url.as_str()))
        .cloned()
        .collect()
}
