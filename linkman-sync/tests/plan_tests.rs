use linkman_sync::{plan_mirror, plan_pull, plan_push};
use linkman_types::{BookmarkRecord, FlatBookmark, NodeId};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::HashSet;

fn local(urls: &[&str]) -> Vec<FlatBookmark> {
    urls.iter()
        .map(|url| FlatBookmark {
            id: NodeId::new(),
            url: (*url).to_string(),
            title: String::new(),
        })
        .collect()
}

fn remote(urls: &[&str]) -> Vec<BookmarkRecord> {
    urls.iter().map(|url| BookmarkRecord::new(*url)).collect()
}

fn created(records: &[BookmarkRecord]) -> Vec<&str> {
    records.iter().map(|r| r.url.as_str()).collect()
}

fn deleted(leaves: &[FlatBookmark]) -> Vec<&str> {
    leaves.iter().map(|l| l.url.as_str()).collect()
}

// ── Push ────────────────────────────────────────────────────────

#[test]
fn push_sends_every_leaf() {
    let leaves = local(&["http://a", "http://b", "http://a"]);
    let plan = plan_push(&leaves);
    assert_eq!(plan.to_create_remotely, leaves);
    assert!(plan.to_create_locally.is_empty());
    assert!(plan.to_delete_locally.is_empty());
}

#[test]
fn push_of_empty_tree_is_empty() {
    assert!(plan_push(&[]).is_empty());
}

// ── Pull ────────────────────────────────────────────────────────

#[test]
fn pull_creates_only_missing() {
    let plan = plan_pull(&local(&["http://a"]), &remote(&["http://a", "http://b"]));
    assert_eq!(created(&plan.to_create_locally), vec!["http://b"]);
    assert!(plan.to_delete_locally.is_empty());
}

#[test]
fn pull_dedupes_remote_urls() {
    let plan = plan_pull(&[], &remote(&["http://b", "http://b", "http://c"]));
    assert_eq!(created(&plan.to_create_locally), vec!["http://b", "http://c"]);
}

#[test]
fn pull_compares_urls_exactly() {
    let plan = plan_pull(&local(&["http://A"]), &remote(&["http://a", "http://A/"]));
    assert_eq!(created(&plan.to_create_locally), vec!["http://a", "http://A/"]);
}

// ── Mirror ──────────────────────────────────────────────────────

#[test]
fn mirror_creates_remote_only_and_deletes_local_only() {
    let plan = plan_mirror(&local(&["http://y", "http://z"]), &remote(&["http://x", "http://y"]));
    assert_eq!(created(&plan.to_create_locally), vec!["http://x"]);
    assert_eq!(deleted(&plan.to_delete_locally), vec!["http://z"]);
    assert!(plan.to_create_remotely.is_empty());
}

#[test]
fn mirror_with_empty_remote_deletes_everything() {
    let leaves = local(&["http://a", "http://b"]);
    let plan = plan_mirror(&leaves, &[]);
    assert_eq!(plan.to_delete_locally, leaves);
    assert!(plan.to_create_locally.is_empty());
}

#[test]
fn mirror_deletes_every_duplicate_of_a_local_only_url() {
    let plan = plan_mirror(&local(&["http://z", "http://z"]), &remote(&["http://x"]));
    assert_eq!(deleted(&plan.to_delete_locally), vec!["http://z", "http://z"]);
}

#[test]
fn mirror_of_equal_sets_is_empty() {
    let plan = plan_mirror(&local(&["http://a", "http://b"]), &remote(&["http://b", "http://a"]));
    assert!(plan.is_empty());
}

// ── Properties ──────────────────────────────────────────────────

fn url_set() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("http://[a-e]{1,2}", 0..12)
}

proptest! {
    #[test]
    fn mirror_plan_is_disjoint_and_converges(local_urls in url_set(), remote_urls in url_set()) {
        let leaves = local(&local_urls.iter().map(String::as_str).collect::<Vec<_>>());
        let records = remote(&remote_urls.iter().map(String::as_str).collect::<Vec<_>>());
        let plan = plan_mirror(&leaves, &records);

        let creates: HashSet<&str> = created(&plan.to_create_locally).into_iter().collect();
        let deletes: HashSet<&str> = deleted(&plan.to_delete_locally).into_iter().collect();
        prop_assert!(creates.is_disjoint(&deletes));
        prop_assert_eq!(creates.len(), plan.to_create_locally.len());

        // Applying the plan yields exactly the remote URL set.
        let mut after: HashSet<&str> = local_urls.iter().map(String::as_str).collect();
        after.retain(|u| !deletes.contains(u));
        after.extend(creates.iter().copied());
        let expected: HashSet<&str> = remote_urls.iter().map(String::as_str).collect();
        prop_assert_eq!(after, expected);
    }

    #[test]
    fn pull_never_deletes(local_urls in url_set(), remote_urls in url_set()) {
        let leaves = local(&local_urls.iter().map(String::as_str).collect::<Vec<_>>());
        let records = remote(&remote_urls.iter().map(String::as_str).collect::<Vec<_>>());
        let plan = plan_pull(&leaves, &records);
        prop_assert!(plan.to_delete_locally.is_empty());
        let local_set: HashSet<&str> = local_urls.iter().map(String::as_str).collect();
        prop_assert!(plan.to_create_locally.iter().all(|r| !local_set.contains(r.url.as_str())));
    }
}
