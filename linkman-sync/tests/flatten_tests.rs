use linkman_sync::flatten;
use linkman_types::{NativeNode, NodeArena, NodeId};
use pretty_assertions::assert_eq;

fn leaf(arena: &mut NodeArena, parent: NodeId, title: &str, url: &str) -> NodeId {
    let id = NodeId::new();
    assert!(arena.attach(NativeNode::leaf(id, Some(parent), title, url)));
    id
}

fn folder(arena: &mut NodeArena, parent: NodeId, title: &str) -> NodeId {
    let id = NodeId::new();
    assert!(arena.attach(NativeNode::folder(id, Some(parent), title)));
    id
}

fn urls(arena: &NodeArena) -> Vec<String> {
    flatten(arena).into_iter().map(|b| b.url).collect()
}

#[test]
fn empty_root_yields_nothing() {
    let arena = NodeArena::new("Bookmarks");
    assert!(flatten(&arena).is_empty());
}

#[test]
fn nested_folders_in_preorder() {
    let mut arena = NodeArena::new("Bookmarks");
    let root = arena.root;
    let a = folder(&mut arena, root, "A");
    leaf(&mut arena, a, "one", "http://1");
    let b = folder(&mut arena, a, "B");
    leaf(&mut arena, b, "two", "http://2");
    leaf(&mut arena, root, "three", "http://3");

    assert_eq!(urls(&arena), vec!["http://1", "http://2", "http://3"]);
}

#[test]
fn folders_are_never_emitted() {
    let mut arena = NodeArena::new("Bookmarks");
    let root = arena.root;
    let empty = folder(&mut arena, root, "Empty");
    folder(&mut arena, empty, "Also empty");

    assert!(flatten(&arena).is_empty());
}

#[test]
fn flat_bookmark_carries_id_and_title() {
    let mut arena = NodeArena::new("Bookmarks");
    let root = arena.root;
    let id = leaf(&mut arena, root, "Rust", "https://rust-lang.org");

    let flat = flatten(&arena);
    assert_eq!(flat.len(), 1);
    assert_eq!(flat[0].id, id);
    assert_eq!(flat[0].title, "Rust");
    assert_eq!(flat[0].url, "https://rust-lang.org");
}

#[test]
fn duplicate_urls_are_kept() {
    let mut arena = NodeArena::new("Bookmarks");
    let root = arena.root;
    let f = folder(&mut arena, root, "Dupes");
    leaf(&mut arena, root, "first", "http://same");
    leaf(&mut arena, f, "second", "http://same");

    assert_eq!(urls(&arena), vec!["http://same", "http://same"]);
}

#[test]
fn dangling_child_ids_are_skipped() {
    let mut arena = NodeArena::new("Bookmarks");
    let root = arena.root;
    leaf(&mut arena, root, "kept", "http://kept");
    arena
        .nodes
        .get_mut(&root)
        .unwrap()
        .children
        .push(NodeId::new());

    assert_eq!(urls(&arena), vec!["http://kept"]);
}

#[test]
fn node_linked_twice_is_visited_once() {
    let mut arena = NodeArena::new("Bookmarks");
    let root = arena.root;
    let f = folder(&mut arena, root, "F");
    let id = leaf(&mut arena, f, "x", "http://x");
    arena.nodes.get_mut(&root).unwrap().children.push(id);

    assert_eq!(urls(&arena), vec!["http://x"]);
}

#[test]
fn deep_nesting_does_not_overflow() {
    let mut arena = NodeArena::new("Bookmarks");
    let mut parent = arena.root;
    for depth in 0..50_000 {
        parent = folder(&mut arena, parent, &format!("level {depth}"));
    }
    leaf(&mut arena, parent, "bottom", "http://deep");

    assert_eq!(urls(&arena), vec!["http://deep"]);
}
