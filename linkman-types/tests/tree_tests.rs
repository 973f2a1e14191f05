use linkman_types::{NativeNode, NodeArena, NodeId};

#[test]
fn new_arena_has_only_root() {
    let arena = NodeArena::new("Bookmarks");
    assert_eq!(arena.len(), 1);
    let root = arena.root().unwrap();
    assert_eq!(root.title, "Bookmarks");
    assert!(!root.is_leaf());
    assert!(root.parent_id.is_none());
}

#[test]
fn attach_appends_in_order() {
    let mut arena = NodeArena::new("root");
    let root = arena.root;
    let a = NativeNode::leaf(NodeId::new(), Some(root), "A", "http://a");
    let b = NativeNode::leaf(NodeId::new(), Some(root), "B", "http://b");
    let (a_id, b_id) = (a.id, b.id);
    assert!(arena.attach(a));
    assert!(arena.attach(b));
    assert_eq!(arena.root().unwrap().children, vec![a_id, b_id]);
}

#[test]
fn attach_rejects_leaf_parent() {
    let mut arena = NodeArena::new("root");
    let root = arena.root;
    let leaf = NativeNode::leaf(NodeId::new(), Some(root), "A", "http://a");
    let leaf_id = leaf.id;
    arena.attach(leaf);
    let child = NativeNode::leaf(NodeId::new(), Some(leaf_id), "B", "http://b");
    assert!(!arena.attach(child));
    assert_eq!(arena.len(), 2);
}

#[test]
fn attach_rejects_missing_parent() {
    let mut arena = NodeArena::new("root");
    let orphan = NativeNode::leaf(NodeId::new(), Some(NodeId::new()), "A", "http://a");
    assert!(!arena.attach(orphan));
}

#[test]
fn detach_unlinks_from_parent() {
    let mut arena = NodeArena::new("root");
    let root = arena.root;
    let leaf = NativeNode::leaf(NodeId::new(), Some(root), "A", "http://a");
    let id = leaf.id;
    arena.attach(leaf);

    let removed = arena.detach(&id).unwrap();
    assert_eq!(removed.url.as_deref(), Some("http://a"));
    assert!(arena.root().unwrap().children.is_empty());
    assert!(arena.get(&id).is_none());
    assert!(arena.detach(&id).is_none());
}
