//! Tree flattening.
//!
//! Projects the leaves of a [`NodeArena`] into a flat list, walking the
//! tree depth-first in pre-order with an explicit stack so deep folder
//! nesting cannot exhaust the call stack.

use linkman_types::{FlatBookmark, NodeArena};
use std::collections::HashSet;

/// Returns every leaf of `tree` in depth-first pre-order, children visited
/// in the store's native order. Folders are walked but never emitted.
/// Child ids missing from the arena are skipped, and a node reachable twice
/// is only visited once.
pub fn flatten(tree: &NodeArena) -> Vec<FlatBookmark> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut stack = vec![tree.root];

    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        let Some(node) = tree.get(&id) else {
            continue;
        };
        if let Some(url) = &node.url {
            out.push(FlatBookmark {
                id: node.id,
                url: url.clone(),
                title: node.title.clone(),
            });
        }
        // Reversed so the first child is popped first.
        stack.extend(node.children.iter().rev().copied());
    }

    out
}
