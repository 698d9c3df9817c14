//! Iterative flattening of nested API responses.
//!
//! Several vendors expose hierarchical listings (folders containing jobs
//! containing more jobs). Flattening runs over an explicit worklist with a
//! visited set keyed by composed path, so malformed or self-referential
//! trees terminate instead of recursing without bound.

use std::collections::{HashSet, VecDeque};

/// Upper bound on visited nodes; trees larger than this are cut off.
const MAX_NODES: usize = 10_000;

/// Flatten a tree into `(path, node)` pairs in breadth-first order.
///
/// `roots` supplies the top-level `(name, node)` pairs; `children` lists the
/// named children of a node. Paths compose as `parent/child` and each path is
/// visited at most once.
pub fn flatten_tree<T>(
    roots: impl IntoIterator<Item = (String, T)>,
    children: impl Fn(&T) -> Vec<(String, T)>,
) -> Vec<(String, T)> {
    let mut worklist: VecDeque<(String, T)> = roots.into_iter().collect();
    let mut visited: HashSet<String> = HashSet::new();
    let mut flattened = Vec::new();

    while let Some((path, node)) = worklist.pop_front() {
        if visited.len() >= MAX_NODES {
            tracing::warn!(limit = MAX_NODES, "Tree traversal cut off at node limit");
            break;
        }
        if !visited.insert(path.clone()) {
            continue;
        }
        for (name, child) in children(&node) {
            worklist.push_back((format!("{path}/{name}"), child));
        }
        flattened.push((path, node));
    }
    flattened
}
