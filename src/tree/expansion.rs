use std::collections::HashSet;

use super::{NodeKey, TreeHandle};

/// Which nodes are expanded in the view.
///
/// Purely presentational: never sent to the server, and independent of the
/// tree data so it survives a full rebuild. Unknown keys read as collapsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionState {
    expanded: HashSet<NodeKey>,
}

impl ExpansionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expand(&mut self, key: NodeKey) {
        self.expanded.insert(key);
    }

    pub fn collapse(&mut self, key: NodeKey) {
        self.expanded.remove(&key);
    }

    /// Flip the state of `key`. Returns true if it is now expanded.
    pub fn toggle(&mut self, key: NodeKey) -> bool {
        if self.expanded.remove(&key) {
            false
        } else {
            self.expanded.insert(key);
            true
        }
    }

    pub fn is_expanded(&self, key: NodeKey) -> bool {
        self.expanded.contains(&key)
    }

    /// Expand every node whose depth is at most `max_depth` (root = 0).
    ///
    /// Nodes deeper than `max_depth` keep whatever state they had.
    pub fn expand_from_root(&mut self, tree: &TreeHandle, max_depth: usize) {
        let mut stack = vec![(tree.root(), 0usize)];
        while let Some((key, depth)) = stack.pop() {
            let Some(entry) = tree.get(key) else {
                continue;
            };
            self.expanded.insert(key);
            if depth < max_depth {
                stack.extend(entry.children().iter().map(|child| (*child, depth + 1)));
            }
        }
    }

    /// Forget keys that are no longer in `tree`.
    pub fn prune(&mut self, tree: &TreeHandle) {
        self.expanded.retain(|key| tree.contains(*key));
    }

    /// Number of expanded nodes.
    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }
}
