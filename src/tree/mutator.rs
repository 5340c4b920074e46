use super::{ExpansionState, Node, NodeKey, NodePatch, TreeError, TreeHandle, TreeNode};

/// A local change to the tree, already confirmed by the server.
///
/// Views never edit the tree directly; they describe the change and the
/// owner of the [`TreeHandle`] applies it with [`TreeHandle::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeChange {
    /// Add a freshly created, childless node under `parent`.
    Insert { parent: NodeKey, node: Node },
    /// Merge `patch` into the attributes of `key`.
    Update { key: NodeKey, patch: NodePatch },
    /// Drop `key` and everything below it.
    Remove { key: NodeKey },
}

impl TreeHandle {
    /// Apply a change, keeping `expansion` consistent with the new shape.
    ///
    /// Inserting expands the parent so the new node is visible; removing
    /// forgets the expansion state of every removed node.
    /// Returns the key of the node the change targeted.
    pub fn apply(
        &mut self,
        change: TreeChange,
        expansion: &mut ExpansionState,
    ) -> Result<NodeKey, TreeError> {
        match change {
            TreeChange::Insert { parent, node } => {
                let key = self.insert_child(parent, node)?;
                expansion.expand(parent);
                Ok(key)
            }
            TreeChange::Update { key, patch } => {
                self.update_node(key, patch)?;
                Ok(key)
            }
            TreeChange::Remove { key } => {
                self.remove_node(key)?;
                expansion.prune(self);
                Ok(key)
            }
        }
    }

    /// Insert a childless node under `parent` and restore sibling order.
    ///
    /// # Errors
    ///
    /// - [`TreeError::NotFound`] if `parent` is not in the tree
    /// - [`TreeError::Invariant`] if `parent` is a forum, or the node is already present
    pub fn insert_child(&mut self, parent: NodeKey, node: Node) -> Result<NodeKey, TreeError> {
        let key = node.key();
        let parent_entry = self.nodes.get(&parent).ok_or(TreeError::NotFound(parent))?;

        match parent_entry.node {
            Node::Group(_) => {}
            Node::Forum(_) => {
                return Err(TreeError::Invariant(format!(
                    "{} is a forum and cannot hold {}",
                    parent, key
                )))
            }
        }
        if self.nodes.contains_key(&key) {
            return Err(TreeError::Invariant(format!("{} is already in the tree", key)));
        }

        self.nodes.insert(key, TreeNode::new(node, Some(parent)));
        if let Some(entry) = self.nodes.get_mut(&parent) {
            entry.children.push(key);
        }
        self.resort_children(parent);

        tracing::debug!(parent = %parent, key = %key, "Inserted node");
        Ok(key)
    }

    /// Merge `patch` into the node at `key`.
    ///
    /// Identity, parent and children are never touched. When the title
    /// changes, the node's siblings are re-sorted.
    ///
    /// # Errors
    ///
    /// - [`TreeError::NotFound`] if `key` is not in the tree
    /// - [`TreeError::Invariant`] if the patch is for the other node kind
    /// - [`TreeError::Integrity`] if the patch names a different server id
    pub fn update_node(&mut self, key: NodeKey, patch: NodePatch) -> Result<(), TreeError> {
        let entry = self.nodes.get_mut(&key).ok_or(TreeError::NotFound(key))?;

        if let Some(id) = patch.id() {
            if id != key.id() {
                return Err(TreeError::Integrity(format!(
                    "update for {} came back with id {}",
                    key, id
                )));
            }
        }

        let title_changed = match (&mut entry.node, patch) {
            (Node::Group(group), NodePatch::Group(patch)) => group.apply_patch(patch),
            (Node::Forum(forum), NodePatch::Forum(patch)) => forum.apply_patch(patch),
            (_, patch) => {
                return Err(TreeError::Invariant(format!(
                    "cannot apply a {} patch to {}",
                    patch.kind(),
                    key
                )))
            }
        };

        let parent = entry.parent;
        if title_changed {
            if let Some(parent) = parent {
                self.resort_children(parent);
            }
        }

        tracing::debug!(key = %key, title_changed, "Updated node");
        Ok(())
    }

    /// Remove the node at `key` together with its subtree.
    ///
    /// Returns the removed node.
    ///
    /// # Errors
    ///
    /// - [`TreeError::Invariant`] if `key` is the root
    /// - [`TreeError::NotFound`] if `key` or its parent is not in the tree
    pub fn remove_node(&mut self, key: NodeKey) -> Result<Node, TreeError> {
        if key == self.root {
            return Err(TreeError::Invariant("the root group cannot be removed".to_string()));
        }

        let entry = self.nodes.get(&key).ok_or(TreeError::NotFound(key))?;
        let parent = entry.parent.ok_or(TreeError::NotFound(key))?;
        let parent_entry = self
            .nodes
            .get_mut(&parent)
            .ok_or(TreeError::NotFound(parent))?;
        parent_entry.children.retain(|child| *child != key);

        let mut removed = None;
        let mut count = 0usize;
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            if let Some(entry) = self.nodes.remove(&current) {
                count += 1;
                stack.extend(entry.children.iter().copied());
                if current == key {
                    removed = Some(entry.node);
                }
            }
        }

        tracing::debug!(key = %key, parent = %parent, removed = count, "Removed subtree");
        removed.ok_or(TreeError::NotFound(key))
    }
}
