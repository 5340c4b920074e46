use std::collections::HashMap;

use super::{NodeKey, NodeKind};
use crate::api::{ForumPatch, ForumPayload, ForumStats, GroupPatch, GroupPayload, Icon};

// ============================================================================
// Nodes
// ============================================================================

/// A container in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupNode {
    pub id: i64,
    pub title: String,
    pub icon: Option<Icon>,
    pub description: Option<String>,
}

/// A forum: a terminal item that never has children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForumNode {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub stats: ForumStats,
}

/// Tagged union of the two node shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Group(GroupNode),
    Forum(ForumNode),
}

impl Node {
    pub fn key(&self) -> NodeKey {
        match self {
            Node::Group(group) => NodeKey::group(group.id),
            Node::Forum(forum) => NodeKey::forum(forum.id),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Group(_) => NodeKind::Group,
            Node::Forum(_) => NodeKind::Forum,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Node::Group(group) => &group.title,
            Node::Forum(forum) => &forum.title,
        }
    }

    /// Sibling sort key: groups before forums, then case-insensitive title.
    pub(super) fn sort_key(&self) -> (u8, String) {
        let rank = match self {
            Node::Group(_) => 0,
            Node::Forum(_) => 1,
        };
        (rank, self.title().to_lowercase())
    }
}

/// Single-level projection: sub-groups and forums of the payload are not included.
impl From<&GroupPayload> for GroupNode {
    fn from(payload: &GroupPayload) -> Self {
        Self {
            id: payload.id,
            title: payload.title.clone(),
            icon: payload.icon.clone(),
            description: payload.description.clone(),
        }
    }
}

impl From<&ForumPayload> for ForumNode {
    fn from(payload: &ForumPayload) -> Self {
        Self {
            id: payload.id,
            title: payload.title.clone(),
            description: payload.description.clone(),
            stats: payload.stat.clone(),
        }
    }
}

impl From<&GroupPayload> for Node {
    fn from(payload: &GroupPayload) -> Self {
        Node::Group(GroupNode::from(payload))
    }
}

impl From<&ForumPayload> for Node {
    fn from(payload: &ForumPayload) -> Self {
        Node::Forum(ForumNode::from(payload))
    }
}

// ============================================================================
// Patches
// ============================================================================

/// Partial update of a node's attributes, tagged with the node kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodePatch {
    Group(GroupPatch),
    Forum(ForumPatch),
}

impl NodePatch {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodePatch::Group(_) => NodeKind::Group,
            NodePatch::Forum(_) => NodeKind::Forum,
        }
    }

    /// Server id echoed in the patch, if any.
    pub fn id(&self) -> Option<i64> {
        match self {
            NodePatch::Group(patch) => patch.id,
            NodePatch::Forum(patch) => patch.id,
        }
    }
}

impl GroupNode {
    /// Merge a patch. Returns true if the title changed.
    pub(super) fn apply_patch(&mut self, patch: GroupPatch) -> bool {
        let title_changed = replace_title(&mut self.title, patch.title);
        patch.icon.apply_to(&mut self.icon);
        patch.description.apply_to(&mut self.description);
        title_changed
    }
}

impl ForumNode {
    /// Merge a patch. Returns true if the title changed.
    pub(super) fn apply_patch(&mut self, patch: ForumPatch) -> bool {
        let title_changed = replace_title(&mut self.title, patch.title);
        patch.description.apply_to(&mut self.description);
        if let Some(stats) = patch.stat {
            self.stats = stats;
        }
        title_changed
    }
}

fn replace_title(current: &mut String, new: Option<String>) -> bool {
    match new {
        Some(title) if title != *current => {
            *current = title;
            true
        }
        _ => false,
    }
}

// ============================================================================
// Tree Handle
// ============================================================================

/// A node plus its position in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub(super) node: Node,
    pub(super) parent: Option<NodeKey>,
    pub(super) children: Vec<NodeKey>,
}

impl TreeNode {
    pub(super) fn new(node: Node, parent: Option<NodeKey>) -> Self {
        Self {
            node,
            parent,
            children: Vec::new(),
        }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    /// Children in display order.
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    /// True when the node has no children. Derived, so it cannot go stale.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// The in-memory mirror of the server hierarchy.
///
/// The identity index doubles as node storage: every reachable node has
/// exactly one entry, keyed by [`NodeKey`], and nothing else is stored.
/// Only [`build`](super::build) and the mutation methods in this module
/// touch the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeHandle {
    pub(super) root: NodeKey,
    pub(super) nodes: HashMap<NodeKey, TreeNode>,
}

impl TreeHandle {
    pub fn root(&self) -> NodeKey {
        self.root
    }

    pub fn get(&self, key: NodeKey) -> Option<&TreeNode> {
        self.nodes.get(&key)
    }

    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(&key).map(TreeNode::node)
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(&key)
    }

    /// Number of nodes in the tree, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.nodes.keys().copied()
    }

    /// Distance from the root (root = 0), or `None` for unknown keys.
    pub fn depth_of(&self, key: NodeKey) -> Option<usize> {
        let mut depth = 0;
        let mut current = self.nodes.get(&key)?;
        while let Some(parent) = current.parent {
            current = self.nodes.get(&parent)?;
            depth += 1;
            // A parent chain longer than the map means the links are corrupt.
            if depth > self.nodes.len() {
                return None;
            }
        }
        Some(depth)
    }

    /// Sort `keys` in sibling order. Unknown keys sort first.
    pub(super) fn sort_siblings(nodes: &HashMap<NodeKey, TreeNode>, keys: &mut [NodeKey]) {
        // sort_by_cached_key is stable, so equal titles keep their relative order
        keys.sort_by_cached_key(|key| nodes.get(key).map(|entry| entry.node.sort_key()));
    }

    /// Re-establish sibling order under `parent`.
    pub(super) fn resort_children(&mut self, parent: NodeKey) {
        let Some(mut children) = self
            .nodes
            .get_mut(&parent)
            .map(|entry| std::mem::take(&mut entry.children))
        else {
            return;
        };
        Self::sort_siblings(&self.nodes, &mut children);
        if let Some(entry) = self.nodes.get_mut(&parent) {
            entry.children = children;
        }
    }
}
