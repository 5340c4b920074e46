use std::collections::HashMap;

use super::{Node, NodeKey, TreeError, TreeHandle, TreeNode};
use crate::api::{ForumPayload, GroupPayload};

/// Maximum group nesting accepted from the server.
///
/// Real hierarchies are a handful of levels deep. Anything deeper is treated
/// as corrupt data rather than recursed into.
pub const MAX_TREE_DEPTH: usize = 64;

/// Build a tree from a nested hierarchy payload.
///
/// Each group's children are its sub-groups followed by its forums, sorted
/// groups-first and then by case-insensitive title. The build is
/// all-or-nothing: any integrity problem discards everything built so far.
///
/// # Errors
///
/// Returns [`TreeError::Integrity`] if:
/// - the same group or forum id appears twice
/// - a node's stated parent (`parentId` / `groupId`) is not the group it is nested in
/// - groups nest deeper than [`MAX_TREE_DEPTH`]
pub fn build(root: &GroupPayload) -> Result<TreeHandle, TreeError> {
    let mut nodes = HashMap::with_capacity(root.entity_count());
    let root_key = add_group(&mut nodes, root, None, 0)?;

    tracing::debug!(root = %root_key, nodes = nodes.len(), "Built hierarchy tree");
    Ok(TreeHandle {
        root: root_key,
        nodes,
    })
}

fn add_group(
    nodes: &mut HashMap<NodeKey, TreeNode>,
    payload: &GroupPayload,
    parent: Option<NodeKey>,
    depth: usize,
) -> Result<NodeKey, TreeError> {
    if depth > MAX_TREE_DEPTH {
        return Err(TreeError::Integrity(format!(
            "groups nest deeper than {} levels",
            MAX_TREE_DEPTH
        )));
    }

    let key = NodeKey::group(payload.id);
    if let Some(parent) = parent {
        check_stated_parent(key, payload.parent_id, parent)?;
    }
    register(nodes, key, Node::from(payload), parent)?;

    let mut children = Vec::with_capacity(payload.sub_groups.len() + payload.forums.len());
    for sub_group in &payload.sub_groups {
        children.push(add_group(nodes, sub_group, Some(key), depth + 1)?);
    }
    for forum in &payload.forums {
        children.push(add_forum(nodes, forum, key)?);
    }

    TreeHandle::sort_siblings(nodes, &mut children);
    if let Some(entry) = nodes.get_mut(&key) {
        entry.children = children;
    }
    Ok(key)
}

fn add_forum(
    nodes: &mut HashMap<NodeKey, TreeNode>,
    payload: &ForumPayload,
    parent: NodeKey,
) -> Result<NodeKey, TreeError> {
    let key = NodeKey::forum(payload.id);
    check_stated_parent(key, payload.group_id, parent)?;
    register(nodes, key, Node::from(payload), Some(parent))?;
    Ok(key)
}

fn register(
    nodes: &mut HashMap<NodeKey, TreeNode>,
    key: NodeKey,
    node: Node,
    parent: Option<NodeKey>,
) -> Result<(), TreeError> {
    if nodes.contains_key(&key) {
        return Err(TreeError::Integrity(format!(
            "{} appears more than once",
            key
        )));
    }
    nodes.insert(key, TreeNode::new(node, parent));
    Ok(())
}

fn check_stated_parent(
    key: NodeKey,
    stated: Option<i64>,
    actual: NodeKey,
) -> Result<(), TreeError> {
    match stated {
        Some(stated) if stated != actual.id() => Err(TreeError::Integrity(format!(
            "{} claims parent group:{} but is nested under {}",
            key, stated, actual
        ))),
        _ => Ok(()),
    }
}
