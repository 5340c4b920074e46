use super::{ExpansionState, Node, NodeKey, TreeHandle};

/// One visible line of the tree view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRow<'a> {
    pub key: NodeKey,
    pub node: &'a Node,
    /// Indentation level; the root is 0.
    pub depth: usize,
    pub has_children: bool,
    pub is_expanded: bool,
    /// Children are shown directly below this row.
    pub has_visible_children: bool,
}

impl DisplayRow<'_> {
    /// Plain-text rendering used by print mode and logs.
    ///
    /// ```text
    /// v Sports
    ///   > Chess
    ///     Football [3 topics]
    /// ```
    pub fn to_plain_line(&self) -> String {
        let marker = match (self.has_children, self.is_expanded) {
            (false, _) => "  ",
            (true, true) => "v ",
            (true, false) => "> ",
        };
        let mut line = format!("{}{}{}", "  ".repeat(self.depth), marker, self.node.title());
        if let Node::Forum(forum) = self.node {
            line.push_str(&format!(" [{} topics]", forum.stats.topic_count));
        }
        line
    }
}

/// Pre-order walk over the visible part of a tree.
///
/// Children of a collapsed node are skipped. The walk is lazy and borrows
/// the tree, so it cannot outlive the next mutation.
#[derive(Debug, Clone)]
pub struct Projection<'a> {
    tree: &'a TreeHandle,
    expansion: &'a ExpansionState,
    stack: Vec<(NodeKey, usize)>,
}

impl<'a> Iterator for Projection<'a> {
    type Item = DisplayRow<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (key, depth) = self.stack.pop()?;
            let Some(entry) = self.tree.get(key) else {
                continue;
            };

            let has_children = !entry.is_leaf();
            let is_expanded = self.expansion.is_expanded(key);
            let has_visible_children = has_children && is_expanded;
            if has_visible_children {
                self.stack
                    .extend(entry.children().iter().rev().map(|child| (*child, depth + 1)));
            }

            return Some(DisplayRow {
                key,
                node: entry.node(),
                depth,
                has_children,
                is_expanded,
                has_visible_children,
            });
        }
    }
}

/// Flatten `tree` into display rows, root first.
pub fn project<'a>(tree: &'a TreeHandle, expansion: &'a ExpansionState) -> Projection<'a> {
    Projection {
        tree,
        expansion,
        stack: vec![(tree.root(), 0)],
    }
}
