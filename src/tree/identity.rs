use std::fmt;

/// Which side of the tagged union a node lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Group,
    Forum,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Group => "group",
            NodeKind::Forum => "forum",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identity of a node within a tree.
///
/// Built from the server-assigned id plus the node kind, so a group and a
/// forum that share a numeric id never collide. Survives rebuilds as long as
/// the server id does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    kind: NodeKind,
    id: i64,
}

impl NodeKey {
    pub const fn new(kind: NodeKind, id: i64) -> Self {
        Self { kind, id }
    }

    pub const fn group(id: i64) -> Self {
        Self::new(NodeKind::Group, id)
    }

    pub const fn forum(id: i64) -> Self {
        Self::new(NodeKind::Forum, id)
    }

    pub fn kind(self) -> NodeKind {
        self.kind
    }

    /// Server-assigned id.
    pub fn id(self) -> i64 {
        self.id
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_kinds_do_not_collide() {
        let keys: HashSet<NodeKey> = [NodeKey::group(5), NodeKey::forum(5)].into_iter().collect();
        assert_eq!(keys.len(), 2);
        assert_ne!(NodeKey::group(5), NodeKey::forum(5));
    }

    #[test]
    fn test_key_is_stable() {
        assert_eq!(NodeKey::group(42), NodeKey::new(NodeKind::Group, 42));
        assert_eq!(NodeKey::forum(7).id(), 7);
        assert_eq!(NodeKey::forum(7).kind(), NodeKind::Forum);
    }

    #[test]
    fn test_display() {
        assert_eq!(NodeKey::group(3).to_string(), "group:3");
        assert_eq!(NodeKey::forum(12).to_string(), "forum:12");
    }
}
