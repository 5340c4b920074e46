use thiserror::Error;

use super::NodeKey;

/// Errors raised by tree construction and local mutation.
///
/// A tree operation that returns one of these has left the [`TreeHandle`]
/// exactly as it found it.
///
/// [`TreeHandle`]: super::TreeHandle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The hierarchy payload is malformed (duplicate node, wrong parent, runaway nesting).
    #[error("Inconsistent hierarchy data: {0}")]
    Integrity(String),

    /// The node is not in the tree; the local copy has drifted from the server.
    #[error("Node {0} is not in the tree")]
    NotFound(NodeKey),

    /// The operation would break a structural rule of the tree.
    #[error("Operation not allowed: {0}")]
    Invariant(String),
}
