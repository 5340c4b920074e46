//! In-memory mirror of the server's group/forum hierarchy.
//!
//! - [`build`] turns a nested hierarchy payload into a [`TreeHandle`]
//! - [`TreeHandle::apply`] folds a server-confirmed [`TreeChange`] into it
//! - [`ExpansionState`] records which nodes are open, separately from the data
//! - [`project`] flattens the visible part into [`DisplayRow`]s

mod builder;
mod error;
mod expansion;
mod identity;
mod mutator;
mod projector;
mod types;

pub use builder::{build, MAX_TREE_DEPTH};
pub use error::TreeError;
pub use expansion::ExpansionState;
pub use identity::{NodeKey, NodeKind};
pub use mutator::TreeChange;
pub use projector::{project, DisplayRow, Projection};
pub use types::{ForumNode, GroupNode, Node, NodePatch, TreeHandle, TreeNode};
