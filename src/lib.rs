//! Browse and edit a forum server's group/forum hierarchy.
//!
//! - [`tree`] - In-memory hierarchy, mutation, expansion and row projection
//! - [`sync`] - Owner of the tree; applies server round-trips to it
//! - [`api`] - Server contract and its REST implementation
//! - [`config`] - `config.toml` loading
//! - [`util`] - URL and text helpers

pub mod api;
pub mod config;
pub mod sync;
pub mod tree;
pub mod util;
