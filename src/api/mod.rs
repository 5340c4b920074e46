//! Data-access contract for the forum server.
//!
//! The tree engine never talks to the network itself. It consumes a
//! [`ForumSource`], which the REST client in [`client`] implements and tests
//! replace with in-memory doubles.
//!
//! - [`types`] - Hierarchy payloads, request bodies and update responses
//! - [`client`] - `reqwest`-backed implementation

mod client;
mod types;

use async_trait::async_trait;
use thiserror::Error;

use crate::util::UrlValidationError;

pub use client::HttpForumClient;
pub use types::{
    FieldPatch, ForumFields, ForumPatch, ForumPayload, ForumStats, GroupFields, GroupPatch,
    GroupPayload, Icon, NodeFields,
};

/// Errors surfaced by a [`ForumSource`].
///
/// Transport-level failures are opaque to the tree engine: it reports them
/// and leaves the tree untouched.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Request timed out")]
    Timeout,
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Invalid UTF-8 in response")]
    InvalidUtf8,
    #[error("Malformed response body: {0}")]
    Decode(String),
    #[error("Could not encode request body: {0}")]
    Encode(String),
    #[error("Invalid server URL: {0}")]
    InvalidBaseUrl(#[from] UrlValidationError),
}

/// Operations the forum server exposes for the group/forum hierarchy.
///
/// Real implementation: [`HttpForumClient`]. Test doubles live next to the
/// tests that use them.
#[async_trait]
pub trait ForumSource: Send + Sync {
    /// Fetch the root group with its complete subtree.
    async fn fetch_root_hierarchy(&self) -> Result<GroupPayload, ApiError>;

    /// Create a group under the group `parent_id`.
    async fn create_group(
        &self,
        parent_id: i64,
        fields: &GroupFields,
    ) -> Result<GroupPayload, ApiError>;

    /// Create a forum under the group `parent_id`.
    async fn create_forum(
        &self,
        parent_id: i64,
        fields: &ForumFields,
    ) -> Result<ForumPayload, ApiError>;

    async fn update_group(&self, id: i64, fields: &GroupFields) -> Result<GroupPatch, ApiError>;

    async fn update_forum(&self, id: i64, fields: &ForumFields) -> Result<ForumPatch, ApiError>;
}
