//! Owner of the canonical tree and the server round-trips that change it.
//!
//! [`SyncCoordinator`] is the only place a [`TreeHandle`](crate::tree::TreeHandle)
//! is replaced or mutated. Every operation is a [`Request`] that runs against a
//! [`ForumSource`](crate::api::ForumSource) and comes back as a [`Response`];
//! the coordinator checks the [`Ticket`] before folding the result in.

mod coordinator;

pub use coordinator::{
    Phase, Request, Response, SyncCoordinator, SyncError, SyncOutcome, SyncStatus, Ticket,
};
