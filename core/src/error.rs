//! Error types for hearth collections.
//!
//! Duplicate or out-of-order change events are never errors: they are absorbed by the reconciler. What surfaces
//! here are failed fetches, rejected writes and misuse of the local store.

use thiserror::Error;

/// Error type for local store primitives.
///
/// Returned from: `LocalStore::insert`, `LocalStore::replace`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError<Id: std::fmt::Display> {
    /// `insert` was called for an id that is already present; use `replace` or `upsert`
    #[error("record {0} already exists")]
    AlreadyExists(Id),

    #[error("record {0} not found")]
    NotFound(Id),
}

/// Error reported by a backend implementation
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("connection closed")]
    ConnectionClosed,

    #[error("request timed out")]
    Timeout,

    /// The backend refused the request (constraint violation, policy denial, ...)
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("backend error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Error type for loading a collection.
///
/// Returned from: `LiveCollection::wait_ready`, `LiveCollection::refetch`
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("fetch timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("fetch failed: {0}")]
    Backend(#[from] BackendError),

    /// The collection was stopped before the fetch resolved; its result was discarded
    #[error("collection stopped")]
    Stopped,

    /// The initial load failed earlier; only the message is retained
    #[error("load failed: {0}")]
    Failed(String),
}

/// Error type for write operations.
///
/// Returned from: `LiveCollection::insert`, `update`, `remove`, `remove_where`, `update_many`.
/// When a write fails, its optimistic change has already been rolled back.
#[derive(Debug, Error)]
pub enum MutationError {
    /// The optimistic change could not be applied to the local store
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backend rejected the write
    #[error("write rejected: {0}")]
    Rejected(#[from] BackendError),

    #[error("collection stopped")]
    Stopped,
}

impl<Id: std::fmt::Display> From<StoreError<Id>> for MutationError {
    fn from(err: StoreError<Id>) -> Self { MutationError::Conflict(err.to_string()) }
}
