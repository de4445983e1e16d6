//! The interface a hosted backend must offer to back a live collection.
//!
//! Any substrate with fetch / mutate / subscribe-with-change-events semantics qualifies. The backend instance is
//! constructed by the caller and handed to each collection, so tests can substitute an in-process implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::sync::{mpsc, watch};

use crate::{
    changes::{ChangeEvent, Mutation},
    error::BackendError,
    record::Record,
};

#[async_trait]
pub trait Backend<R: Record>: Send + Sync + 'static {
    /// Load every record of `collection` matching `filter`
    async fn fetch_all(&self, collection: &str, filter: &Filter) -> Result<Vec<R>, BackendError>;

    /// Apply a write. Inserts and updates return the server's canonical record (generated ids, timestamps);
    /// deletes return `None`.
    async fn mutate(&self, collection: &str, mutation: Mutation<R>) -> Result<Option<R>, BackendError>;

    /// Open the realtime change feed for `collection`
    fn subscribe(&self, collection: &str, filter: &Filter) -> Result<FeedSubscription<R>, BackendError>;
}

/// Connection state of a realtime transport
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    #[strum(serialize = "Error")]
    Error(String),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool { matches!(self, ConnectionState::Connected) }
}

/// A conjunction of `field = value` clauses evaluated against the JSON form of a record.
/// Used to scope a collection to one user or family.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    clauses: Vec<Clause>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub field: String,
    pub value: serde_json::Value,
}

impl Filter {
    /// Matches every record
    pub fn all() -> Self { Self::default() }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.clauses.push(Clause { field: field.into(), value: value.into() });
        self
    }

    pub fn clauses(&self) -> &[Clause] { &self.clauses }

    pub fn is_all(&self) -> bool { self.clauses.is_empty() }

    pub fn matches(&self, value: &serde_json::Value) -> bool {
        self.clauses.iter().all(|clause| value.get(&clause.field) == Some(&clause.value))
    }

    /// Evaluate against a serializable record. Records that fail to serialize never match.
    pub fn matches_record<T: Serialize>(&self, record: &T) -> bool {
        if self.is_all() {
            return true;
        }
        match serde_json::to_value(record) {
            Ok(value) => self.matches(&value),
            Err(_) => false,
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.clauses.is_empty() {
            return write!(f, "*");
        }
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                write!(f, " AND ")?;
            }
            write!(f, "{}={}", clause.field, clause.value)?;
        }
        Ok(())
    }
}

/// An open realtime change feed. Dropping it unsubscribes.
pub struct FeedSubscription<R: Record> {
    events: mpsc::UnboundedReceiver<ChangeEvent<R>>,
    connection: watch::Receiver<ConnectionState>,
    on_unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl<R: Record> FeedSubscription<R> {
    pub fn new(
        events: mpsc::UnboundedReceiver<ChangeEvent<R>>,
        connection: watch::Receiver<ConnectionState>,
        on_unsubscribe: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self { events, connection, on_unsubscribe: Some(Box::new(on_unsubscribe)) }
    }

    /// The next change event, or `None` once the backend closed the feed
    pub async fn next_event(&mut self) -> Option<ChangeEvent<R>> { self.events.recv().await }

    pub fn connection_state(&self) -> ConnectionState { self.connection.borrow().clone() }

    /// Wait for the next connection state transition. `None` once the transport is gone.
    pub async fn connection_changed(&mut self) -> Option<ConnectionState> {
        self.connection.changed().await.ok()?;
        Some(self.connection.borrow_and_update().clone())
    }

    /// Borrow the event stream and the connection state receiver at the same time, for use in `select!`
    pub fn parts(&mut self) -> (&mut mpsc::UnboundedReceiver<ChangeEvent<R>>, &mut watch::Receiver<ConnectionState>) {
        (&mut self.events, &mut self.connection)
    }

    pub fn unsubscribe(mut self) { self.teardown(); }

    fn teardown(&mut self) {
        self.events.close();
        if let Some(on_unsubscribe) = self.on_unsubscribe.take() {
            on_unsubscribe();
        }
    }
}

impl<R: Record> Drop for FeedSubscription<R> {
    fn drop(&mut self) { self.teardown(); }
}
