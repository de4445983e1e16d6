use crate::{backend::ConnectionState, record::Record, store::Snapshot};

/// A remote change delivered by the change feed. Delivery is at-least-once and unordered relative to local writes.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent<R: Record> {
    Created(R),
    Updated(R),
    Deleted(R::Id),
}

impl<R: Record> ChangeEvent<R> {
    pub fn id(&self) -> R::Id {
        match self {
            ChangeEvent::Created(record) | ChangeEvent::Updated(record) => record.id(),
            ChangeEvent::Deleted(id) => id.clone(),
        }
    }
}

/// A write request sent to the backend
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation<R: Record> {
    Insert(R),
    Update(R),
    Delete(R::Id),
}

impl<R: Record> Mutation<R> {
    pub fn id(&self) -> R::Id {
        match self {
            Mutation::Insert(record) | Mutation::Update(record) => record.id(),
            Mutation::Delete(id) => id.clone(),
        }
    }
}

/// What the reconciler did with one change event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied<Id> {
    Inserted(Id),
    Updated(Id),
    Removed(Id),
    /// Redelivery of a value the store already holds
    Unchanged(Id),
    /// The server's confirmation of a pending local write; the store already reflected it
    Echo(Id),
    /// A pre-mutation value racing a pending local write; discarded
    StaleEcho(Id),
    /// A create for an unseen id held back while a locally created record awaits its response
    Deferred(Id),
    /// The event was not applied (feed disconnected, or a delete for a record never observed)
    Ignored(Id),
}

impl<Id> Applied<Id> {
    /// Whether the store's visible contents changed
    pub fn changed(&self) -> bool { matches!(self, Applied::Inserted(_) | Applied::Updated(_) | Applied::Removed(_)) }
}

/// A local optimistic write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalWrite<Id> {
    Insert(Id),
    Update(Id),
    Remove(Id),
}

/// Why listeners are being notified
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateCause<Id> {
    /// The initial fetch completed
    Initialized,
    /// A full refetch replaced the baseline (reconnect or explicit refetch)
    Resynced,
    Remote(Applied<Id>),
    Local(LocalWrite<Id>),
    /// The backend confirmed a write and its canonical record was applied
    Confirmed(Id),
    /// A write failed and its optimistic change was reverted
    RolledBack(Id),
    /// The ordering policy was replaced and the collection re-sorted
    Reordered,
    /// Expired pending writes released remote changes that were held back
    Swept,
    /// The transport's connection state changed; the snapshot is unchanged
    Connection(ConnectionState),
}

/// Notification sent to collection listeners
#[derive(Debug, Clone)]
pub struct CollectionUpdate<R: Record> {
    pub snapshot: Snapshot<R>,
    pub cause: UpdateCause<R::Id>,
}
