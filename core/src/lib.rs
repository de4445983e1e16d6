//! Client-side mirror of a remote collection, kept consistent with the backend's realtime change feed while the
//! user edits optimistically.
//!
//! A [`LiveCollection`] owns the lifecycle: it subscribes, fetches the initial contents, feeds change events
//! through the [`Reconciler`](reconciler::Reconciler) and announces every visible change to its listeners.

pub mod backend;
pub mod broadcast;
pub mod changes;
pub mod config;
pub mod error;
pub mod live;
pub mod ordering;
pub mod pending;
pub mod reconciler;
pub mod record;
pub mod store;
mod task;
mod util;

pub use backend::{Backend, ConnectionState, FeedSubscription, Filter};
pub use broadcast::ListenerGuard;
pub use changes::{Applied, ChangeEvent, CollectionUpdate, LocalWrite, Mutation, UpdateCause};
pub use config::CollectionConfig;
pub use error::{BackendError, MutationError, RetrievalError, StoreError};
pub use live::{LiveCollection, LoadStatus};
pub use ordering::{by_key, descending, OrderingPolicy};
pub use record::Record;
pub use store::{LocalStore, Snapshot};
