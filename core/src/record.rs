use std::{fmt::Debug, fmt::Display, hash::Hash};

/// A single row of a live collection.
///
/// `id` is the identity key of the record. It must be stable for the lifetime of the record and must never be
/// derived from mutable fields: two distinct records that report the same id will silently overwrite each other
/// in the local store.
pub trait Record: Clone + PartialEq + Debug + Send + Sync + 'static {
    type Id: Clone + Eq + Ord + Hash + Debug + Display + Send + Sync + 'static;

    fn id(&self) -> Self::Id;
}
