use std::{collections::HashSet, ops::Deref, sync::Arc};

use crate::{
    error::StoreError,
    ordering::{total_order, OrderingPolicy},
    record::Record,
};

/// An immutable, ordered view of a local store at one point in time.
///
/// Cloning a snapshot is O(1). Later mutations of the store never show through an existing snapshot: the store
/// copies its backing vector on write whenever a snapshot is still alive.
pub struct Snapshot<R>(Arc<Vec<R>>);

impl<R> Clone for Snapshot<R> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<R> Deref for Snapshot<R> {
    type Target = [R];
    fn deref(&self) -> &Self::Target { self.0.as_slice() }
}

impl<R: std::fmt::Debug> std::fmt::Debug for Snapshot<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_list().entries(self.0.iter()).finish() }
}

impl<R: PartialEq> PartialEq<Vec<R>> for Snapshot<R> {
    fn eq(&self, other: &Vec<R>) -> bool { self.0.as_slice() == other.as_slice() }
}

impl<R> Default for Snapshot<R> {
    fn default() -> Self { Self(Arc::new(Vec::new())) }
}

impl<R: Record> Snapshot<R> {
    pub fn ids(&self) -> Vec<R::Id> { self.0.iter().map(Record::id).collect() }
    pub fn get(&self, id: &R::Id) -> Option<&R> { self.0.iter().find(|r| &r.id() == id) }
}

/// In-memory ordered collection of records, unique by id.
pub struct LocalStore<R: Record> {
    records: Arc<Vec<R>>,
    ids: HashSet<R::Id>,
    policy: Arc<dyn OrderingPolicy<R>>,
}

impl<R: Record> LocalStore<R> {
    pub fn new(policy: impl OrderingPolicy<R> + 'static) -> Self { Self::with_policy(Arc::new(policy)) }

    pub fn with_policy(policy: Arc<dyn OrderingPolicy<R>>) -> Self {
        Self { records: Arc::new(Vec::new()), ids: HashSet::new(), policy }
    }

    pub fn snapshot(&self) -> Snapshot<R> { Snapshot(self.records.clone()) }

    pub fn len(&self) -> usize { self.records.len() }
    pub fn is_empty(&self) -> bool { self.records.is_empty() }
    pub fn contains(&self, id: &R::Id) -> bool { self.ids.contains(id) }

    pub fn get(&self, id: &R::Id) -> Option<&R> {
        if !self.ids.contains(id) {
            return None;
        }
        self.records.iter().find(|r| &r.id() == id)
    }

    /// Insert a record that is not yet present, at the position given by the ordering policy
    pub fn insert(&mut self, record: R) -> Result<(), StoreError<R::Id>> {
        let id = record.id();
        if self.ids.contains(&id) {
            return Err(StoreError::AlreadyExists(id));
        }
        self.place(record);
        self.ids.insert(id);
        Ok(())
    }

    /// Replace an existing record, re-positioning it since its ordering key may have changed.
    /// Returns the previous value.
    pub fn replace(&mut self, record: R) -> Result<R, StoreError<R::Id>> {
        let id = record.id();
        let Some(previous) = self.take(&id) else {
            return Err(StoreError::NotFound(id));
        };
        self.place(record);
        Ok(previous)
    }

    /// Remove a record by id. Absent ids are not an error: a delete may race a record we never observed.
    pub fn remove(&mut self, id: &R::Id) -> Option<R> {
        let removed = self.take(id)?;
        self.ids.remove(id);
        Some(removed)
    }

    /// Replace if present, insert otherwise. Returns the previous value, if any.
    pub fn upsert(&mut self, record: R) -> Option<R> {
        let id = record.id();
        match self.take(&id) {
            Some(previous) => {
                self.place(record);
                Some(previous)
            }
            None => {
                self.place(record);
                self.ids.insert(id);
                None
            }
        }
    }

    /// Remove every record matching the predicate, returning the removed records in snapshot order
    pub fn remove_where(&mut self, mut predicate: impl FnMut(&R) -> bool) -> Vec<R> {
        if !self.records.iter().any(&mut predicate) {
            return Vec::new();
        }
        let records = Arc::make_mut(&mut self.records);
        let (removed, kept): (Vec<R>, Vec<R>) = records.drain(..).partition(|r| predicate(r));
        *records = kept;
        for r in &removed {
            self.ids.remove(&r.id());
        }
        removed
    }

    /// Replace the entire contents with `records`. Later duplicates of an id win.
    pub fn reset(&mut self, records: impl IntoIterator<Item = R>) {
        self.records = Arc::new(Vec::new());
        self.ids.clear();
        for record in records {
            self.upsert(record);
        }
    }

    pub fn clear(&mut self) {
        self.records = Arc::new(Vec::new());
        self.ids.clear();
    }

    /// Swap the ordering policy. This always re-sorts the whole collection.
    pub fn set_policy(&mut self, policy: Arc<dyn OrderingPolicy<R>>) {
        self.policy = policy;
        let policy = self.policy.clone();
        Arc::make_mut(&mut self.records).sort_by(|a, b| total_order(&*policy, a, b));
    }

    fn take(&mut self, id: &R::Id) -> Option<R> {
        if !self.ids.contains(id) {
            return None;
        }
        let index = self.records.iter().position(|r| &r.id() == id)?;
        Some(Arc::make_mut(&mut self.records).remove(index))
    }

    fn place(&mut self, record: R) {
        let policy = &*self.policy;
        let index = self.records.partition_point(|r| total_order(policy, r, &record).is_lt());
        Arc::make_mut(&mut self.records).insert(index, record);
    }
}

impl<R: Record> std::fmt::Debug for LocalStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore").field("records", &self.records).finish()
    }
}
