use std::{sync::Arc, time::Duration};

use tracing::debug;

use crate::{
    changes::{Applied, ChangeEvent},
    error::StoreError,
    ordering::OrderingPolicy,
    pending::{PendingWrites, Withdrawn},
    record::Record,
    store::{LocalStore, Snapshot},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Disconnected,
    Connected,
}

/// Merges a server-authoritative change stream and local optimistic writes into one local store.
///
/// Remote events are reconciled against the pending-write tracker:
/// - a delete always removes and clears any pending write for the id;
/// - a create/update for a pending id that equals the local copy is the echo of our latest write and settles it;
/// - one that equals an older in-flight value is the echo of that earlier write: it is retired and the event
///   discarded while newer writes stay pending;
/// - one that equals the value from before our writes is a stale echo racing them and is discarded;
/// - anything else is authoritative and applied, clearing the pending writes.
///
/// Ids without a pending write are upserted unconditionally, which makes every event idempotent. The exception are
/// creates for unseen ids while a locally created record awaits its response: the server may have stored it under
/// an id of its own, so those creates are deferred until the placeholder is settled.
pub struct Reconciler<R: Record> {
    state: FeedState,
    store: LocalStore<R>,
    pending: PendingWrites<R>,
    deferred: Vec<R>,
    pending_ttl: Duration,
}

impl<R: Record> Reconciler<R> {
    pub fn new(policy: Arc<dyn OrderingPolicy<R>>, pending_ttl: Duration) -> Self {
        Self {
            state: FeedState::Disconnected,
            store: LocalStore::with_policy(policy),
            pending: PendingWrites::new(),
            deferred: Vec::new(),
            pending_ttl,
        }
    }

    pub fn state(&self) -> FeedState { self.state }
    pub fn snapshot(&self) -> Snapshot<R> { self.store.snapshot() }
    pub fn is_pending(&self, id: &R::Id) -> bool { self.pending.is_pending(id) }

    /// Disconnected -> Connected, establishing the baseline from a full fetch. Optimistic writes issued while the
    /// fetch was in flight survive it.
    pub fn connect(&mut self, baseline: Vec<R>) -> Snapshot<R> {
        self.state = FeedState::Connected;
        self.rebase(baseline)
    }

    /// Replace the baseline after a refetch. Records with a pending local write keep their optimistic value:
    /// the fetch may predate the write.
    pub fn rebase(&mut self, baseline: Vec<R>) -> Snapshot<R> {
        self.pending.sweep_expired(self.pending_ttl);

        let optimistic: Vec<(R::Id, Option<R>)> = self
            .pending
            .ids()
            .into_iter()
            .map(|id| {
                let local = self.store.get(&id).cloned();
                (id, local)
            })
            .collect();

        self.store.reset(baseline);
        for (id, local) in optimistic {
            match local {
                Some(record) => {
                    self.store.upsert(record);
                }
                // pending delete
                None => {
                    self.store.remove(&id);
                }
            }
        }
        self.release_deferred();
        self.store.snapshot()
    }

    /// Connected -> Disconnected. The local store and pending writes are discarded.
    pub fn disconnect(&mut self) {
        self.state = FeedState::Disconnected;
        self.store.clear();
        self.pending.clear();
        self.deferred.clear();
    }

    pub fn set_policy(&mut self, policy: Arc<dyn OrderingPolicy<R>>) { self.store.set_policy(policy); }

    /// Drop pending writes older than the configured ttl. Returns whether the store changed.
    pub fn sweep(&mut self) -> bool {
        let expired = self.pending.sweep_expired(self.pending_ttl);
        if !expired.is_empty() {
            debug!("Reconciler swept {} expired pending writes", expired.len());
        }
        self.release_deferred()
    }

    /// Apply one remote change event
    pub fn apply(&mut self, event: ChangeEvent<R>) -> Applied<R::Id> {
        let id = event.id();
        if self.state == FeedState::Disconnected {
            debug!("Reconciler ignoring event for {} while disconnected", id);
            return Applied::Ignored(id);
        }
        self.pending.sweep_expired(self.pending_ttl);

        match event {
            ChangeEvent::Deleted(id) => {
                let was_pending = self.pending.clear_pending(&id).is_some();
                let was_deferred = self.take_deferred(&id).is_some();
                match self.store.remove(&id) {
                    Some(_) => Applied::Removed(id),
                    None if was_pending => Applied::Echo(id),
                    None if was_deferred => Applied::Deferred(id),
                    None => Applied::Ignored(id),
                }
            }
            ChangeEvent::Created(record) | ChangeEvent::Updated(record) => {
                if let Some(pending) = self.pending.get(&id) {
                    if self.store.get(&id) == Some(&record) {
                        self.pending.clear_pending(&id);
                        return Applied::Echo(id);
                    }
                    if let Some(version) = pending.version_of(&record) {
                        debug!("Reconciler retiring earlier write {} to {}", version, id);
                        self.pending.retire_through(&id, version, Some(record));
                        return Applied::Echo(id);
                    }
                    if pending.prior.as_ref() == Some(&record) {
                        debug!("Reconciler discarding stale echo for pending {}", id);
                        return Applied::StaleEcho(id);
                    }
                    self.pending.clear_pending(&id);
                } else if !self.store.contains(&id) {
                    self.take_deferred(&id);
                    if self.pending.has_placeholders() {
                        debug!("Reconciler deferring {} until local inserts settle", id);
                        self.deferred.push(record);
                        return Applied::Deferred(id);
                    }
                }
                self.upsert(record)
            }
        }
    }

    fn upsert(&mut self, record: R) -> Applied<R::Id> {
        let id = record.id();
        if self.store.get(&id) == Some(&record) {
            return Applied::Unchanged(id);
        }
        match self.store.upsert(record) {
            Some(_) => Applied::Updated(id),
            None => Applied::Inserted(id),
        }
    }

    fn take_deferred(&mut self, id: &R::Id) -> Option<R> {
        let position = self.deferred.iter().position(|r| &r.id() == id)?;
        Some(self.deferred.remove(position))
    }

    /// Apply deferred creates once no locally created record awaits its response. Returns whether the store changed.
    fn release_deferred(&mut self) -> bool {
        if self.deferred.is_empty() || self.pending.has_placeholders() {
            return false;
        }
        let mut changed = false;
        for record in std::mem::take(&mut self.deferred) {
            // a local write made since is newer
            if !self.pending.is_pending(&record.id()) {
                changed |= self.upsert(record).changed();
            }
        }
        changed
    }

    /// Optimistically insert a new record and mark it pending
    pub fn optimistic_insert(&mut self, record: R) -> Result<u64, StoreError<R::Id>> {
        self.store.insert(record.clone())?;
        Ok(self.pending.mark_insert(record))
    }

    /// Optimistically replace an existing record and mark it pending
    pub fn optimistic_replace(&mut self, record: R) -> Result<u64, StoreError<R::Id>> {
        let id = record.id();
        let prior = self.store.replace(record.clone())?;
        Ok(self.pending.mark_pending(id, prior, Some(record)))
    }

    /// Optimistically remove a record and mark it pending. `None` if the record is not present.
    pub fn optimistic_remove(&mut self, id: &R::Id) -> Option<u64> {
        let prior = self.store.remove(id)?;
        Some(self.pending.mark_pending(id.clone(), prior, None))
    }

    /// Optimistically remove every record matching `predicate`, returning the removed ids with their write versions
    pub fn optimistic_remove_where(&mut self, predicate: impl FnMut(&R) -> bool) -> Vec<(R::Id, u64)> {
        self.store
            .remove_where(predicate)
            .into_iter()
            .map(|prior| {
                let id = prior.id();
                let version = self.pending.mark_pending(id.clone(), prior, None);
                (id, version)
            })
            .collect()
    }

    /// The backend accepted write `version` to `id`. Applies the canonical record if that write is still the newest
    /// pending one. An older write is only retired: a newer local write supersedes it. Nothing is applied if its echo
    /// (or the ttl) already settled it. Returns whether the store changed.
    pub fn confirm(&mut self, id: &R::Id, version: u64, canonical: Option<R>) -> bool {
        if !self.pending.clear_if_current(id, version) {
            let known = canonical.filter(|c| &c.id() == id);
            self.pending.retire_through(id, version, known);
            return self.release_deferred();
        }
        let mut changed = false;
        if let Some(canonical) = canonical {
            if &canonical.id() != id {
                // server assigned its own id; drop the optimistic placeholder
                changed |= self.store.remove(id).is_some();
                self.take_deferred(&canonical.id());
            }
            changed |= self.upsert(canonical).changed();
        }
        changed | self.release_deferred()
    }

    /// The backend rejected write `version` to `id`. If it was the newest write, the store goes back to the value
    /// before it: the previous in-flight write, else the last server-known value (or nothing for an optimistic
    /// insert). A failed write already covered by a newer one is just withdrawn. Returns whether the store changed.
    pub fn rollback(&mut self, id: &R::Id, version: u64) -> bool {
        let changed = match self.pending.withdraw(id, version) {
            None | Some(Withdrawn::Superseded) => false,
            Some(Withdrawn::Restore(Some(record))) => {
                self.store.upsert(record);
                true
            }
            Some(Withdrawn::Restore(None)) => self.store.remove(id).is_some(),
        };
        changed | self.release_deferred()
    }
}
