use std::{collections::HashMap, time::Duration};

use tokio::time::Instant;

use crate::record::Record;

/// The optimistic writes to one id that have not been confirmed yet
#[derive(Debug, Clone)]
pub struct PendingWrite<R> {
    /// Monotonic local version of the most recent optimistic write to this id
    pub version: u64,
    pub marked_at: Instant,
    /// The last value the server is known to hold. `None` if the server has never held the id.
    pub prior: Option<R>,
    /// Every in-flight optimistic value, oldest first. `None` stands for a delete.
    pub writes: Vec<(u64, Option<R>)>,
    /// The id was created locally and the server has not acknowledged it under that id yet
    pub placeholder: bool,
}

impl<R: PartialEq> PendingWrite<R> {
    /// Version of the newest in-flight write that set the id to `value`
    pub fn version_of(&self, value: &R) -> Option<u64> {
        self.writes.iter().rev().find(|(_, v)| v.as_ref() == Some(value)).map(|(version, _)| *version)
    }
}

/// What the store should show once a failed write is withdrawn
#[derive(Debug, Clone, PartialEq)]
pub enum Withdrawn<R> {
    /// A newer write still covers the id; the visible value stays
    Superseded,
    /// The failed write was the newest one: show this value, or nothing for `None`
    Restore(Option<R>),
}

/// Tracks which ids carry an optimistic local write that has not yet been confirmed or echoed back by the server.
///
/// This is an advisory de-duplication hint, not a lock: entries expire after a bounded age so that a write which
/// silently failed never blocks later remote updates to the same record.
#[derive(Debug)]
pub struct PendingWrites<R: Record> {
    entries: HashMap<R::Id, PendingWrite<R>>,
    next_version: u64,
}

impl<R: Record> Default for PendingWrites<R> {
    fn default() -> Self { Self::new() }
}

impl<R: Record> PendingWrites<R> {
    pub fn new() -> Self { Self { entries: HashMap::new(), next_version: 1 } }

    /// Mark a locally created record as pending. Returns the version of this write.
    pub fn mark_insert(&mut self, record: R) -> u64 { self.mark(record.id(), None, Some(record)) }

    /// Mark `id` as locally written to `value` (`None` for a delete) over `prior`. If the id is already pending, the
    /// original prior is kept since it is still the last value the server acknowledged.
    pub fn mark_pending(&mut self, id: R::Id, prior: R, value: Option<R>) -> u64 { self.mark(id, Some(prior), value) }

    fn mark(&mut self, id: R::Id, prior: Option<R>, value: Option<R>) -> u64 {
        let version = self.next_version;
        self.next_version += 1;
        let now = Instant::now();
        let entry = self.entries.entry(id).or_insert_with(|| PendingWrite {
            version,
            marked_at: now,
            placeholder: prior.is_none(),
            prior,
            writes: Vec::new(),
        });
        entry.version = version;
        entry.marked_at = now;
        entry.writes.push((version, value));
        version
    }

    pub fn is_pending(&self, id: &R::Id) -> bool { self.entries.contains_key(id) }

    pub fn get(&self, id: &R::Id) -> Option<&PendingWrite<R>> { self.entries.get(id) }

    pub fn clear_pending(&mut self, id: &R::Id) -> Option<PendingWrite<R>> { self.entries.remove(id) }

    /// Clear `id` only if `version` is still its latest write. A confirmation for an older write must not clear a
    /// newer optimistic change to the same record.
    pub fn clear_if_current(&mut self, id: &R::Id, version: u64) -> bool {
        match self.entries.get(id) {
            Some(entry) if entry.version == version => {
                self.entries.remove(id);
                true
            }
            _ => false,
        }
    }

    /// The server acknowledged write `version` of `id` and now holds `known`. That write and every older one are
    /// retired while newer writes stay pending. Returns false if no in-flight write was retired.
    pub fn retire_through(&mut self, id: &R::Id, version: u64, known: Option<R>) -> bool {
        let Some(entry) = self.entries.get_mut(id) else {
            return false;
        };
        let before = entry.writes.len();
        entry.writes.retain(|(v, _)| *v > version);
        if entry.writes.len() == before {
            return false;
        }
        entry.prior = known;
        entry.placeholder = false;
        if entry.writes.is_empty() {
            self.entries.remove(id);
        }
        true
    }

    /// Withdraw the failed write `version` of `id`. `None` if that write is no longer in flight.
    pub fn withdraw(&mut self, id: &R::Id, version: u64) -> Option<Withdrawn<R>> {
        let entry = self.entries.get_mut(id)?;
        let position = entry.writes.iter().position(|(v, _)| *v == version)?;
        entry.writes.remove(position);
        if position < entry.writes.len() {
            return Some(Withdrawn::Superseded);
        }
        match entry.writes.last() {
            Some((latest, value)) => {
                let value = value.clone();
                entry.version = *latest;
                Some(Withdrawn::Restore(value))
            }
            None => self.entries.remove(id).map(|entry| Withdrawn::Restore(entry.prior)),
        }
    }

    /// Whether any locally created id still awaits the server's acknowledgement
    pub fn has_placeholders(&self) -> bool { self.entries.values().any(|entry| entry.placeholder) }

    /// Drop every entry older than `max_age`, returning the expired ids
    pub fn sweep_expired(&mut self, max_age: Duration) -> Vec<R::Id> {
        let now = Instant::now();
        let mut expired = Vec::new();
        self.entries.retain(|id, entry| {
            let keep = now.saturating_duration_since(entry.marked_at) < max_age;
            if !keep {
                expired.push(id.clone());
            }
            keep
        });
        expired
    }

    pub fn ids(&self) -> Vec<R::Id> { self.entries.keys().cloned().collect() }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
    pub fn clear(&mut self) { self.entries.clear(); }
}
