//! An in-process backend holding every collection in memory.
//!
//! Writes are broadcast to all matching subscribers as change events, including the subscriber whose collection
//! issued the write, the same way a hosted realtime backend echoes a client's own writes. Helpers simulate other
//! clients (`insert_remote` and friends), transport outages (`set_connection`), slow fetches and rejected writes.

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard, RwLock, Weak,
    },
    time::Duration,
};

use async_trait::async_trait;
use hearth_core::{Backend, BackendError, ChangeEvent, ConnectionState, FeedSubscription, Filter, Mutation, Record};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

type Canonicalizer<R> = Box<dyn Fn(&str, R) -> anyhow::Result<R> + Send + Sync>;

struct Subscriber<R: Record> {
    collection: String,
    filter: Filter,
    sender: mpsc::UnboundedSender<ChangeEvent<R>>,
}

struct Inner<R: Record> {
    tables: Mutex<HashMap<String, BTreeMap<R::Id, R>>>,
    subscribers: Mutex<HashMap<usize, Subscriber<R>>>,
    next_subscriber: AtomicUsize,
    connection: watch::Sender<ConnectionState>,
    canonicalizer: RwLock<Option<Canonicalizer<R>>>,
    failed_fetches: Mutex<VecDeque<BackendError>>,
    failed_mutations: Mutex<VecDeque<BackendError>>,
    fetch_delay: Mutex<Duration>,
    mutation_delay: Mutex<Duration>,
    fetches: AtomicUsize,
    mutations: AtomicUsize,
}

/// Backend keeping its tables in process memory. Cloning shares the same tables.
pub struct MemoryBackend<R: Record> {
    inner: Arc<Inner<R>>,
}

impl<R: Record> Clone for MemoryBackend<R> {
    fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

impl<R: Record + Serialize> Default for MemoryBackend<R> {
    fn default() -> Self { Self::new() }
}

impl<R: Record + Serialize> MemoryBackend<R> {
    /// Create an empty backend with a connected change feed
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                tables: Mutex::new(HashMap::new()),
                subscribers: Mutex::new(HashMap::new()),
                next_subscriber: AtomicUsize::new(0),
                connection: watch::Sender::new(ConnectionState::Connected),
                canonicalizer: RwLock::new(None),
                failed_fetches: Mutex::new(VecDeque::new()),
                failed_mutations: Mutex::new(VecDeque::new()),
                fetch_delay: Mutex::new(Duration::ZERO),
                mutation_delay: Mutex::new(Duration::ZERO),
                fetches: AtomicUsize::new(0),
                mutations: AtomicUsize::new(0),
            }),
        }
    }

    /// Rewrite every inserted or updated record before it is stored, the way a database fills in generated ids,
    /// defaults and timestamps. An error rejects the write.
    pub fn set_canonicalizer(&self, canonicalize: impl Fn(&str, R) -> anyhow::Result<R> + Send + Sync + 'static) {
        *self.inner.canonicalizer.write().expect("Failed to lock canonicalizer") = Some(Box::new(canonicalize));
    }

    /// Store records without emitting change events
    pub fn seed(&self, collection: &str, records: impl IntoIterator<Item = R>) {
        let mut tables = self.inner.tables();
        let table = tables.entry(collection.to_string()).or_default();
        for record in records {
            table.insert(record.id(), record);
        }
    }

    /// Current contents of `collection`, ordered by id
    pub fn rows(&self, collection: &str) -> Vec<R> {
        self.inner.tables().get(collection).map(|table| table.values().cloned().collect()).unwrap_or_default()
    }

    pub fn get(&self, collection: &str, id: &R::Id) -> Option<R> { self.inner.tables().get(collection)?.get(id).cloned() }

    /// Change the transport state seen by every subscriber. Events are not delivered while disconnected.
    pub fn set_connection(&self, state: ConnectionState) {
        info!("MemoryBackend connection {}", state);
        self.inner.connection.send_replace(state);
    }

    pub fn connection_state(&self) -> ConnectionState { self.inner.connection.borrow().clone() }

    /// Make the next fetch fail with `error`. Queued failures are consumed in order.
    pub fn fail_next_fetch(&self, error: BackendError) {
        self.inner.failed_fetches.lock().expect("Failed to lock failures").push_back(error);
    }

    /// Make the next write fail with `error` without touching the tables
    pub fn fail_next_mutation(&self, error: BackendError) {
        self.inner.failed_mutations.lock().expect("Failed to lock failures").push_back(error);
    }

    pub fn set_fetch_delay(&self, delay: Duration) { *self.inner.fetch_delay.lock().expect("Failed to lock delay") = delay; }

    /// Delay the response of every write. The change event is still emitted immediately, so the echo reaches
    /// subscribers before the writer hears back.
    pub fn set_mutation_delay(&self, delay: Duration) {
        *self.inner.mutation_delay.lock().expect("Failed to lock delay") = delay;
    }

    pub fn fetch_count(&self) -> usize { self.inner.fetches.load(Ordering::SeqCst) }

    pub fn mutation_count(&self) -> usize { self.inner.mutations.load(Ordering::SeqCst) }

    pub fn subscriber_count(&self) -> usize { self.inner.subscribers().len() }

    /// Insert or overwrite a record as another client would, emitting `Created` or `Updated`
    pub fn upsert_remote(&self, collection: &str, record: R) {
        let previous = self.inner.tables().entry(collection.to_string()).or_default().insert(record.id(), record.clone());
        let event = match previous {
            Some(_) => ChangeEvent::Updated(record),
            None => ChangeEvent::Created(record),
        };
        self.inner.publish(collection, event);
    }

    pub fn insert_remote(&self, collection: &str, record: R) { self.upsert_remote(collection, record) }

    pub fn update_remote(&self, collection: &str, record: R) { self.upsert_remote(collection, record) }

    /// Delete a record as another client would
    pub fn delete_remote(&self, collection: &str, id: R::Id) {
        let previous = self.inner.tables().get_mut(collection).and_then(|table| table.remove(&id));
        if previous.is_some() {
            self.inner.publish(collection, ChangeEvent::Deleted(id));
        }
    }

    /// Deliver an arbitrary event without touching the tables, e.g. a redelivered or out-of-date event
    pub fn emit(&self, collection: &str, event: ChangeEvent<R>) { self.inner.publish(collection, event); }
}

impl<R: Record> Inner<R> {
    fn tables(&self) -> MutexGuard<'_, HashMap<String, BTreeMap<R::Id, R>>> { self.tables.lock().expect("Failed to lock tables") }

    fn subscribers(&self) -> MutexGuard<'_, HashMap<usize, Subscriber<R>>> {
        self.subscribers.lock().expect("Failed to lock subscribers")
    }

    fn unsubscribe(&self, id: usize) {
        if self.subscribers().remove(&id).is_some() {
            debug!("MemoryBackend subscriber {} removed", id);
        }
    }
}

impl<R: Record + Serialize> Inner<R> {
    fn publish(&self, collection: &str, event: ChangeEvent<R>) {
        if !self.connection.borrow().is_connected() {
            debug!("MemoryBackend dropping {} event for {}: not connected", collection, event.id());
            return;
        }
        let mut subscribers = self.subscribers();
        subscribers.retain(|_, subscriber| {
            if subscriber.collection != collection {
                return true;
            }
            let matches = match &event {
                ChangeEvent::Created(record) | ChangeEvent::Updated(record) => subscriber.filter.matches_record(record),
                ChangeEvent::Deleted(_) => true,
            };
            !matches || subscriber.sender.send(event.clone()).is_ok()
        });
    }

    fn canonicalize(&self, collection: &str, record: R) -> Result<R, BackendError> {
        match self.canonicalizer.read().expect("Failed to lock canonicalizer").as_ref() {
            Some(canonicalize) => Ok(canonicalize(collection, record)?),
            None => Ok(record),
        }
    }

    fn apply(&self, collection: &str, mutation: Mutation<R>) -> Result<(Option<R>, Option<ChangeEvent<R>>), BackendError> {
        match mutation {
            Mutation::Insert(record) => {
                let record = self.canonicalize(collection, record)?;
                let mut tables = self.tables();
                let table = tables.entry(collection.to_string()).or_default();
                if table.contains_key(&record.id()) {
                    return Err(BackendError::Rejected(format!("duplicate key {}", record.id())));
                }
                table.insert(record.id(), record.clone());
                Ok((Some(record.clone()), Some(ChangeEvent::Created(record))))
            }
            Mutation::Update(record) => {
                let record = self.canonicalize(collection, record)?;
                let mut tables = self.tables();
                let Some(existing) = tables.get_mut(collection).and_then(|table| table.get_mut(&record.id())) else {
                    return Err(BackendError::NotFound(record.id().to_string()));
                };
                *existing = record.clone();
                Ok((Some(record.clone()), Some(ChangeEvent::Updated(record))))
            }
            // deleting an absent row succeeds without an event
            Mutation::Delete(id) => {
                let removed = self.tables().get_mut(collection).and_then(|table| table.remove(&id));
                Ok((None, removed.map(|_| ChangeEvent::Deleted(id))))
            }
        }
    }
}

#[async_trait]
impl<R: Record + Serialize> Backend<R> for MemoryBackend<R> {
    async fn fetch_all(&self, collection: &str, filter: &Filter) -> Result<Vec<R>, BackendError> {
        self.inner.fetches.fetch_add(1, Ordering::SeqCst);
        // rows are read when the request arrives; the delay models the response in flight
        let rows: Vec<R> = self.rows(collection).into_iter().filter(|record| filter.matches_record(record)).collect();
        let delay = *self.inner.fetch_delay.lock().expect("Failed to lock delay");
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.inner.failed_fetches.lock().expect("Failed to lock failures").pop_front() {
            return Err(error);
        }

        debug!("MemoryBackend fetch {} [{}] -> {} rows", collection, filter, rows.len());
        Ok(rows)
    }

    async fn mutate(&self, collection: &str, mutation: Mutation<R>) -> Result<Option<R>, BackendError> {
        self.inner.mutations.fetch_add(1, Ordering::SeqCst);
        let delay = *self.inner.mutation_delay.lock().expect("Failed to lock delay");

        let failure = self.inner.failed_mutations.lock().expect("Failed to lock failures").pop_front();
        let result = match failure {
            Some(error) => Err(error),
            None => self.inner.apply(collection, mutation).map(|(canonical, event)| {
                if let Some(event) = event {
                    self.inner.publish(collection, event);
                }
                canonical
            }),
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }

    fn subscribe(&self, collection: &str, filter: &Filter) -> Result<FeedSubscription<R>, BackendError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers().insert(id, Subscriber { collection: collection.to_string(), filter: filter.clone(), sender });
        debug!("MemoryBackend subscriber {} on {} [{}]", id, collection, filter);

        let inner: Weak<Inner<R>> = Arc::downgrade(&self.inner);
        Ok(FeedSubscription::new(receiver, self.inner.connection.subscribe(), move || {
            if let Some(inner) = inner.upgrade() {
                inner.unsubscribe(id);
            }
        }))
    }
}
