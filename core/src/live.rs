use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Duration,
};

use futures::future::join_all;
use strum::Display;
use tokio::{
    select,
    sync::{watch, Notify},
    task::JoinHandle,
    time::{interval, timeout, MissedTickBehavior},
};
use tracing::debug;

use crate::{
    backend::{Backend, ConnectionState},
    broadcast::{Broadcast, ListenerGuard},
    changes::{Applied, ChangeEvent, CollectionUpdate, LocalWrite, Mutation, UpdateCause},
    collection_debug, collection_info, collection_warn,
    config::CollectionConfig,
    error::{BackendError, MutationError, RetrievalError},
    ordering::OrderingPolicy,
    reconciler::{FeedState, Reconciler},
    record::Record,
    store::Snapshot,
    task,
};

/// Load status of a live collection
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum LoadStatus {
    Loading,
    Ready,
    #[strum(serialize = "Failed")]
    Failed(String),
    Stopped,
}

struct Inner<R: Record> {
    config: CollectionConfig,
    backend: Arc<dyn Backend<R>>,
    reconciler: Mutex<Reconciler<R>>,
    broadcast: Broadcast<CollectionUpdate<R>>,
    status: watch::Sender<LoadStatus>,
    connection: watch::Sender<ConnectionState>,
    stopped: AtomicBool,
    shutdown: Notify,
}

/// A collection mirrored from the backend for the lifetime of one view.
///
/// `start` subscribes to the change feed, performs the initial fetch and then keeps the local store reconciled
/// with remote change events until `stop` is called or the handle is dropped. Writes go through the handle: they
/// are applied optimistically, sent to the backend, then confirmed with the canonical record or rolled back.
///
/// Once stopped, nothing is applied or announced anymore: a fetch still in flight is discarded when it resolves.
pub struct LiveCollection<R: Record> {
    inner: Arc<Inner<R>>,
    task: Mutex<Option<JoinHandle<()>>>,
    _listener: ListenerGuard<CollectionUpdate<R>>,
}

enum Exit {
    Stopped,
    FeedClosed,
}

impl<R: Record> LiveCollection<R> {
    /// Start mirroring `config.collection`. Must be called from within a tokio runtime.
    pub fn start<P, F>(backend: Arc<dyn Backend<R>>, policy: P, config: CollectionConfig, on_update: F) -> Self
    where
        P: OrderingPolicy<R> + 'static,
        F: Fn(CollectionUpdate<R>) + Send + Sync + 'static,
    {
        collection_info!(config.collection, "start", "filter {}", config.filter);

        let inner = Arc::new(Inner {
            reconciler: Mutex::new(Reconciler::new(Arc::new(policy), config.pending_ttl)),
            config,
            backend,
            broadcast: Broadcast::new(),
            status: watch::Sender::new(LoadStatus::Loading),
            connection: watch::Sender::new(ConnectionState::Connecting),
            stopped: AtomicBool::new(false),
            shutdown: Notify::new(),
        });

        let listener = inner.broadcast.listen(on_update);
        let task = task::spawn(Inner::run(inner.clone()));
        Self { inner, task: Mutex::new(Some(task)), _listener: listener }
    }

    pub fn name(&self) -> &str { &self.inner.config.collection }

    pub fn snapshot(&self) -> Snapshot<R> { self.inner.lock().snapshot() }

    pub fn is_pending(&self, id: &R::Id) -> bool { self.inner.lock().is_pending(id) }

    pub fn status(&self) -> LoadStatus { self.inner.status.borrow().clone() }

    pub fn connection_state(&self) -> ConnectionState { self.inner.connection.borrow().clone() }

    pub fn is_stopped(&self) -> bool { self.inner.is_stopped() }

    /// Register an additional listener. Dropping the guard unsubscribes it.
    pub fn listen(&self, listener: impl Fn(CollectionUpdate<R>) + Send + Sync + 'static) -> ListenerGuard<CollectionUpdate<R>> {
        self.inner.broadcast.listen(listener)
    }

    /// Wait until the initial fetch has completed
    pub async fn wait_ready(&self) -> Result<(), RetrievalError> {
        let mut status = self.inner.status.subscribe();
        let status = status.wait_for(|s| *s != LoadStatus::Loading).await.map_err(|_| RetrievalError::Stopped)?.clone();
        match status {
            LoadStatus::Failed(message) => Err(RetrievalError::Failed(message)),
            LoadStatus::Stopped => Err(RetrievalError::Stopped),
            _ => Ok(()),
        }
    }

    /// Re-run the full fetch and replace the baseline. Pending local writes survive the refetch.
    pub async fn refetch(&self) -> Result<(), RetrievalError> {
        self.wait_ready().await?;
        self.inner.resync().await
    }

    /// Replace the ordering policy, re-sorting the whole collection
    pub fn set_ordering(&self, policy: impl OrderingPolicy<R> + 'static) {
        let snapshot = {
            let mut reconciler = self.inner.lock();
            reconciler.set_policy(Arc::new(policy));
            reconciler.snapshot()
        };
        self.inner.notify(snapshot, UpdateCause::Reordered);
    }

    /// Insert a new record. Returns the canonical record stored by the backend.
    pub async fn insert(&self, record: R) -> Result<R, MutationError> {
        self.inner.ensure_running()?;
        let id = record.id();
        let (version, snapshot) = {
            let mut reconciler = self.inner.lock();
            let version = reconciler.optimistic_insert(record.clone())?;
            (version, reconciler.snapshot())
        };
        self.inner.notify(snapshot, UpdateCause::Local(LocalWrite::Insert(id.clone())));

        let result = self.inner.backend.mutate(&self.inner.config.collection, Mutation::Insert(record.clone())).await;
        Ok(self.inner.settle(&id, Some(version), result)?.unwrap_or(record))
    }

    /// Replace an existing record. Returns the canonical record stored by the backend.
    pub async fn update(&self, record: R) -> Result<R, MutationError> {
        self.inner.ensure_running()?;
        let id = record.id();
        let (version, snapshot) = {
            let mut reconciler = self.inner.lock();
            let version = reconciler.optimistic_replace(record.clone())?;
            (version, reconciler.snapshot())
        };
        self.inner.notify(snapshot, UpdateCause::Local(LocalWrite::Update(id.clone())));

        let result = self.inner.backend.mutate(&self.inner.config.collection, Mutation::Update(record.clone())).await;
        Ok(self.inner.settle(&id, Some(version), result)?.unwrap_or(record))
    }

    /// Delete a record. The delete is sent even if the record is not present locally.
    pub async fn remove(&self, id: R::Id) -> Result<(), MutationError> {
        self.inner.ensure_running()?;
        let (version, snapshot) = {
            let mut reconciler = self.inner.lock();
            let version = reconciler.optimistic_remove(&id);
            (version, reconciler.snapshot())
        };
        if version.is_some() {
            self.inner.notify(snapshot, UpdateCause::Local(LocalWrite::Remove(id.clone())));
        }

        let result = self.inner.backend.mutate(&self.inner.config.collection, Mutation::Delete(id.clone())).await;
        self.inner.settle(&id, version, result)?;
        Ok(())
    }

    /// Delete every record matching `predicate`. The records leave the view at once; each delete is then settled on
    /// its own, so failed ones are rolled back while successful ones stay. Returns the number of records deleted, or
    /// the first failure.
    pub async fn remove_where(&self, predicate: impl FnMut(&R) -> bool) -> Result<usize, MutationError> {
        self.inner.ensure_running()?;
        let (removed, snapshot) = {
            let mut reconciler = self.inner.lock();
            let removed = reconciler.optimistic_remove_where(predicate);
            (removed, reconciler.snapshot())
        };
        for (id, _) in &removed {
            self.inner.notify(snapshot.clone(), UpdateCause::Local(LocalWrite::Remove(id.clone())));
        }

        let results = join_all(removed.into_iter().map(|(id, version)| async move {
            let result = self.inner.backend.mutate(&self.inner.config.collection, Mutation::Delete(id.clone())).await;
            self.inner.settle(&id, Some(version), result)
        }))
        .await;

        let mut count = 0;
        let mut first_error = None;
        for result in results {
            match result {
                Ok(_) => count += 1,
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(count),
        }
    }

    /// Update several records at once, e.g. after a drag reorder rewrote their rank field.
    /// Returns the canonical records, or the first failure.
    pub async fn update_many(&self, records: Vec<R>) -> Result<Vec<R>, MutationError> {
        self.inner.ensure_running()?;
        join_all(records.into_iter().map(|record| self.update(record))).await.into_iter().collect()
    }

    /// Tear down the change feed and discard the local store. Idempotent, and safe while the initial fetch is still
    /// in flight: its result will be dropped.
    pub fn stop(&self) {
        if self.inner.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        collection_info!(self.inner.config.collection, "stop");
        self.inner.shutdown.notify_one();
        self.inner.lock().disconnect();
        self.inner.status.send_replace(LoadStatus::Stopped);
    }

    /// Stop and wait for the feed to be torn down
    pub async fn shutdown(self) {
        self.stop();
        let task = self.task.lock().expect("Failed to lock task").take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                collection_warn!(self.inner.config.collection, "task join error", "{}", e);
            }
        }
    }
}

impl<R: Record> Drop for LiveCollection<R> {
    fn drop(&mut self) { self.stop(); }
}

impl<R: Record> Inner<R> {
    fn lock(&self) -> MutexGuard<'_, Reconciler<R>> { self.reconciler.lock().expect("Failed to lock reconciler") }

    fn is_stopped(&self) -> bool { self.stopped.load(Ordering::SeqCst) }

    fn ensure_running(&self) -> Result<(), MutationError> {
        if self.is_stopped() {
            return Err(MutationError::Stopped);
        }
        Ok(())
    }

    fn notify(&self, snapshot: Snapshot<R>, cause: UpdateCause<R::Id>) {
        if self.is_stopped() {
            return;
        }
        self.broadcast.send(CollectionUpdate { snapshot, cause });
    }

    fn set_connection(&self, state: ConnectionState) {
        if self.connection.send_replace(state.clone()) != state {
            collection_debug!(self.config.collection, "connection", "{}", state);
            let snapshot = self.lock().snapshot();
            self.notify(snapshot, UpdateCause::Connection(state));
        }
    }

    async fn fetch(&self) -> Result<Vec<R>, RetrievalError> {
        let request = self.backend.fetch_all(&self.config.collection, &self.config.filter);
        match timeout(self.config.fetch_timeout, request).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(RetrievalError::Timeout(self.config.fetch_timeout)),
        }
    }

    /// Refetch and rebase. A result that resolves after `stop` is discarded.
    async fn resync(&self) -> Result<(), RetrievalError> {
        let records = self.fetch().await?;
        if self.is_stopped() {
            return Err(RetrievalError::Stopped);
        }
        let snapshot = {
            let mut reconciler = self.lock();
            if reconciler.state() == FeedState::Disconnected {
                return Err(RetrievalError::Stopped);
            }
            reconciler.rebase(records)
        };
        collection_debug!(self.config.collection, "resynced", "{} records", snapshot.len());
        self.notify(snapshot, UpdateCause::Resynced);
        Ok(())
    }

    fn apply_remote(&self, event: ChangeEvent<R>) {
        let (applied, snapshot) = {
            let mut reconciler = self.lock();
            let applied = reconciler.apply(event);
            (applied, reconciler.snapshot())
        };
        match &applied {
            Applied::Echo(id) => collection_debug!(self.config.collection, "echo", "{}", id),
            Applied::StaleEcho(id) => collection_debug!(self.config.collection, "stale echo", "{}", id),
            Applied::Deferred(id) => collection_debug!(self.config.collection, "deferred", "{}", id),
            _ => {}
        }
        if applied.changed() {
            self.notify(snapshot, UpdateCause::Remote(applied));
        }
    }

    /// Confirm or roll back the optimistic write `version` to `id` according to the backend's response.
    /// After `stop` the local store is gone, so only the result is passed through.
    fn settle(&self, id: &R::Id, version: Option<u64>, result: Result<Option<R>, BackendError>) -> Result<Option<R>, MutationError> {
        match result {
            Ok(canonical) => {
                if let (Some(version), false) = (version, self.is_stopped()) {
                    let (changed, snapshot) = {
                        let mut reconciler = self.lock();
                        let changed = reconciler.confirm(id, version, canonical.clone());
                        (changed, reconciler.snapshot())
                    };
                    if changed {
                        self.notify(snapshot, UpdateCause::Confirmed(id.clone()));
                    }
                }
                Ok(canonical)
            }
            Err(e) => {
                collection_warn!(self.config.collection, "write rejected", "{}: {}", id, e);
                if let (Some(version), false) = (version, self.is_stopped()) {
                    let (rolled_back, snapshot) = {
                        let mut reconciler = self.lock();
                        (reconciler.rollback(id, version), reconciler.snapshot())
                    };
                    if rolled_back {
                        self.notify(snapshot, UpdateCause::RolledBack(id.clone()));
                    }
                }
                Err(MutationError::Rejected(e))
            }
        }
    }

    fn fail(&self, message: String) {
        if !self.is_stopped() {
            self.status.send_replace(LoadStatus::Failed(message));
        }
    }

    async fn run(self: Arc<Self>) {
        let name = self.config.collection.clone();

        let mut feed = match self.backend.subscribe(&name, &self.config.filter) {
            Ok(feed) => feed,
            Err(e) => {
                collection_warn!(name, "subscribe failed", "{}", e);
                self.fail(e.to_string());
                return;
            }
        };
        self.set_connection(feed.connection_state());

        let baseline = select! {
            _ = self.shutdown.notified() => {
                collection_debug!(name, "stopped during initial fetch");
                return;
            }
            result = self.fetch() => result,
        };
        if self.is_stopped() {
            debug!("Discarding initial fetch for stopped collection {}", name);
            return;
        }
        match baseline {
            Ok(records) => {
                let snapshot = {
                    let mut reconciler = self.lock();
                    // stop() flags before taking the lock, so this check cannot race its disconnect
                    if self.is_stopped() {
                        return;
                    }
                    reconciler.connect(records)
                };
                collection_info!(name, "ready", "{} records", snapshot.len());
                self.status.send_replace(LoadStatus::Ready);
                self.notify(snapshot, UpdateCause::Initialized);
            }
            Err(e) => {
                collection_warn!(name, "initial fetch failed", "{}", e);
                self.fail(e.to_string());
                return;
            }
        }

        // events missed before the feed was up are only recovered by a refetch once it connects
        let mut resync_on_connect = !feed.connection_state().is_connected();
        let mut sweep = interval(self.config.sweep_interval.max(Duration::from_millis(1)));
        sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let exit = loop {
            if self.is_stopped() {
                break Exit::Stopped;
            }
            let (events, connection) = feed.parts();
            select! {
                _ = self.shutdown.notified() => break Exit::Stopped,
                event = events.recv() => match event {
                    Some(event) => self.apply_remote(event),
                    None => break Exit::FeedClosed,
                },
                state = async {
                    connection.changed().await.ok()?;
                    Some(connection.borrow_and_update().clone())
                } => match state {
                    Some(state) => {
                        let connected = state.is_connected();
                        self.set_connection(state);
                        if !connected {
                            resync_on_connect = true;
                        } else if resync_on_connect {
                            resync_on_connect = false;
                            collection_info!(name, "reconnected", "refetching");
                            select! {
                                _ = self.shutdown.notified() => break Exit::Stopped,
                                result = self.resync() => if let Err(e) = result {
                                    collection_warn!(name, "refetch after reconnect failed", "{}", e);
                                    resync_on_connect = true;
                                },
                            }
                        }
                    }
                    None => break Exit::FeedClosed,
                },
                _ = sweep.tick() => {
                    let released = {
                        let mut reconciler = self.lock();
                        reconciler.sweep().then(|| reconciler.snapshot())
                    };
                    if let Some(snapshot) = released {
                        self.notify(snapshot, UpdateCause::Swept);
                    }
                }
            }
        };

        match exit {
            Exit::Stopped => collection_debug!(name, "feed torn down"),
            Exit::FeedClosed => {
                collection_warn!(name, "change feed closed");
                self.set_connection(ConnectionState::Disconnected);
                self.fail("change feed closed".to_string());
            }
        }
        feed.unsubscribe();
    }
}
