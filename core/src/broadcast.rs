use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};

type Listener<T> = Arc<dyn Fn(T) + Send + Sync + 'static>;

/// Fans a value out to every registered listener, synchronously.
#[derive(Clone)]
pub struct Broadcast<T>(Arc<Inner<T>>);

struct Inner<T> {
    listeners: RwLock<HashMap<usize, Listener<T>>>,
    next_id: AtomicUsize,
}

/// Keeps a listener registered. Dropping the guard unsubscribes it.
pub struct ListenerGuard<T> {
    inner: Weak<Inner<T>>,
    id: usize,
}

impl<T> std::fmt::Debug for Broadcast<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcast").field("listeners", &self.listener_count()).finish()
    }
}

impl<T: Clone> Default for Broadcast<T> {
    fn default() -> Self { Self::new() }
}

impl<T> Broadcast<T> {
    pub fn listener_count(&self) -> usize { self.0.listeners.read().expect("Failed to lock listeners").len() }
}

impl<T: Clone> Broadcast<T> {
    pub fn new() -> Self { Self(Arc::new(Inner { listeners: RwLock::new(HashMap::new()), next_id: AtomicUsize::new(0) })) }

    pub fn listen(&self, listener: impl Fn(T) + Send + Sync + 'static) -> ListenerGuard<T> {
        let id = self.0.next_id.fetch_add(1, Ordering::Relaxed);
        self.0.listeners.write().expect("Failed to lock listeners").insert(id, Arc::new(listener));
        ListenerGuard { inner: Arc::downgrade(&self.0), id }
    }

    /// Call every listener with `value`. The lock is not held while listeners run, so they may (un)subscribe.
    pub fn send(&self, value: T) {
        let listeners: Vec<Listener<T>> = self.0.listeners.read().expect("Failed to lock listeners").values().cloned().collect();
        if let Some((last, rest)) = listeners.split_last() {
            for listener in rest {
                listener(value.clone());
            }
            last(value);
        }
    }
}

impl<T> Drop for ListenerGuard<T> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.listeners.write().expect("Failed to lock listeners").remove(&self.id);
        }
    }
}
