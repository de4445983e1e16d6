use std::future::Future;

use tokio::task::JoinHandle;

/// Spawn a collection's background task onto the ambient tokio runtime
pub(crate) fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(future)
}
