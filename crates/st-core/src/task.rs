//! Background work shared by the controllers.
//!
//! Store calls run on the blocking pool; every task a controller launches
//! runs under one cancellation token.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::store::RecordStore;

/// A store call that failed or whose blocking task died.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed: {message}")]
pub struct StoreFailure {
    pub operation: &'static str,
    pub message: String,
}

/// Runs `op` against the store on the blocking pool and waits for it.
pub(crate) async fn on_store<S, T, F>(
    store: &Arc<S>,
    operation: &'static str,
    op: F,
) -> Result<T, StoreFailure>
where
    S: RecordStore,
    T: Send + 'static,
    F: FnOnce(&S) -> Result<T, S::Error> + Send + 'static,
{
    let store = Arc::clone(store);
    match tokio::task::spawn_blocking(move || op(&store)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(StoreFailure {
            operation,
            message: err.to_string(),
        }),
        Err(join) => Err(StoreFailure {
            operation,
            message: join.to_string(),
        }),
    }
}

/// Cancellation scope for one controller.
#[derive(Debug, Default)]
pub(crate) struct TaskScope {
    cancel: CancellationToken,
}

impl TaskScope {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Spawns `work` on the current runtime. Once the scope is cancelled the
    /// task stops at its next await and publishes nothing further.
    pub(crate) fn spawn<F>(&self, name: &'static str, work: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::debug!(task = name, "task cancelled");
                }
                () = work => {}
            }
        })
    }

    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::memory::{MemoryStore, MemoryStoreError};
    use crate::night::SleepNight;

    #[tokio::test]
    async fn on_store_maps_store_errors() {
        let store = Arc::new(MemoryStore::new());
        store.set_failing(true);

        let failure = on_store(&store, "insert", |store| {
            store.insert(&SleepNight::open_at(1))
        })
        .await
        .unwrap_err();

        assert_eq!(failure.operation, "insert");
        assert_eq!(failure.message, MemoryStoreError::Injected.to_string());
        assert_eq!(
            failure.to_string(),
            "insert failed: memory store is failing on purpose"
        );
    }

    #[tokio::test]
    async fn cancelled_scope_drops_pending_work() {
        let scope = TaskScope::new();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let handle = scope.spawn("wait", async move {
            let _ = rx.await;
            panic!("work should not resume after cancellation");
        });
        scope.cancel();
        handle.await.unwrap();

        assert!(scope.is_cancelled());
        drop(tx);
    }
}
