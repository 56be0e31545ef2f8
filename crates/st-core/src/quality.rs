//! Rating a finished night.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::event::EventSlot;
use crate::store::RecordStore;
use crate::task::{StoreFailure, TaskScope, on_store};
use crate::types::SleepQuality;

/// Records a quality rating for one night, then asks to return to the tracker.
pub struct QualityController<S: RecordStore> {
    inner: Arc<Inner<S>>,
    scope: TaskScope,
}

struct Inner<S: RecordStore> {
    store: Arc<S>,
    night_id: i64,
    navigate_to_tracker_event: EventSlot<()>,
    store_failure_event: EventSlot<StoreFailure>,
}

impl<S: RecordStore> QualityController<S> {
    pub fn new(store: Arc<S>, night_id: i64) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                night_id,
                navigate_to_tracker_event: EventSlot::new(),
                store_failure_event: EventSlot::new(),
            }),
            scope: TaskScope::new(),
        }
    }

    pub fn night_id(&self) -> i64 {
        self.inner.night_id
    }

    /// Stores `quality` on the night and fires the navigate-to-tracker event.
    ///
    /// A night that no longer exists is logged and nothing fires.
    pub fn on_set_quality(&self, quality: SleepQuality) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        self.scope.spawn("set_quality", async move {
            if let Err(failure) = inner.set_quality(quality).await {
                tracing::error!(
                    operation = failure.operation,
                    error = %failure.message,
                    "store call failed"
                );
                inner.store_failure_event.fire(failure);
            }
        })
    }

    pub fn navigate_to_tracker_event(&self) -> &EventSlot<()> {
        &self.inner.navigate_to_tracker_event
    }

    pub fn store_failure_event(&self) -> &EventSlot<StoreFailure> {
        &self.inner.store_failure_event
    }

    pub fn done_navigating(&self) {
        self.inner.navigate_to_tracker_event.acknowledge();
    }

    pub fn dispose(&self) {
        self.scope.cancel();
    }
}

impl<S: RecordStore> Drop for QualityController<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<S: RecordStore> Inner<S> {
    async fn set_quality(&self, quality: SleepQuality) -> Result<(), StoreFailure> {
        let id = self.night_id;
        let Some(mut night) = on_store(&self.store, "get", move |store| store.get(id)).await?
        else {
            tracing::warn!(night_id = id, "night to rate no longer exists");
            return Ok(());
        };
        night.quality = quality.value();
        on_store(&self.store, "update", move |store| store.update(&night)).await?;
        tracing::info!(night_id = id, %quality, "rated night");
        self.navigate_to_tracker_event.fire(());
        Ok(())
    }
}
