//! The sleep tracker's session controller.
//!
//! Owns "tonight" (the night currently being tracked, if any), mediates the
//! start/stop/clear actions against a [`RecordStore`], and publishes the
//! fields a front end binds to as `watch` channels.
//!
//! # Execution model
//!
//! Each action spawns one task and hands back its [`JoinHandle`]. The task
//! runs its store call on the blocking pool, then publishes the result.
//! Tasks only interleave while waiting on the store. Two overlapping
//! [`on_start_tracking`] calls can therefore insert two open nights; no lock
//! serializes them.
//!
//! [`on_start_tracking`]: SessionController::on_start_tracking

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::event::EventSlot;
use crate::format::{Labels, format_nights};
use crate::night::{SleepNight, now_ms};
use crate::store::RecordStore;
use crate::task::{StoreFailure, TaskScope, on_store};

/// Point-in-time copy of everything the controller publishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerView {
    pub tonight: Option<SleepNight>,
    pub records_display: String,
    pub start_visible: bool,
    pub stop_visible: bool,
    pub clear_visible: bool,
    pub show_snackbar: bool,
    pub navigate_to_quality: Option<SleepNight>,
}

/// Mediates one tracking session between a store and a front end.
///
/// Must be created inside a Tokio runtime. Dropping the controller disposes it.
pub struct SessionController<S: RecordStore> {
    inner: Arc<Inner<S>>,
    scope: TaskScope,
}

struct Inner<S: RecordStore> {
    store: Arc<S>,
    labels: Labels,
    nights: watch::Receiver<Vec<SleepNight>>,
    tonight: watch::Sender<Option<SleepNight>>,
    start_visible: watch::Sender<bool>,
    stop_visible: watch::Sender<bool>,
    records_display: watch::Sender<String>,
    clear_visible: watch::Sender<bool>,
    loaded: watch::Sender<bool>,
    show_snackbar_event: EventSlot<()>,
    navigate_to_quality_event: EventSlot<SleepNight>,
    store_failure_event: EventSlot<StoreFailure>,
}

impl<S: RecordStore> SessionController<S> {
    /// Creates the controller and starts loading tonight in the background.
    ///
    /// The most recent night only becomes tonight if it is still open.
    pub fn new(store: Arc<S>, labels: Labels) -> Self {
        let nights = store.watch_nights();
        let initial = nights.borrow().clone();
        let inner = Arc::new(Inner {
            store,
            records_display: watch::channel(format_nights(&initial, &labels)).0,
            clear_visible: watch::channel(!initial.is_empty()).0,
            labels,
            nights,
            tonight: watch::channel(None).0,
            start_visible: watch::channel(true).0,
            stop_visible: watch::channel(false).0,
            loaded: watch::channel(false).0,
            show_snackbar_event: EventSlot::new(),
            navigate_to_quality_event: EventSlot::new(),
            store_failure_event: EventSlot::new(),
        });
        let controller = Self {
            inner,
            scope: TaskScope::new(),
        };

        let inner = Arc::clone(&controller.inner);
        controller.scope.spawn("initialize", async move {
            match inner.load_tonight().await {
                Ok(tonight) => inner.set_tonight(tonight),
                Err(failure) => inner.report(failure),
            }
            inner.loaded.send_replace(true);
            tracing::debug!("tonight loaded");
        });

        let inner = Arc::clone(&controller.inner);
        controller.scope.spawn("watch_nights", async move {
            let mut nights = inner.store.watch_nights();
            loop {
                let current = nights.borrow_and_update().clone();
                inner.publish_records(&current);
                if nights.changed().await.is_err() {
                    break;
                }
            }
        });

        controller
    }

    /// Resolves once the initial load has published, or the controller is disposed.
    pub async fn wait_loaded(&self) {
        let mut loaded = self.inner.loaded.subscribe();
        tokio::select! {
            _ = loaded.wait_for(|done| *done) => {}
            () = self.scope.cancelled() => {}
        }
    }

    /// Inserts a new open night and makes it tonight.
    pub fn on_start_tracking(&self) -> JoinHandle<()> {
        self.launch("start_tracking", Inner::start_tracking)
    }

    /// Ends tonight, persists it, and fires the navigate-to-quality event.
    ///
    /// Does nothing, and touches no storage, when nothing is being tracked.
    pub fn on_stop_tracking(&self) -> JoinHandle<()> {
        self.launch("stop_tracking", Inner::stop_tracking)
    }

    /// Deletes every night, clears tonight, and fires the snackbar event.
    pub fn on_clear(&self) -> JoinHandle<()> {
        self.launch("clear", Inner::clear)
    }

    pub fn done_showing_snackbar(&self) {
        self.inner.show_snackbar_event.acknowledge();
    }

    pub fn done_navigating(&self) {
        self.inner.navigate_to_quality_event.acknowledge();
    }

    pub fn done_reporting_failure(&self) {
        self.inner.store_failure_event.acknowledge();
    }

    /// Cancels all outstanding work. Safe to call more than once.
    ///
    /// A store write already running on the blocking pool may still land,
    /// but nothing is published afterwards.
    pub fn dispose(&self) {
        if !self.scope.is_cancelled() {
            tracing::debug!("disposing session controller");
        }
        self.scope.cancel();
    }

    pub fn is_disposed(&self) -> bool {
        self.scope.is_cancelled()
    }

    pub fn tonight(&self) -> watch::Receiver<Option<SleepNight>> {
        self.inner.tonight.subscribe()
    }

    pub fn records_display(&self) -> watch::Receiver<String> {
        self.inner.records_display.subscribe()
    }

    pub fn start_visible(&self) -> watch::Receiver<bool> {
        self.inner.start_visible.subscribe()
    }

    pub fn stop_visible(&self) -> watch::Receiver<bool> {
        self.inner.stop_visible.subscribe()
    }

    pub fn clear_visible(&self) -> watch::Receiver<bool> {
        self.inner.clear_visible.subscribe()
    }

    /// Pending after a clear until [`done_showing_snackbar`](Self::done_showing_snackbar).
    pub fn show_snackbar_event(&self) -> &EventSlot<()> {
        &self.inner.show_snackbar_event
    }

    /// Holds the stopped night until [`done_navigating`](Self::done_navigating).
    pub fn navigate_to_quality_event(&self) -> &EventSlot<SleepNight> {
        &self.inner.navigate_to_quality_event
    }

    /// Holds the latest store failure until acknowledged.
    pub fn store_failure_event(&self) -> &EventSlot<StoreFailure> {
        &self.inner.store_failure_event
    }

    /// Copies every published field.
    pub fn view(&self) -> TrackerView {
        let inner = &self.inner;
        TrackerView {
            tonight: inner.tonight.borrow().clone(),
            records_display: inner.records_display.borrow().clone(),
            start_visible: *inner.start_visible.borrow(),
            stop_visible: *inner.stop_visible.borrow(),
            clear_visible: *inner.clear_visible.borrow(),
            show_snackbar: inner.show_snackbar_event.is_pending(),
            navigate_to_quality: inner.navigate_to_quality_event.pending(),
        }
    }

    fn launch<F, Fut>(&self, operation: &'static str, action: F) -> JoinHandle<()>
    where
        F: FnOnce(Arc<Inner<S>>) -> Fut,
        Fut: Future<Output = Result<(), StoreFailure>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let work = action(Arc::clone(&inner));
        self.scope.spawn(operation, async move {
            if let Err(failure) = work.await {
                inner.report(failure);
            }
        })
    }
}

impl<S: RecordStore> Drop for SessionController<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<S: RecordStore> Inner<S> {
    async fn load_tonight(&self) -> Result<Option<SleepNight>, StoreFailure> {
        let night = on_store(&self.store, "most_recent_night", |store| {
            store.most_recent_night()
        })
        .await?;
        Ok(night.filter(SleepNight::is_open))
    }

    async fn start_tracking(self: Arc<Self>) -> Result<(), StoreFailure> {
        let night = SleepNight::open_at(now_ms());
        let id = on_store(&self.store, "insert", move |store| store.insert(&night)).await?;
        tracing::info!(night_id = id, "started tracking");
        self.sync_records();
        let tonight = self.load_tonight().await?;
        self.set_tonight(tonight);
        Ok(())
    }

    async fn stop_tracking(self: Arc<Self>) -> Result<(), StoreFailure> {
        let held = self.tonight.borrow().clone();
        let Some(mut night) = held else {
            tracing::debug!("stop requested with nothing tracked");
            return Ok(());
        };
        // A closed night must end strictly after it started.
        night.end_ms = now_ms().max(night.start_ms + 1);
        let stored = night.clone();
        on_store(&self.store, "update", move |store| store.update(&stored)).await?;
        tracing::info!(night_id = ?night.id, end_ms = night.end_ms, "stopped tracking");
        self.sync_records();
        // The held night carries its new end; tonight itself stays set.
        self.tonight.send_replace(Some(night.clone()));
        self.navigate_to_quality_event.fire(night);
        Ok(())
    }

    async fn clear(self: Arc<Self>) -> Result<(), StoreFailure> {
        on_store(&self.store, "clear_all", |store| store.clear_all()).await?;
        tracing::info!("cleared all nights");
        self.sync_records();
        self.set_tonight(None);
        self.show_snackbar_event.fire(());
        Ok(())
    }

    fn set_tonight(&self, tonight: Option<SleepNight>) {
        let tracking = tonight.is_some();
        self.tonight.send_replace(tonight);
        publish(&self.start_visible, !tracking);
        publish(&self.stop_visible, tracking);
    }

    /// Republishes derived fields from the store's current list.
    fn sync_records(&self) {
        let nights = self.nights.borrow().clone();
        self.publish_records(&nights);
    }

    fn publish_records(&self, nights: &[SleepNight]) {
        publish(&self.records_display, format_nights(nights, &self.labels));
        publish(&self.clear_visible, !nights.is_empty());
    }

    fn report(&self, failure: StoreFailure) {
        tracing::error!(
            operation = failure.operation,
            error = %failure.message,
            "store call failed"
        );
        self.store_failure_event.fire(failure);
    }
}

/// Sends `value` only if it differs from the current one.
fn publish<T: PartialEq>(tx: &watch::Sender<T>, value: T) {
    tx.send_if_modified(|current| {
        if *current == value {
            false
        } else {
            *current = value;
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Mutex, mpsc};

    use tokio::sync::mpsc as async_mpsc;

    use crate::memory::{MemoryStore, MemoryStoreError};

    /// A store whose `insert` waits for the test to release it.
    struct GatedStore {
        rows: MemoryStore,
        entered: async_mpsc::UnboundedSender<()>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl RecordStore for GatedStore {
        type Error = MemoryStoreError;

        fn most_recent_night(&self) -> Result<Option<SleepNight>, Self::Error> {
            self.rows.most_recent_night()
        }

        fn insert(&self, night: &SleepNight) -> Result<i64, Self::Error> {
            self.entered.send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
            self.rows.insert(night)
        }

        fn update(&self, night: &SleepNight) -> Result<(), Self::Error> {
            self.rows.update(night)
        }

        fn get(&self, id: i64) -> Result<Option<SleepNight>, Self::Error> {
            self.rows.get(id)
        }

        fn clear_all(&self) -> Result<(), Self::Error> {
            self.rows.clear_all()
        }

        fn watch_nights(&self) -> watch::Receiver<Vec<SleepNight>> {
            self.rows.watch_nights()
        }
    }

    fn closed_night(start_ms: i64) -> SleepNight {
        SleepNight {
            id: None,
            start_ms,
            end_ms: start_ms + 3_600_000,
            quality: 3,
            heart_rate: None,
        }
    }

    async fn loaded(store: &Arc<MemoryStore>) -> SessionController<MemoryStore> {
        let controller = SessionController::new(Arc::clone(store), Labels::default());
        controller.wait_loaded().await;
        controller
    }

    #[tokio::test]
    async fn initialize_with_empty_store_tracks_nothing() {
        let store = Arc::new(MemoryStore::new());
        let controller = loaded(&store).await;

        let view = controller.view();
        assert_eq!(view.tonight, None);
        assert!(view.start_visible);
        assert!(!view.stop_visible);
        assert!(!view.clear_visible);
        assert_eq!(view.records_display, "Here is your sleep data");
        assert!(!controller.store_failure_event().is_pending());
    }

    #[tokio::test]
    async fn initialize_ignores_a_closed_most_recent_night() {
        let store = Arc::new(MemoryStore::with_nights([
            SleepNight::open_at(1_000),
            closed_night(5_000),
        ]));
        let controller = loaded(&store).await;

        let view = controller.view();
        assert_eq!(view.tonight, None);
        assert!(view.start_visible);
        assert!(view.clear_visible);
    }

    #[tokio::test]
    async fn initialize_resumes_an_open_most_recent_night() {
        let store = Arc::new(MemoryStore::with_nights([
            closed_night(1_000),
            SleepNight::open_at(9_000_000),
        ]));
        let controller = loaded(&store).await;

        let tonight = controller.tonight().borrow().clone().unwrap();
        assert_eq!(tonight.id, Some(2));
        assert!(tonight.is_open());
        assert!(!*controller.start_visible().borrow());
        assert!(*controller.stop_visible().borrow());
    }

    #[tokio::test]
    async fn start_tracking_inserts_one_open_night_and_makes_it_tonight() {
        let store = Arc::new(MemoryStore::with_nights([closed_night(1_000)]));
        let controller = loaded(&store).await;

        controller.on_start_tracking().await.unwrap();

        let nights = store.nights();
        let open: Vec<_> = nights.iter().filter(|night| night.is_open()).collect();
        assert_eq!(open.len(), 1);
        assert_eq!(nights.len(), 2);

        let view = controller.view();
        assert_eq!(view.tonight.as_ref(), Some(open[0]));
        assert!(!view.start_visible);
        assert!(view.stop_visible);
        assert!(view.clear_visible);
    }

    #[tokio::test]
    async fn stop_tracking_closes_tonight_and_fires_navigation() {
        let store = Arc::new(MemoryStore::new());
        let controller = loaded(&store).await;
        controller.on_start_tracking().await.unwrap();
        let started = controller.tonight().borrow().clone().unwrap();

        controller.on_stop_tracking().await.unwrap();

        let stored = store.get(started.id.unwrap()).unwrap().unwrap();
        assert!(!stored.is_open());
        assert!(stored.end_ms > stored.start_ms);
        assert_eq!(stored.start_ms, started.start_ms);
        assert_eq!(controller.view().tonight, Some(stored.clone()));

        let event = controller.navigate_to_quality_event();
        assert_eq!(event.pending(), Some(stored.clone()));
        assert_eq!(event.pending(), Some(stored));

        controller.done_navigating();
        assert_eq!(controller.navigate_to_quality_event().pending(), None);
        controller.done_navigating();
        assert_eq!(controller.view().navigate_to_quality, None);
    }

    #[tokio::test]
    async fn stop_tracking_closes_a_night_started_in_the_future() {
        let future_start = now_ms() + 3_600_000;
        let store = Arc::new(MemoryStore::with_nights([SleepNight::open_at(
            future_start,
        )]));
        let controller = loaded(&store).await;

        controller.on_stop_tracking().await.unwrap();

        let stored = store.get(1).unwrap().unwrap();
        assert!(!stored.is_open());
        assert_eq!(stored.end_ms, future_start + 1);

        // A fresh controller must not pick the stopped night back up.
        drop(controller);
        let reopened = loaded(&store).await;
        assert_eq!(reopened.view().tonight, None);
    }

    #[tokio::test]
    async fn stop_tracking_without_tonight_writes_nothing() {
        let store = Arc::new(MemoryStore::with_nights([closed_night(1_000)]));
        let controller = loaded(&store).await;
        let writes_before = store.write_count();

        controller.on_stop_tracking().await.unwrap();

        assert_eq!(store.write_count(), writes_before);
        assert!(!controller.navigate_to_quality_event().is_pending());
    }

    #[tokio::test]
    async fn clear_empties_store_and_fires_snackbar() {
        let store = Arc::new(MemoryStore::with_nights([
            closed_night(1_000),
            SleepNight::open_at(9_000_000),
        ]));
        let controller = loaded(&store).await;
        assert!(controller.view().stop_visible);

        controller.on_clear().await.unwrap();

        assert!(store.nights().is_empty());
        let view = controller.view();
        assert_eq!(view.tonight, None);
        assert!(!view.clear_visible);
        assert!(view.start_visible);
        assert!(!view.stop_visible);
        assert!(view.show_snackbar);

        controller.done_showing_snackbar();
        assert!(!controller.show_snackbar_event().is_pending());
        controller.done_showing_snackbar();
        assert!(!controller.show_snackbar_event().is_pending());
    }

    #[tokio::test]
    async fn visibility_flags_stay_complementary() {
        let store = Arc::new(MemoryStore::new());
        let controller = loaded(&store).await;

        let check = |controller: &SessionController<MemoryStore>| {
            let view = controller.view();
            assert_eq!(view.start_visible, view.tonight.is_none());
            assert_eq!(view.stop_visible, view.tonight.is_some());
        };

        check(&controller);
        controller.on_start_tracking().await.unwrap();
        check(&controller);
        controller.on_clear().await.unwrap();
        check(&controller);
    }

    #[tokio::test]
    async fn records_display_follows_external_writes() {
        let store = Arc::new(MemoryStore::new());
        let controller = loaded(&store).await;
        let mut display = controller.records_display();

        store.insert(&closed_night(1_700_000_000_000)).unwrap();

        display.changed().await.unwrap();
        assert!(display.borrow().contains("Start: Tuesday Nov-14-2023"));
        assert!(*controller.clear_visible().borrow());
    }

    #[tokio::test]
    async fn store_failures_fire_the_failure_event() {
        let store = Arc::new(MemoryStore::new());
        let controller = loaded(&store).await;
        store.set_failing(true);

        controller.on_start_tracking().await.unwrap();

        let failure = controller.store_failure_event().pending().unwrap();
        assert_eq!(failure.operation, "insert");
        assert_eq!(controller.view().tonight, None);

        controller.done_reporting_failure();
        assert!(!controller.store_failure_event().is_pending());
    }

    #[tokio::test]
    async fn failed_initial_load_still_completes_loading() {
        let store = Arc::new(MemoryStore::new());
        store.set_failing(true);
        let controller = loaded(&store).await;

        let failure = controller.store_failure_event().pending().unwrap();
        assert_eq!(failure.operation, "most_recent_night");
    }

    #[tokio::test]
    async fn dispose_cancels_outstanding_work() {
        let store = Arc::new(MemoryStore::new());
        let controller = loaded(&store).await;

        controller.dispose();
        controller.dispose();
        assert!(controller.is_disposed());

        controller.on_start_tracking().await.unwrap();
        controller.on_clear().await.unwrap();

        assert!(store.nights().is_empty());
        assert_eq!(store.write_count(), 0);
        assert!(!controller.show_snackbar_event().is_pending());
        controller.wait_loaded().await;
    }

    #[tokio::test]
    async fn dispose_discards_the_result_of_a_running_store_call() {
        let (entered_tx, mut entered) = async_mpsc::unbounded_channel();
        let (release, release_rx) = mpsc::channel();
        let store = Arc::new(GatedStore {
            rows: MemoryStore::new(),
            entered: entered_tx,
            release: Mutex::new(release_rx),
        });
        let controller = SessionController::new(Arc::clone(&store), Labels::default());
        controller.wait_loaded().await;

        let handle = controller.on_start_tracking();
        entered.recv().await.unwrap();
        controller.dispose();
        release.send(()).unwrap();
        handle.await.unwrap();

        // The insert itself still lands.
        let mut nights = store.watch_nights();
        nights.wait_for(|nights| nights.len() == 1).await.unwrap();
        tokio::task::yield_now().await;

        let view = controller.view();
        assert_eq!(view.tonight, None);
        assert!(view.start_visible);
        assert!(!view.stop_visible);
        assert!(!view.clear_visible);
        assert_eq!(view.records_display, "Here is your sleep data");
        assert!(!controller.store_failure_event().is_pending());
        assert!(!controller.navigate_to_quality_event().is_pending());
    }
}
