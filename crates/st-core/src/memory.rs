//! In-memory [`RecordStore`].
//!
//! Nothing survives the process. Used by tests and by callers that want a
//! throwaway tracker.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;
use tokio::sync::watch;

use crate::night::SleepNight;
use crate::store::RecordStore;

/// In-memory store errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryStoreError {
    /// The store was switched into failing mode.
    #[error("memory store is failing on purpose")]
    Injected,
    /// Update called on a night that was never inserted.
    #[error("night has no id")]
    Unsaved,
    /// Update called with an id that is not stored.
    #[error("night {0} not found")]
    NotFound(i64),
}

#[derive(Debug, Default)]
struct Rows {
    next_id: i64,
    // Oldest first; published reversed.
    nights: Vec<SleepNight>,
}

/// A `Mutex`-guarded list of nights.
#[derive(Debug)]
pub struct MemoryStore {
    rows: Mutex<Rows>,
    published: watch::Sender<Vec<SleepNight>>,
    writes: AtomicUsize,
    failing: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        let (published, _) = watch::channel(Vec::new());
        Self {
            rows: Mutex::new(Rows {
                next_id: 1,
                nights: Vec::new(),
            }),
            published,
            writes: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Creates a store pre-filled with `nights`, inserted in order.
    pub fn with_nights(nights: impl IntoIterator<Item = SleepNight>) -> Self {
        let store = Self::new();
        {
            let mut rows = store.lock();
            for mut night in nights {
                night.id = Some(rows.next_id);
                rows.next_id += 1;
                rows.nights.push(night);
            }
            store.publish(&rows);
        }
        store
    }

    /// Makes every subsequent call fail with [`MemoryStoreError::Injected`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of successful writes (insert, update, clear).
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Snapshot of every stored night, newest first.
    pub fn nights(&self) -> Vec<SleepNight> {
        self.published.borrow().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Rows> {
        // A poisoned lock only means another test thread panicked mid-write.
        self.rows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn check(&self) -> Result<(), MemoryStoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MemoryStoreError::Injected);
        }
        Ok(())
    }

    fn publish(&self, rows: &Rows) {
        let newest_first: Vec<SleepNight> = rows.nights.iter().rev().cloned().collect();
        self.published.send_replace(newest_first);
    }

    fn wrote(&self, rows: &Rows) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.publish(rows);
    }
}

impl RecordStore for MemoryStore {
    type Error = MemoryStoreError;

    fn most_recent_night(&self) -> Result<Option<SleepNight>, Self::Error> {
        self.check()?;
        Ok(self.lock().nights.last().cloned())
    }

    fn insert(&self, night: &SleepNight) -> Result<i64, Self::Error> {
        self.check()?;
        let mut rows = self.lock();
        let id = rows.next_id;
        rows.next_id += 1;
        let mut stored = night.clone();
        stored.id = Some(id);
        rows.nights.push(stored);
        self.wrote(&rows);
        Ok(id)
    }

    fn update(&self, night: &SleepNight) -> Result<(), Self::Error> {
        self.check()?;
        let id = night.id.ok_or(MemoryStoreError::Unsaved)?;
        let mut rows = self.lock();
        let slot = rows
            .nights
            .iter_mut()
            .find(|stored| stored.id == Some(id))
            .ok_or(MemoryStoreError::NotFound(id))?;
        *slot = night.clone();
        self.wrote(&rows);
        Ok(())
    }

    fn get(&self, id: i64) -> Result<Option<SleepNight>, Self::Error> {
        self.check()?;
        Ok(self
            .lock()
            .nights
            .iter()
            .find(|stored| stored.id == Some(id))
            .cloned())
    }

    fn clear_all(&self) -> Result<(), Self::Error> {
        self.check()?;
        let mut rows = self.lock();
        rows.nights.clear();
        self.wrote(&rows);
        Ok(())
    }

    fn watch_nights(&self) -> watch::Receiver<Vec<SleepNight>> {
        self.published.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_assigns_increasing_ids_and_publishes_newest_first() {
        let store = MemoryStore::new();
        let rx = store.watch_nights();

        let first = store.insert(&SleepNight::open_at(10)).unwrap();
        let second = store.insert(&SleepNight::open_at(20)).unwrap();

        assert_eq!((first, second), (1, 2));
        let ids: Vec<_> = rx.borrow().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![Some(2), Some(1)]);
        assert_eq!(store.most_recent_night().unwrap().unwrap().start_ms, 20);
    }

    #[test]
    fn update_requires_a_stored_id() {
        let store = MemoryStore::new();
        assert_eq!(
            store.update(&SleepNight::open_at(1)),
            Err(MemoryStoreError::Unsaved)
        );

        let mut ghost = SleepNight::open_at(1);
        ghost.id = Some(42);
        assert_eq!(store.update(&ghost), Err(MemoryStoreError::NotFound(42)));
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn failing_mode_rejects_reads_and_writes() {
        let store = MemoryStore::with_nights([SleepNight::open_at(1)]);
        store.set_failing(true);
        assert_eq!(store.most_recent_night(), Err(MemoryStoreError::Injected));
        assert_eq!(store.clear_all(), Err(MemoryStoreError::Injected));
        assert_eq!(store.nights().len(), 1);

        store.set_failing(false);
        store.clear_all().unwrap();
        assert!(store.nights().is_empty());
    }
}
