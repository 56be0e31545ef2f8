//! Storage capability consumed by the controllers.

use tokio::sync::watch;

use crate::night::SleepNight;

/// Persistence for sleep nights.
///
/// Methods are synchronous and may block; controllers only call them from
/// the blocking pool. Implementations must republish [`watch_nights`] after
/// every successful write.
///
/// [`watch_nights`]: RecordStore::watch_nights
pub trait RecordStore: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the night with the highest id, open or not.
    fn most_recent_night(&self) -> Result<Option<SleepNight>, Self::Error>;

    /// Inserts a night and returns its assigned id. Any id on `night` is ignored.
    fn insert(&self, night: &SleepNight) -> Result<i64, Self::Error>;

    /// Overwrites a stored night, matched by id.
    fn update(&self, night: &SleepNight) -> Result<(), Self::Error>;

    /// Looks up a single night.
    fn get(&self, id: i64) -> Result<Option<SleepNight>, Self::Error>;

    /// Deletes every night.
    fn clear_all(&self) -> Result<(), Self::Error>;

    /// All nights, newest first.
    fn watch_nights(&self) -> watch::Receiver<Vec<SleepNight>>;
}
