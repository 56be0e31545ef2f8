//! Storage layer for the sleep tracker.
//!
//! Provides persistence for sleep nights using `rusqlite`.
//!
//! # Thread Safety
//!
//! A `rusqlite::Connection` is `Send` but not `Sync`. [`Database`] keeps it
//! behind a `Mutex` so one instance can be shared (as `Arc<Database>`) with
//! the controllers, which call into it from the blocking pool.
//!
//! # Schema
//!
//! Timestamps are stored as INTEGER milliseconds since the Unix epoch. A
//! night is still being tracked while `start_time_ms = end_time_ms`.
//! `quality` is `-1` until rated. The heart-rate columns are either all set
//! or all NULL.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{Connection, OptionalExtension, Row, params};
use thiserror::Error;
use tokio::sync::watch;

use st_core::{HeartRate, RecordStore, SleepNight};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Update called on a night that was never inserted.
    #[error("night has no id; insert it first")]
    Unsaved,
    /// Update matched no row.
    #[error("night {0} not found")]
    NotFound(i64),
    /// Another thread panicked while holding the connection.
    #[error("database connection lock poisoned")]
    Poisoned,
}

impl<T> From<PoisonError<T>> for DbError {
    fn from(_: PoisonError<T>) -> Self {
        Self::Poisoned
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Mutex<Connection>,
    nights: watch::Sender<Vec<SleepNight>>,
}

const NIGHT_COLUMNS: &str =
    "id, start_time_ms, end_time_ms, quality, heart_rate_min, heart_rate_max, heart_rate_avg";

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, DbError> {
        init(&conn)?;
        let nights = list_nights(&conn)?;
        tracing::debug!(count = nights.len(), "opened sleep database");
        let (nights, _) = watch::channel(nights);
        Ok(Self {
            conn: Mutex::new(conn),
            nights,
        })
    }

    /// Lists all nights, newest first.
    pub fn list_nights(&self) -> Result<Vec<SleepNight>, DbError> {
        list_nights(&*self.lock()?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        Ok(self.conn.lock()?)
    }

    /// Re-reads the night list and publishes it to watchers.
    ///
    /// Called after a write has committed. A failed re-read is logged and
    /// watchers keep the previous list.
    fn refresh(&self, conn: &Connection) {
        match list_nights(conn) {
            Ok(nights) => {
                self.nights.send_replace(nights);
            }
            Err(e) => tracing::warn!(error = %e, "failed to refresh night list after write"),
        }
    }
}

/// Initializes the database schema.
///
/// This is idempotent - safe to call on an already-initialized database.
fn init(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "
        -- Nights table: one row per tracked sleep session
        -- start_time_ms/end_time_ms: milliseconds since the Unix epoch
        -- quality: -1 until rated, then 0..=5
        CREATE TABLE IF NOT EXISTS nights (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            start_time_ms INTEGER NOT NULL,
            end_time_ms INTEGER NOT NULL,
            quality INTEGER NOT NULL DEFAULT -1,
            heart_rate_min INTEGER,
            heart_rate_max INTEGER,
            heart_rate_avg INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_nights_start ON nights(start_time_ms);
        ",
    )?;
    Ok(())
}

fn list_nights(conn: &Connection) -> Result<Vec<SleepNight>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NIGHT_COLUMNS} FROM nights ORDER BY id DESC"
    ))?;
    let rows = stmt.query_map([], night_from_row)?;
    let mut nights = Vec::new();
    for row in rows {
        nights.push(row?);
    }
    Ok(nights)
}

fn night_from_row(row: &Row<'_>) -> rusqlite::Result<SleepNight> {
    let heart_rate_min: Option<u16> = row.get(4)?;
    let heart_rate_max: Option<u16> = row.get(5)?;
    let heart_rate_avg: Option<u16> = row.get(6)?;
    let heart_rate = match (heart_rate_min, heart_rate_max, heart_rate_avg) {
        (Some(min_bpm), Some(max_bpm), Some(avg_bpm)) => Some(HeartRate {
            min_bpm,
            max_bpm,
            avg_bpm,
        }),
        _ => None,
    };
    Ok(SleepNight {
        id: Some(row.get(0)?),
        start_ms: row.get(1)?,
        end_ms: row.get(2)?,
        quality: row.get(3)?,
        heart_rate,
    })
}

impl RecordStore for Database {
    type Error = DbError;

    fn most_recent_night(&self) -> Result<Option<SleepNight>, DbError> {
        let conn = self.lock()?;
        let night = conn
            .query_row(
                &format!("SELECT {NIGHT_COLUMNS} FROM nights ORDER BY id DESC LIMIT 1"),
                [],
                night_from_row,
            )
            .optional()?;
        Ok(night)
    }

    fn insert(&self, night: &SleepNight) -> Result<i64, DbError> {
        let conn = self.lock()?;
        let heart_rate = night.heart_rate;
        conn.execute(
            "
            INSERT INTO nights
            (start_time_ms, end_time_ms, quality, heart_rate_min, heart_rate_max, heart_rate_avg)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
            params![
                night.start_ms,
                night.end_ms,
                night.quality,
                heart_rate.map(|hr| hr.min_bpm),
                heart_rate.map(|hr| hr.max_bpm),
                heart_rate.map(|hr| hr.avg_bpm),
            ],
        )?;
        let id = conn.last_insert_rowid();
        self.refresh(&conn);
        Ok(id)
    }

    fn update(&self, night: &SleepNight) -> Result<(), DbError> {
        let id = night.id.ok_or(DbError::Unsaved)?;
        let conn = self.lock()?;
        let heart_rate = night.heart_rate;
        let changed = conn.execute(
            "
            UPDATE nights
            SET start_time_ms = ?, end_time_ms = ?, quality = ?,
                heart_rate_min = ?, heart_rate_max = ?, heart_rate_avg = ?
            WHERE id = ?
            ",
            params![
                night.start_ms,
                night.end_ms,
                night.quality,
                heart_rate.map(|hr| hr.min_bpm),
                heart_rate.map(|hr| hr.max_bpm),
                heart_rate.map(|hr| hr.avg_bpm),
                id,
            ],
        )?;
        if changed == 0 {
            return Err(DbError::NotFound(id));
        }
        self.refresh(&conn);
        Ok(())
    }

    fn get(&self, id: i64) -> Result<Option<SleepNight>, DbError> {
        let conn = self.lock()?;
        let night = conn
            .query_row(
                &format!("SELECT {NIGHT_COLUMNS} FROM nights WHERE id = ?"),
                [id],
                night_from_row,
            )
            .optional()?;
        Ok(night)
    }

    fn clear_all(&self) -> Result<(), DbError> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM nights", [])?;
        tracing::debug!(deleted, "cleared nights");
        self.refresh(&conn);
        Ok(())
    }

    fn watch_nights(&self) -> watch::Receiver<Vec<SleepNight>> {
        self.nights.subscribe()
    }
}
