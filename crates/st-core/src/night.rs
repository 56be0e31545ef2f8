//! Sleep nights - one tracked session each.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::types::{HeartRate, SleepQuality};

/// Quality value stored for a night nobody has rated yet.
pub const UNRATED: i32 = -1;

/// One sleep session.
///
/// A night is open (still being tracked) while `start_ms == end_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepNight {
    /// Store-assigned identifier; `None` until the night is inserted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Start of the session, milliseconds since the Unix epoch.
    pub start_ms: i64,

    /// End of the session, milliseconds since the Unix epoch.
    pub end_ms: i64,

    /// Rating on the 0..=5 scale, or [`UNRATED`].
    #[serde(default = "unrated")]
    pub quality: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<HeartRate>,
}

const fn unrated() -> i32 {
    UNRATED
}

impl SleepNight {
    /// Creates an unsaved night that starts and ends at `now_ms`.
    #[must_use]
    pub const fn open_at(now_ms: i64) -> Self {
        Self {
            id: None,
            start_ms: now_ms,
            end_ms: now_ms,
            quality: UNRATED,
            heart_rate: None,
        }
    }

    /// Whether the night is still being tracked.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.start_ms == self.end_ms
    }

    /// Tracked duration, zero while open.
    #[must_use]
    pub const fn duration_ms(&self) -> i64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// The rating, if one was given and is on the scale.
    #[must_use]
    pub fn rating(&self) -> Option<SleepQuality> {
        SleepQuality::try_from(self.quality).ok()
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
