//! Text rendering of the night list.

use std::fmt::Write;

use chrono::{DateTime, FixedOffset, Offset, Utc};

use crate::night::SleepNight;

/// Localizable strings and the offset dates are shown in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    pub title: String,
    pub start: String,
    pub end: String,
    pub quality: String,
    pub duration: String,
    pub heart_rate: String,
    pub unrated: String,
    /// Names for ratings 0 through 5.
    pub qualities: [String; 6],
    pub offset: FixedOffset,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            title: "Here is your sleep data".to_string(),
            start: "Start:".to_string(),
            end: "End:".to_string(),
            quality: "Quality:".to_string(),
            duration: "Hours:Minutes:Seconds:".to_string(),
            heart_rate: "Heart rate (min/avg/max):".to_string(),
            unrated: "--".to_string(),
            qualities: [
                "Very bad".to_string(),
                "Poor".to_string(),
                "So-so".to_string(),
                "OK".to_string(),
                "Pretty good".to_string(),
                "Excellent".to_string(),
            ],
            offset: Utc.fix(),
        }
    }
}

impl Labels {
    /// Default strings with dates shown at `offset`.
    #[must_use]
    pub fn with_offset(offset: FixedOffset) -> Self {
        Self {
            offset,
            ..Self::default()
        }
    }

    fn quality_name(&self, quality: i32) -> &str {
        usize::try_from(quality)
            .ok()
            .and_then(|index| self.qualities.get(index))
            .map_or(self.unrated.as_str(), String::as_str)
    }

    /// Renders a millisecond timestamp the way night blocks show it.
    pub fn date(&self, ms: i64) -> String {
        DateTime::from_timestamp_millis(ms).map_or_else(
            || ms.to_string(),
            |at| {
                at.with_timezone(&self.offset)
                    .format("%A %b-%d-%Y Time: %H:%M")
                    .to_string()
            },
        )
    }
}

/// Renders every night as a text block under the title.
///
/// Open nights only get a start line. An empty list renders the title alone.
pub fn format_nights(nights: &[SleepNight], labels: &Labels) -> String {
    let mut out = labels.title.clone();
    for night in nights {
        write!(out, "\n\n{} {}", labels.start, labels.date(night.start_ms)).unwrap();
        if night.is_open() {
            continue;
        }
        write!(out, "\n{} {}", labels.end, labels.date(night.end_ms)).unwrap();
        write!(
            out,
            "\n{} {}",
            labels.quality,
            labels.quality_name(night.quality)
        )
        .unwrap();
        write!(out, "\n{} {}", labels.duration, hms(night.duration_ms())).unwrap();
        if let Some(heart_rate) = night.heart_rate {
            write!(
                out,
                "\n{} {}/{}/{}",
                labels.heart_rate, heart_rate.min_bpm, heart_rate.avg_bpm, heart_rate.max_bpm
            )
            .unwrap();
        }
    }
    out
}

fn hms(duration_ms: i64) -> String {
    let seconds = duration_ms.max(0) / 1000;
    format!(
        "{}:{:02}:{:02}",
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60
    )
}
