//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The quality rating was outside the 0..=5 scale.
    #[error("sleep quality must be between 0 and 5, got {value}")]
    QualityOutOfRange { value: i32 },

    /// The quality name did not match any rating.
    #[error("unknown sleep quality: {value}")]
    UnknownQuality { value: String },

    /// A heart-rate summary with min above max.
    #[error("heart rate min {min_bpm} exceeds max {max_bpm}")]
    HeartRateInverted { min_bpm: u16, max_bpm: u16 },
}

/// How well a night went, on the six-step scale used by the rating screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum SleepQuality {
    VeryBad,
    Poor,
    SoSo,
    Ok,
    PrettyGood,
    Excellent,
}

impl SleepQuality {
    /// All ratings, worst first.
    pub const ALL: [Self; 6] = [
        Self::VeryBad,
        Self::Poor,
        Self::SoSo,
        Self::Ok,
        Self::PrettyGood,
        Self::Excellent,
    ];

    /// Numeric value stored in the `quality` column.
    #[must_use]
    pub const fn value(self) -> i32 {
        match self {
            Self::VeryBad => 0,
            Self::Poor => 1,
            Self::SoSo => 2,
            Self::Ok => 3,
            Self::PrettyGood => 4,
            Self::Excellent => 5,
        }
    }

    /// Kebab-case name accepted on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VeryBad => "very-bad",
            Self::Poor => "poor",
            Self::SoSo => "so-so",
            Self::Ok => "ok",
            Self::PrettyGood => "pretty-good",
            Self::Excellent => "excellent",
        }
    }
}

impl fmt::Display for SleepQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<i32> for SleepQuality {
    type Error = ValidationError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .ok_or(ValidationError::QualityOutOfRange { value })
    }
}

impl From<SleepQuality> for i32 {
    fn from(quality: SleepQuality) -> Self {
        quality.value()
    }
}

impl std::str::FromStr for SleepQuality {
    type Err = ValidationError;

    /// Accepts either the numeric rating or its kebab-case name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(value) = s.parse::<i32>() {
            return Self::try_from(value);
        }
        Self::ALL
            .into_iter()
            .find(|quality| quality.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownQuality {
                value: s.to_string(),
            })
    }
}

/// Heart-rate summary recorded alongside a night.
///
/// Carried through the tracker untouched; only the formatter reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartRate {
    pub min_bpm: u16,
    pub max_bpm: u16,
    pub avg_bpm: u16,
}

impl HeartRate {
    /// Creates a summary after checking that min does not exceed max.
    pub const fn new(min_bpm: u16, max_bpm: u16, avg_bpm: u16) -> Result<Self, ValidationError> {
        if min_bpm > max_bpm {
            return Err(ValidationError::HeartRateInverted { min_bpm, max_bpm });
        }
        Ok(Self {
            min_bpm,
            max_bpm,
            avg_bpm,
        })
    }
}
