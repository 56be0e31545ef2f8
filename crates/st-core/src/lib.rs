//! Core domain logic for the sleep tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Nights: the tracked sessions and their ratings
//! - Storage: the [`RecordStore`] capability and an in-memory implementation
//! - Controllers: starting, stopping, clearing and rating nights
//! - Formatting: the text rendering of the night list

pub mod controller;
pub mod event;
pub mod format;
pub mod memory;
pub mod night;
pub mod quality;
pub mod store;
mod task;
pub mod types;

pub use controller::{SessionController, TrackerView};
pub use event::EventSlot;
pub use format::{Labels, format_nights};
pub use memory::{MemoryStore, MemoryStoreError};
pub use night::{SleepNight, UNRATED, now_ms};
pub use quality::QualityController;
pub use store::RecordStore;
pub use task::StoreFailure;
pub use types::{HeartRate, SleepQuality, ValidationError};
