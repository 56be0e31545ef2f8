//! Shared utilities for CLI commands.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, Offset};
use st_core::{EventSlot, Labels, SessionController, StoreFailure};
use st_db::Database;

/// Default labels with dates in the machine's local offset.
pub fn local_labels() -> Labels {
    Labels::with_offset(Local::now().offset().fix())
}

/// Creates a session controller and waits for tonight to load.
pub async fn open_controller(db: Arc<Database>, labels: Labels) -> Result<SessionController<Database>> {
    let controller = SessionController::new(db, labels);
    controller.wait_loaded().await;
    check_failure(controller.store_failure_event())?;
    Ok(controller)
}

/// Turns a pending store failure into an error.
pub fn check_failure(failures: &EventSlot<StoreFailure>) -> Result<()> {
    match failures.take() {
        Some(failure) => Err(failure).context("storage operation failed"),
        None => Ok(()),
    }
}
