//! Clear command for deleting every recorded night.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use st_core::Labels;
use st_db::Database;

use super::util;

/// Shown once the snackbar event fires.
const CLEARED_MESSAGE: &str = "All your data is gone forever.";

pub async fn run<W: Write>(writer: &mut W, db: Arc<Database>, labels: Labels) -> Result<()> {
    let controller = util::open_controller(db, labels).await?;

    if !*controller.clear_visible().borrow() {
        writeln!(writer, "Nothing to clear.")?;
        return Ok(());
    }

    controller.on_clear().await.context("clear task failed")?;
    util::check_failure(controller.store_failure_event())?;

    if controller.show_snackbar_event().is_pending() {
        writeln!(writer, "{CLEARED_MESSAGE}")?;
        controller.done_showing_snackbar();
    }
    Ok(())
}
