//! Start command for beginning tonight's session.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use st_core::Labels;
use st_db::Database;

use super::util;

pub async fn run<W: Write>(writer: &mut W, db: Arc<Database>, labels: Labels) -> Result<()> {
    let controller = util::open_controller(db, labels.clone()).await?;

    let tonight = controller.tonight().borrow().clone();
    if let Some(night) = tonight {
        writeln!(
            writer,
            "Already tracking since {}.",
            labels.date(night.start_ms)
        )?;
        return Ok(());
    }

    controller
        .on_start_tracking()
        .await
        .context("start task failed")?;
    util::check_failure(controller.store_failure_event())?;

    let tonight = controller.tonight().borrow().clone();
    let night = tonight.context("started night was not loaded back")?;
    tracing::debug!(night_id = ?night.id, "tonight started");
    writeln!(writer, "Tracking since {}.", labels.date(night.start_ms))?;
    Ok(())
}
