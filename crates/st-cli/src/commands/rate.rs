//! Rate command for recording how well a night went.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use st_core::{QualityController, SleepQuality};
use st_db::Database;

use super::util;

pub async fn run<W: Write>(
    writer: &mut W,
    db: Arc<Database>,
    night_id: i64,
    quality: SleepQuality,
) -> Result<()> {
    let controller = QualityController::new(db, night_id);
    controller
        .on_set_quality(quality)
        .await
        .context("rating task failed")?;
    util::check_failure(controller.store_failure_event())?;

    if controller.navigate_to_tracker_event().take().is_none() {
        bail!("no night with id {night_id}");
    }
    writeln!(writer, "Rated night {night_id}: {quality}.")?;
    Ok(())
}
