//! Stop command for ending tonight's session, optionally rating it.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use st_core::{Labels, SleepQuality};
use st_db::Database;

use super::{rate, util};

pub async fn run<W: Write>(
    writer: &mut W,
    db: Arc<Database>,
    labels: Labels,
    quality: Option<SleepQuality>,
) -> Result<()> {
    let controller = util::open_controller(Arc::clone(&db), labels.clone()).await?;

    if !*controller.stop_visible().borrow() {
        writeln!(writer, "Not tracking; nothing to stop.")?;
        return Ok(());
    }

    controller
        .on_stop_tracking()
        .await
        .context("stop task failed")?;
    util::check_failure(controller.store_failure_event())?;

    let night = controller
        .navigate_to_quality_event()
        .take()
        .context("stopped night was not reported")?;
    let id = night.id.context("stopped night has no id")?;
    writeln!(
        writer,
        "Stopped at {} after {}.",
        labels.date(night.end_ms),
        hours_minutes(night.duration_ms())
    )?;

    match quality {
        Some(quality) => rate::run(writer, db, id, quality).await,
        None => {
            writeln!(writer, "Rate it with: sleeptrack rate {id} <quality>")?;
            Ok(())
        }
    }
}

fn hours_minutes(duration_ms: i64) -> String {
    let minutes = duration_ms.max(0) / 60_000;
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}
