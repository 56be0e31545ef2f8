//! Status command for showing what the tracker is doing.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use st_core::{Labels, TrackerView};
use st_db::Database;

use super::util;

pub async fn run<W: Write>(
    writer: &mut W,
    db: Arc<Database>,
    database_path: &Path,
    labels: Labels,
) -> Result<()> {
    let controller = util::open_controller(db, labels.clone()).await?;
    let view = controller.view();

    writeln!(writer, "Sleep tracker status")?;
    writeln!(writer, "Database: {}", database_path.display())?;
    match &view.tonight {
        Some(night) => writeln!(writer, "Tracking since {}", labels.date(night.start_ms))?,
        None => writeln!(writer, "Not tracking.")?,
    }
    writeln!(writer, "Available: {}", available_actions(&view))?;
    writeln!(writer)?;
    writeln!(writer, "{}", view.records_display)?;

    Ok(())
}

fn available_actions(view: &TrackerView) -> String {
    [
        ("start", view.start_visible),
        ("stop", view.stop_visible),
        ("clear", view.clear_visible),
    ]
    .into_iter()
    .filter_map(|(action, visible)| visible.then_some(action))
    .collect::<Vec<_>>()
    .join(", ")
}
