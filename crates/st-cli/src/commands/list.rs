//! List command for printing every recorded night.

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use st_core::Labels;
use st_db::Database;

use super::util;

pub async fn run<W: Write>(
    writer: &mut W,
    db: Arc<Database>,
    labels: Labels,
    json: bool,
) -> Result<()> {
    if json {
        let nights = db.list_nights()?;
        writeln!(writer, "{}", serde_json::to_string_pretty(&nights)?)?;
        return Ok(());
    }

    let controller = util::open_controller(db, labels).await?;
    let display = controller.records_display().borrow().clone();
    writeln!(writer, "{display}")?;
    Ok(())
}
