use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::CliError;

pub(crate) fn run_deduplicate(db_path: &Path) -> Result<(), CliError> {
    if !db_path.exists() {
        log::warn!("No database found at {}", db_path.display());
        return Ok(());
    }

    let conn = super::open_db(db_path)?;
    let stats = gamedb_import::deduplicate(&conn)
        .map_err(|e| CliError::database(format!("Deduplication failed: {}", e)))?;

    log::info!(
        "{}",
        "Deduplication Summary".if_supports_color(Stdout, |t| t.bold()),
    );
    log::info!("  Duplicate groups:  {:>8}", stats.groups);
    log::info!("  Listings removed:  {:>8}", stats.listings_removed);
    log::info!("  Records repaired:  {:>8}", stats.records_repaired);

    Ok(())
}
