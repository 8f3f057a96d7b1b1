use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use gamedb_catalog::{CanonicalRecord, Provider};
use gamedb_resolver::Settings;

use crate::CliError;

pub(crate) fn run_search(
    settings: &Settings,
    db_path: &Path,
    query: &str,
    page: usize,
    page_size: usize,
) -> Result<(), CliError> {
    if !db_path.exists() {
        log::warn!("No database found at {}", db_path.display());
        log::info!("Run 'gamedb organize' after crawling to create records.");
        return Ok(());
    }

    let conn = super::open_db(db_path)?;
    let rt = super::runtime()?;

    let results = rt.block_on(async {
        let cache = super::connect_cache(settings).await;
        gamedb_import::search_records_cached(&conn, &cache, query, page, page_size)
            .await
            .map_err(|e| CliError::database(format!("Search failed: {}", e)))
    })?;

    if results.records.is_empty() {
        log::info!("No records match '{}'", query);
        return Ok(());
    }

    log::info!(
        "{} (page {}/{}, {} total)",
        format!("Records matching '{}'", query).if_supports_color(Stdout, |t| t.bold()),
        results.page,
        results.total_pages,
        results.total,
    );
    crate::log_blank();
    for record in &results.records {
        log::info!(
            "  {:>6}  {:<40}  {}",
            record.id,
            super::truncate_str(&record.name, 40),
            provider_ids(record).if_supports_color(Stdout, |t| t.dimmed()),
        );
    }

    Ok(())
}

/// "igdb:113 steam:1145360" for the IDs a record carries.
fn provider_ids(record: &CanonicalRecord) -> String {
    Provider::ALL
        .iter()
        .filter_map(|&p| record.external_id(p).map(|id| format!("{}:{}", p, id)))
        .collect::<Vec<_>>()
        .join(" ")
}
