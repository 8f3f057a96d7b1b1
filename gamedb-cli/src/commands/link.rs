use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use gamedb_catalog::Provider;
use gamedb_import::LinkOutcome;
use gamedb_resolver::Settings;

use crate::CliError;

/// Manually attach a listing to the record for `provider`/`external_id`.
pub(crate) fn run_link(
    settings: &Settings,
    db_path: &Path,
    listing_id: i64,
    provider: Provider,
    external_id: u64,
) -> Result<(), CliError> {
    let conn = super::open_db(db_path)?;
    let rt = super::runtime()?;

    let outcome = rt.block_on(async {
        let chain = super::build_chain(settings).await?;
        gamedb_import::link_listing(&conn, &chain, listing_id, provider, external_id)
            .await
            .map_err(CliError::from)
    })?;

    match outcome {
        LinkOutcome::Created(record_id) => log::info!(
            "Listing {} linked to {} record {} ({} {})",
            listing_id,
            "new".if_supports_color(Stdout, |t| t.green()),
            record_id,
            provider,
            external_id,
        ),
        LinkOutcome::Attached(record_id) => log::info!(
            "Listing {} linked to record {} ({} {})",
            listing_id,
            record_id,
            provider,
            external_id,
        ),
    }
    Ok(())
}

/// Rebuild a record's metadata from a provider.
pub(crate) fn run_refresh(
    settings: &Settings,
    db_path: &Path,
    record_id: i64,
    provider: Provider,
    external_id: u64,
) -> Result<(), CliError> {
    let conn = super::open_db(db_path)?;
    let rt = super::runtime()?;

    let record = rt.block_on(async {
        let chain = super::build_chain(settings).await?;
        gamedb_import::refresh_record(&conn, &chain, record_id, provider, external_id)
            .await
            .map_err(CliError::from)
    })?;

    log::info!(
        "Record {} refreshed from {}: {}",
        record.id,
        provider.if_supports_color(Stdout, |t| t.cyan()),
        record.name.if_supports_color(Stdout, |t| t.bold()),
    );
    log::info!("  Listings kept: {}", record.listing_ids.len());
    Ok(())
}
