use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use gamedb_import::LogProgress;
use gamedb_resolver::Settings;

use crate::CliError;

pub(crate) fn run_organize(
    settings: &Settings,
    db_path: &Path,
    limit: Option<usize>,
) -> Result<(), CliError> {
    let conn = super::open_db(db_path)?;
    let rt = super::runtime()?;

    let stats = rt.block_on(async {
        let chain = super::build_chain(settings).await?;
        gamedb_import::organize_unlinked(&conn, &chain, limit, &LogProgress)
            .await
            .map_err(CliError::from)
    })?;

    crate::log_blank();
    log::info!(
        "{}",
        "Organize Summary".if_supports_color(Stdout, |t| t.bold()),
    );
    log::info!("  Processed:      {:>8}", stats.processed);
    log::info!(
        "  New records:    {:>8}",
        stats.created.if_supports_color(Stdout, |t| t.green()),
    );
    log::info!("  Attached:       {:>8}", stats.attached);
    log::info!(
        "  Unresolved:     {:>8}",
        stats.unresolved.if_supports_color(Stdout, |t| t.yellow()),
    );
    if stats.failed > 0 {
        log::info!(
            "  Failed:         {:>8} (retry later)",
            stats.failed.if_supports_color(Stdout, |t| t.red()),
        );
    }

    Ok(())
}
