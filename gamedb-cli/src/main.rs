//! gamedb CLI
//!
//! Command-line interface for organizing scraped game listings into
//! canonical records.

mod cli_types;
mod commands;
mod error;

use std::io::Write;

use clap::Parser;

use cli_types::{Cli, Commands, ConfigAction};
pub(crate) use error::CliError;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    if let Err(e) = run(cli) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let settings = commands::load_settings(cli.config.as_deref())?;
    let db_path = cli.db.unwrap_or_else(|| settings.database.clone());

    match cli.command {
        Commands::Organize { limit } => commands::organize::run_organize(&settings, &db_path, limit),
        Commands::Deduplicate => commands::dedup::run_deduplicate(&db_path),
        Commands::Resolve { name } => commands::resolve::run_resolve(&settings, &name),
        Commands::Link {
            listing,
            provider,
            id,
        } => commands::link::run_link(&settings, &db_path, listing, provider, id),
        Commands::Refresh {
            record,
            provider,
            id,
        } => commands::link::run_refresh(&settings, &db_path, record, provider, id),
        Commands::Search {
            query,
            page,
            page_size,
        } => commands::search::run_search(&settings, &db_path, &query, page, page_size),
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                commands::config::run_config_show(&settings, cli.config.as_deref());
                Ok(())
            }
            ConfigAction::Path => commands::config::run_config_path(),
        },
    }
}

/// Install the logger. Normal output goes through `log::info!`, so info lines
/// are printed bare unless `--verbose` asks for the full format.
fn init_logging(quiet: bool, verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else if quiet {
        log::LevelFilter::Warn
    } else {
        log::LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(log::LevelFilter::Warn)
        .filter_module("gamedb", level)
        .target(env_logger::Target::Stdout)
        .parse_default_env();

    if !verbose {
        builder.format(|buf, record| match record.level() {
            log::Level::Info => writeln!(buf, "{}", record.args()),
            level => writeln!(buf, "{}: {}", level, record.args()),
        });
    }
    builder.init();
}

/// Print an empty line through the logger.
pub(crate) fn log_blank() {
    log::info!("");
}
