use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use gamedb_resolver::{FIELDS, SettingSource, Settings};

use crate::CliError;

fn mask_value(s: &str) -> String {
    if s.chars().count() <= 2 {
        "****".to_string()
    } else {
        format!("{}****", s.chars().take(2).collect::<String>())
    }
}

/// Show current settings and their sources.
pub(crate) fn run_config_show(settings: &Settings, config_override: Option<&Path>) {
    let path = config_override
        .map(Path::to_path_buf)
        .or_else(gamedb_resolver::config_path);

    log::info!(
        "{}",
        "gamedb Configuration".if_supports_color(Stdout, |t| t.bold()),
    );
    crate::log_blank();

    match &path {
        Some(p) if p.exists() => {
            log::info!(
                "  Config file: {} {}",
                p.display().if_supports_color(Stdout, |t| t.cyan()),
                "(exists)".if_supports_color(Stdout, |t| t.green()),
            );
        }
        Some(p) => {
            log::info!(
                "  Config file: {} {}",
                p.display().if_supports_color(Stdout, |t| t.cyan()),
                "(not found)".if_supports_color(Stdout, |t| t.dimmed()),
            );
        }
        None => {
            log::info!(
                "  Config file: {}",
                "could not determine path".if_supports_color(Stdout, |t| t.red()),
            );
        }
    }
    crate::log_blank();

    for field in FIELDS {
        let source = settings.source_of(field.key);
        let source_str = format!("({})", source);
        let value = match (&source, settings.value_of(field.key)) {
            (SettingSource::Default, _) if field.key == "database.path" => {
                Some(settings.database.display().to_string())
            }
            (SettingSource::Default, _) if field.key == "redis.db" => Some("0".to_string()),
            (_, Some(v)) if field.secret => Some(mask_value(v)),
            (_, v) => v.map(str::to_string),
        };

        match value {
            Some(v) => {
                log::info!(
                    "  {} {} {}",
                    format!("{}:", field.key).if_supports_color(Stdout, |t| t.cyan()),
                    v,
                    source_str.if_supports_color(Stdout, |t| t.dimmed()),
                );
            }
            None => {
                log::info!(
                    "  {} {} {}",
                    format!("{}:", field.key).if_supports_color(Stdout, |t| t.cyan()),
                    "not set".if_supports_color(Stdout, |t| t.yellow()),
                    source_str.if_supports_color(Stdout, |t| t.dimmed()),
                );
            }
        }
    }
    crate::log_blank();

    log::info!("  Match thresholds:");
    log::info!("    igdb:  {:.2}", settings.thresholds.igdb);
    log::info!("    steam: {:.2}", settings.thresholds.steam);
    log::info!("    gog:   {:.2}", settings.thresholds.gog);
    log::info!(
        "  Solution store: {}",
        settings.solution_path.display(),
    );

    if settings.twitch.is_none() {
        crate::log_blank();
        log::warn!("Twitch credentials incomplete, IGDB lookups are disabled");
    }
}

/// Print the config file path.
pub(crate) fn run_config_path() -> Result<(), CliError> {
    let path = gamedb_resolver::config_path()
        .ok_or_else(|| CliError::config("Could not determine config directory"))?;
    log::info!("{}", path.display());
    Ok(())
}
