pub(crate) mod config;
pub(crate) mod dedup;
pub(crate) mod link;
pub(crate) mod organize;
pub(crate) mod resolve;
pub(crate) mod search;

use std::path::Path;
use std::sync::Arc;

use gamedb_cache::CacheAside;
use gamedb_fetch::{FetchClient, FetchConfig, FlareSolverr};
use gamedb_resolver::{ResolverChain, Settings};
use rusqlite::Connection;

use crate::CliError;

/// Load settings from `path`, or from the default config file and the
/// environment.
pub(crate) fn load_settings(path: Option<&Path>) -> Result<Settings, CliError> {
    let settings = match path {
        Some(p) => Settings::load_from(p),
        None => Settings::load(),
    };
    settings.map_err(|e| CliError::config(e.to_string()))
}

pub(crate) fn open_db(path: &Path) -> Result<Connection, CliError> {
    gamedb_db::open_database(path).map_err(|e| {
        CliError::database(format!("Failed to open database {}: {}", path.display(), e))
    })
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::runtime(format!("Failed to create async runtime: {}", e)))
}

pub(crate) async fn connect_cache(settings: &Settings) -> Arc<CacheAside> {
    Arc::new(CacheAside::connect(settings.redis.as_ref()).await)
}

/// Build the fetch client, the cache and the provider chain from settings.
pub(crate) async fn build_chain(settings: &Settings) -> Result<ResolverChain, CliError> {
    let config = FetchConfig {
        solution_path: Some(settings.solution_path.clone()),
        ..FetchConfig::default()
    };
    let mut fetch = FetchClient::new(config)
        .map_err(|e| CliError::other(format!("Failed to build HTTP client: {}", e)))?;

    match &settings.flaresolverr_url {
        Some(url) => {
            let solver = FlareSolverr::new(url.as_str())
                .map_err(|e| CliError::config(format!("Invalid FlareSolverr URL {}: {}", url, e)))?;
            fetch = fetch.with_solver(Arc::new(solver));
        }
        None => log::debug!("FlareSolverr not configured, anti-bot challenges will fail"),
    }

    let cache = connect_cache(settings).await;
    let chain = ResolverChain::from_settings(settings, Arc::new(fetch), cache);

    let names: Vec<&str> = chain.providers().map(|p| p.as_str()).collect();
    log::debug!("Provider chain: {}", names.join(" -> "));
    Ok(chain)
}

/// Shorten `s` to at most `max` characters, ending with "..." when cut.
pub(crate) fn truncate_str(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max <= 3 {
        return s.chars().take(max).collect();
    }
    let mut out: String = s.chars().take(max - 3).collect();
    out.push_str("...");
    out
}
