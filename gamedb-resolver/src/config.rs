//! Runtime settings: a TOML file under the user config directory, overridden
//! field by field by environment variables.
//!
//! ```toml
//! [twitch]
//! client_id = "..."
//! client_secret = "..."
//!
//! [redis]
//! host = "localhost"
//! port = 6379
//!
//! [matching]
//! steam_threshold = 0.85
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use gamedb_cache::RedisConfig;
use serde::Deserialize;

use crate::error::ConfigError;

/// Default similarity a candidate must reach to be accepted.
pub const DEFAULT_THRESHOLD: f64 = 0.8;

/// Accepted range for configured thresholds.
pub const THRESHOLD_RANGE: std::ops::RangeInclusive<f64> = 0.8..=0.9;

/// Twitch application credentials used for IGDB access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwitchCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Per-provider acceptance thresholds, inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub igdb: f64,
    pub steam: f64,
    pub gog: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            igdb: DEFAULT_THRESHOLD,
            steam: DEFAULT_THRESHOLD,
            gog: DEFAULT_THRESHOLD,
        }
    }
}

/// Where a setting's value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingSource {
    /// Loaded from an environment variable.
    EnvVar(&'static str),
    /// Loaded from the config file.
    ConfigFile,
    /// Built-in default value.
    Default,
    /// Not set anywhere.
    Missing,
}

impl std::fmt::Display for SettingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EnvVar(var) => write!(f, "env ${}", var),
            Self::ConfigFile => write!(f, "config file"),
            Self::Default => write!(f, "default"),
            Self::Missing => write!(f, "not set"),
        }
    }
}

/// A setting that can come from the config file or the environment.
#[derive(Debug, Clone, Copy)]
pub struct SettingField {
    /// Dotted `section.key` name in the config file.
    pub key: &'static str,
    pub env: &'static str,
    /// Masked when displayed.
    pub secret: bool,
}

pub const FIELDS: &[SettingField] = &[
    SettingField { key: "twitch.client_id", env: "TWITCH_CLIENT_ID", secret: false },
    SettingField { key: "twitch.client_secret", env: "TWITCH_CLIENT_SECRET", secret: true },
    SettingField { key: "redis.host", env: "REDIS_HOST", secret: false },
    SettingField { key: "redis.port", env: "REDIS_PORT", secret: false },
    SettingField { key: "redis.password", env: "REDIS_PASSWORD", secret: true },
    SettingField { key: "redis.db", env: "REDIS_DB_INDEX", secret: false },
    SettingField { key: "flaresolverr.url", env: "FLARESOLVERR_URL", secret: false },
    SettingField { key: "database.path", env: "GAMEDB_DATABASE", secret: false },
];

/// TOML config file format.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    twitch: Option<TwitchSection>,
    redis: Option<RedisSection>,
    flaresolverr: Option<FlareSolverrSection>,
    database: Option<DatabaseSection>,
    matching: Option<MatchingSection>,
}

#[derive(Debug, Default, Deserialize)]
struct TwitchSection {
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RedisSection {
    host: Option<String>,
    port: Option<u16>,
    password: Option<String>,
    db: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct FlareSolverrSection {
    url: Option<String>,
    solution_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabaseSection {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct MatchingSection {
    igdb_threshold: Option<f64>,
    steam_threshold: Option<f64>,
    gog_threshold: Option<f64>,
}

impl ConfigFile {
    /// Flatten into `section.key` strings so the file and the environment can
    /// be merged uniformly.
    fn values(&self) -> HashMap<&'static str, String> {
        let mut values = HashMap::new();
        let mut put = |key: &'static str, value: Option<String>| {
            if let Some(v) = value.filter(|v| !v.is_empty()) {
                values.insert(key, v);
            }
        };
        if let Some(t) = &self.twitch {
            put("twitch.client_id", t.client_id.clone());
            put("twitch.client_secret", t.client_secret.clone());
        }
        if let Some(r) = &self.redis {
            put("redis.host", r.host.clone());
            put("redis.port", r.port.map(|p| p.to_string()));
            put("redis.password", r.password.clone());
            put("redis.db", r.db.map(|d| d.to_string()));
        }
        if let Some(f) = &self.flaresolverr {
            put("flaresolverr.url", f.url.clone());
        }
        if let Some(d) = &self.database {
            put("database.path", d.path.as_ref().map(|p| p.display().to_string()));
        }
        values
    }
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// `None` disables the IGDB provider.
    pub twitch: Option<TwitchCredentials>,
    /// `None` disables caching.
    pub redis: Option<RedisConfig>,
    /// `None` disables anti-bot challenge solving.
    pub flaresolverr_url: Option<String>,
    pub database: PathBuf,
    pub solution_path: PathBuf,
    pub thresholds: Thresholds,
    values: BTreeMap<&'static str, String>,
    sources: BTreeMap<&'static str, SettingSource>,
}

impl Settings {
    /// Load from the default config file (if present) and the process
    /// environment.
    pub fn load() -> Result<Self, ConfigError> {
        let file = match config_path() {
            Some(path) if path.exists() => Some(read_config_file(&path)?),
            _ => None,
        };
        Self::from_parts(file, |var| std::env::var(var).ok())
    }

    /// Load from an explicit config file and the process environment.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let file = read_config_file(path)?;
        Self::from_parts(Some(file), |var| std::env::var(var).ok())
    }

    /// Build settings from TOML text and an environment lookup.
    pub fn from_toml_str(
        content: &str,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let file = parse_config(content, "<inline>")?;
        Self::from_parts(Some(file), env)
    }

    fn from_parts(
        file: Option<ConfigFile>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let file = file.unwrap_or_default();
        let file_values = file.values();

        let mut values = BTreeMap::new();
        let mut sources = BTreeMap::new();
        for field in FIELDS {
            if let Some(v) = env(field.env).filter(|v| !v.is_empty()) {
                values.insert(field.key, v);
                sources.insert(field.key, SettingSource::EnvVar(field.env));
            } else if let Some(v) = file_values.get(field.key) {
                values.insert(field.key, v.clone());
                sources.insert(field.key, SettingSource::ConfigFile);
            } else {
                sources.insert(field.key, SettingSource::Missing);
            }
        }

        let twitch = match (values.get("twitch.client_id"), values.get("twitch.client_secret")) {
            (Some(id), Some(secret)) => Some(TwitchCredentials {
                client_id: id.clone(),
                client_secret: secret.clone(),
            }),
            _ => None,
        };

        let redis = match (values.get("redis.host"), values.get("redis.port")) {
            (Some(host), Some(port)) => {
                let port = port.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                    var: "REDIS_PORT",
                    reason: e.to_string(),
                })?;
                let db = match values.get("redis.db") {
                    Some(db) => db.parse::<i64>().map_err(|e| ConfigError::InvalidValue {
                        var: "REDIS_DB_INDEX",
                        reason: e.to_string(),
                    })?,
                    None => {
                        sources.insert("redis.db", SettingSource::Default);
                        0
                    }
                };
                Some(RedisConfig {
                    host: host.clone(),
                    port,
                    password: values.get("redis.password").cloned(),
                    db,
                })
            }
            _ => None,
        };

        let database = match values.get("database.path") {
            Some(path) => PathBuf::from(path),
            None => {
                sources.insert("database.path", SettingSource::Default);
                default_database_path()
            }
        };

        let solution_path = file
            .flaresolverr
            .as_ref()
            .and_then(|f| f.solution_path.clone())
            .unwrap_or_else(default_solution_path);

        let mut thresholds = Thresholds::default();
        if let Some(m) = &file.matching {
            thresholds.igdb = checked_threshold(m.igdb_threshold, thresholds.igdb)?;
            thresholds.steam = checked_threshold(m.steam_threshold, thresholds.steam)?;
            thresholds.gog = checked_threshold(m.gog_threshold, thresholds.gog)?;
        }

        Ok(Self {
            twitch,
            redis,
            flaresolverr_url: values.get("flaresolverr.url").cloned(),
            database,
            solution_path,
            thresholds,
            values,
            sources,
        })
    }

    /// Where the value of `key` (a [`FIELDS`] key) came from.
    pub fn source_of(&self, key: &str) -> SettingSource {
        self.sources
            .get(key)
            .cloned()
            .unwrap_or(SettingSource::Missing)
    }

    /// Raw value of `key` as loaded from the file or environment.
    pub fn value_of(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

fn checked_threshold(value: Option<f64>, default: f64) -> Result<f64, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) if THRESHOLD_RANGE.contains(&v) => Ok(v),
        Some(v) => Err(ConfigError::InvalidValue {
            var: "matching threshold",
            reason: format!(
                "{v} is outside {}..={}",
                THRESHOLD_RANGE.start(),
                THRESHOLD_RANGE.end()
            ),
        }),
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content, &path.display().to_string())
}

fn parse_config(content: &str, path: &str) -> Result<ConfigFile, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::Parse {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

/// Return the path to the settings file.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("gamedb").join("config.toml"))
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("gamedb"))
        .unwrap_or_else(|| PathBuf::from(".gamedb"))
}

pub fn default_database_path() -> PathBuf {
    data_dir().join("gamedb.db")
}

pub fn default_solution_path() -> PathBuf {
    data_dir().join("solution.json")
}
