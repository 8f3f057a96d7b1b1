//! Persistent map of anti-bot solutions keyed by origin.
//!
//! Solutions are stored as a JSON object on disk (`{"https://host": {...}}`),
//! reloaded at startup and rewritten whenever a new challenge is solved.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// User agent and cookies that passed a host's challenge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    pub user_agent: String,
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,
}

/// Origin-keyed solutions, optionally backed by a JSON file.
#[derive(Debug, Default)]
pub struct SolutionStore {
    path: Option<PathBuf>,
    solutions: HashMap<String, Solution>,
}

impl SolutionStore {
    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load solutions from `path`. A missing or unreadable file yields an
    /// empty store that will still be written back to `path`.
    pub fn load(path: &Path) -> Self {
        let solutions = match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(map) => map,
                Err(e) => {
                    log::warn!("Ignoring corrupt solution file {}: {}", path.display(), e);
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                log::warn!("Could not read solution file {}: {}", path.display(), e);
                HashMap::new()
            }
        };

        Self {
            path: Some(path.to_path_buf()),
            solutions,
        }
    }

    pub fn get(&self, origin: &str) -> Option<&Solution> {
        self.solutions.get(origin)
    }

    /// Record a solution for `origin`, overwriting any previous one, and
    /// persist the whole map.
    pub fn insert(&mut self, origin: &str, solution: Solution) -> Result<(), FetchError> {
        self.solutions.insert(origin.to_string(), solution);
        self.save()
    }

    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }

    fn save(&self) -> Result<(), FetchError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_string_pretty(&self.solutions)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

/// `scheme://host[:port]` for a URL, the key solutions are stored under.
pub fn origin_of(url: &str) -> Result<String, FetchError> {
    let parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let host = parsed.host_str().ok_or_else(|| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: "missing host".to_string(),
    })?;
    Ok(match parsed.port() {
        Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
        None => format!("{}://{}", parsed.scheme(), host),
    })
}
