//! Data model types for the game catalog.
//!
//! Listings are scraped download entries; canonical records are the merged
//! game entities that reference them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Provider ────────────────────────────────────────────────────────────────

/// An external metadata catalog used to resolve game identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Igdb,
    Steam,
    Gog,
}

impl Provider {
    /// Default resolution order: IGDB, then Steam, then GOG.
    pub const ALL: [Provider; 3] = [Provider::Igdb, Provider::Steam, Provider::Gog];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Igdb => "igdb",
            Self::Steam => "steam",
            Self::Gog => "gog",
        }
    }

    /// Column holding this provider's external ID on `canonical_records`.
    pub fn id_column(&self) -> &'static str {
        match self {
            Self::Igdb => "igdb_id",
            Self::Steam => "steam_id",
            Self::Gog => "gog_id",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Unknown provider: {0}")]
pub struct UnknownProvider(pub String);

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "igdb" => Ok(Self::Igdb),
            "steam" => Ok(Self::Steam),
            "gog" => Ok(Self::Gog),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

// ── Listing ─────────────────────────────────────────────────────────────────

/// One scraped download entry from a single source site.
///
/// Identity is the source URL. `update_flag` is an optional fingerprint
/// (URL + metadata) used by crawlers to detect already-ingested entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: i64,
    pub url: String,
    pub update_flag: Option<String>,
    /// Title exactly as scraped.
    pub raw_name: String,
    /// Display title produced by the source's formatter.
    pub name: String,
    /// Content locator (magnet link or download URL).
    pub locator: String,
    pub size: String,
    /// Source label (release group or site).
    pub author: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Listing {
    /// Create an unsaved listing.
    pub fn new(url: &str, raw_name: &str, name: &str, locator: &str, author: &str) -> Self {
        Self {
            url: url.to_string(),
            raw_name: raw_name.to_string(),
            name: name.to_string(),
            locator: locator.to_string(),
            author: author.to_string(),
            ..Default::default()
        }
    }
}

/// Normalize unit suffixes in a human-entered size string (`4.2 gb` → `4.2 GB`).
pub fn normalize_size(size: &str) -> String {
    size.replace("gb", "GB").replace("mb", "MB")
}

// ── Canonical Record ────────────────────────────────────────────────────────

/// Metadata for one game as returned by a single provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordFragment {
    pub provider: Option<Provider>,
    pub external_id: u64,
    pub name: String,
    pub description: Option<String>,
    pub cover: Option<String>,
    #[serde(default)]
    pub screenshots: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub developers: Vec<String>,
    #[serde(default)]
    pub publishers: Vec<String>,
}

/// A merged, deduplicated game entity aggregating listings and provider metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Zero until the record has been saved.
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub cover: Option<String>,
    pub aliases: Vec<String>,
    pub developers: Vec<String>,
    pub publishers: Vec<String>,
    pub languages: Vec<String>,
    pub screenshots: Vec<String>,
    pub igdb_id: Option<u64>,
    pub steam_id: Option<u64>,
    pub gog_id: Option<u64>,
    /// Ordered, duplicate-free listing references.
    pub listing_ids: Vec<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl CanonicalRecord {
    /// Build an unsaved record from a provider fragment.
    pub fn from_fragment(fragment: RecordFragment) -> Self {
        let mut record = Self::default();
        record.apply_fragment(fragment);
        record
    }

    /// Replace this record's metadata with a fragment's, keeping identity,
    /// listings and other providers' IDs.
    pub fn apply_fragment(&mut self, fragment: RecordFragment) {
        if let Some(provider) = fragment.provider {
            self.set_external_id(provider, fragment.external_id);
        }
        self.name = fragment.name;
        self.description = fragment.description;
        self.cover = fragment.cover;
        self.screenshots = fragment.screenshots;
        self.aliases = fragment.aliases;
        self.languages = fragment.languages;
        self.developers = fragment.developers;
        self.publishers = fragment.publishers;
    }

    pub fn external_id(&self, provider: Provider) -> Option<u64> {
        match provider {
            Provider::Igdb => self.igdb_id,
            Provider::Steam => self.steam_id,
            Provider::Gog => self.gog_id,
        }
    }

    pub fn set_external_id(&mut self, provider: Provider, id: u64) {
        let slot = match provider {
            Provider::Igdb => &mut self.igdb_id,
            Provider::Steam => &mut self.steam_id,
            Provider::Gog => &mut self.gog_id,
        };
        *slot = Some(id);
    }

    /// Append a listing reference. Returns `false` if it was already present.
    pub fn attach_listing(&mut self, listing_id: i64) -> bool {
        if self.listing_ids.contains(&listing_id) {
            return false;
        }
        self.listing_ids.push(listing_id);
        true
    }

    /// Drop every reference in `removed`. Returns how many were dropped.
    pub fn detach_listings(&mut self, removed: &[i64]) -> usize {
        let before = self.listing_ids.len();
        self.listing_ids.retain(|id| !removed.contains(id));
        before - self.listing_ids.len()
    }
}
