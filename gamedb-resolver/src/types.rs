//! Wire formats of the provider APIs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ── IGDB ────────────────────────────────────────────────────────────────────

/// A `games` row. Reference fields are ids into other endpoints.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IgdbGame {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub platforms: Vec<u64>,
    #[serde(default)]
    pub parent_game: Option<u64>,
    #[serde(default)]
    pub version_parent: Option<u64>,
    #[serde(default)]
    pub cover: Option<u64>,
    #[serde(default)]
    pub screenshots: Vec<u64>,
    #[serde(default)]
    pub alternative_names: Vec<u64>,
    #[serde(default)]
    pub involved_companies: Vec<u64>,
}

impl IgdbGame {
    /// Parent entity when this entry is an edition or version of another.
    pub fn parent(&self) -> Option<u64> {
        self.parent_game.or(self.version_parent).filter(|&p| p != 0)
    }
}

/// A `covers` or `screenshots` row.
#[derive(Debug, Clone, Deserialize)]
pub struct IgdbImage {
    #[serde(default)]
    pub url: String,
}

/// Any row where only the name matters (`alternative_names`, `companies`,
/// `languages`).
#[derive(Debug, Clone, Deserialize)]
pub struct IgdbNamed {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IgdbLanguageSupport {
    #[serde(default)]
    pub language: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IgdbInvolvedCompany {
    #[serde(default)]
    pub company: u64,
    #[serde(default)]
    pub developer: bool,
    #[serde(default)]
    pub publisher: bool,
}

// ── Steam ───────────────────────────────────────────────────────────────────

/// One entry of the `appdetails` response map.
#[derive(Debug, Clone, Deserialize)]
pub struct SteamAppEnvelope {
    #[serde(default)]
    pub success: bool,
    pub data: Option<SteamAppData>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SteamAppData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub developers: Vec<String>,
    #[serde(default)]
    pub publishers: Vec<String>,
    #[serde(default)]
    pub screenshots: Vec<SteamScreenshot>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SteamScreenshot {
    pub path_full: String,
}

// ── GOG ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct GogSearch {
    #[serde(default)]
    pub products: Vec<GogProduct>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GogProduct {
    pub id: u64,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GogDetail {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<GogDescription>,
    #[serde(default)]
    pub images: Option<GogImages>,
    /// Locale code → display name.
    #[serde(default)]
    pub languages: BTreeMap<String, String>,
    #[serde(default)]
    pub screenshots: Vec<GogScreenshot>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GogDescription {
    #[serde(default)]
    pub full: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GogImages {
    #[serde(default, rename = "logo2x")]
    pub logo_2x: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GogScreenshot {
    pub formatter_template_url: String,
}
