//! Steam store provider: HTML search page plus the `appdetails` JSON API.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use gamedb_cache::{CacheAside, DEFAULT_TTL};
use gamedb_catalog::{Provider, RecordFragment};
use gamedb_fetch::{FetchClient, FetchRequest, UserAgent};
use regex::Regex;

use crate::error::ResolveError;
use crate::matching::{Candidate, CandidateSearch, resolve_two_pass};
use crate::provider::{IdentityProvider, check_status, refetch_while_empty};
use crate::types::{SteamAppData, SteamAppEnvelope};

pub const STEAM_STORE_BASE: &str = "https://store.steampowered.com";

const COVER_TEMPLATE: &str =
    "https://shared.cloudflare.steamstatic.com/store_item_assets/steam/apps/{id}/library_600x900_2x.jpg";

static APP_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"data-ds-appid="(.*?)""#).expect("static pattern"));

static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<span class="title">(.*?)</span>"#).expect("static pattern"));

pub struct SteamProvider {
    fetch: Arc<FetchClient>,
    cache: Arc<CacheAside>,
    store_base: String,
    threshold: f64,
}

impl SteamProvider {
    pub fn new(fetch: Arc<FetchClient>, cache: Arc<CacheAside>, threshold: f64) -> Self {
        Self {
            fetch,
            cache,
            store_base: STEAM_STORE_BASE.to_string(),
            threshold,
        }
    }

    pub fn with_store_base(mut self, store_base: impl Into<String>) -> Self {
        self.store_base = store_base.into();
        self
    }

    fn base(&self) -> &str {
        self.store_base.trim_end_matches('/')
    }

    async fn app_details(&self, id: u64) -> Result<SteamAppData, ResolveError> {
        self.cache
            .get_or_fetch(&format!("steam_game:{id}"), DEFAULT_TTL, || async {
                let url = format!("{}/api/appdetails?appids={}", self.base(), id);
                // The API answers `null` or an empty body when throttled.
                let body = refetch_while_empty(
                    &format!("Steam app {id}"),
                    || async {
                        let resp = self
                            .fetch
                            .fetch(&FetchRequest::get(url.as_str()).user_agent(UserAgent::Omit))
                            .await?;
                        check_status(&resp, &format!("Steam app {id}"))?;
                        Ok::<_, ResolveError>(resp.body)
                    },
                    |body: &String| matches!(body.trim(), "" | "null"),
                )
                .await?;

                let mut apps: HashMap<String, SteamAppEnvelope> = serde_json::from_str(&body)?;
                match apps.remove(&id.to_string()) {
                    Some(SteamAppEnvelope {
                        success: true,
                        data: Some(data),
                    }) => Ok(data),
                    _ => Err(ResolveError::not_found(format!("Steam app {id}"))),
                }
            })
            .await
    }
}

/// Pair app ids with titles from a store search results page.
pub(crate) fn parse_search_page(html: &str) -> Vec<Candidate> {
    let ids = APP_ID.captures_iter(html).map(|c| c[1].to_string());
    let titles = TITLE.captures_iter(html).map(|c| decode_entities(&c[1]));
    ids.zip(titles)
        .filter_map(|(id, title)| {
            // Bundles list several comma-separated ids; the first is the game.
            let first = id.split(',').next().unwrap_or_default().trim();
            first.parse::<u64>().ok().map(|id| Candidate::new(id, title))
        })
        .collect()
}

fn decode_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

fn cover_url(id: u64) -> String {
    COVER_TEMPLATE.replace("{id}", &id.to_string())
}

#[async_trait]
impl CandidateSearch for SteamProvider {
    async fn search(&self, query: &str) -> Result<Vec<Candidate>, ResolveError> {
        let url = format!("{}/search?term={}", self.base(), urlencoding::encode(query));
        let resp = self.fetch.fetch(&FetchRequest::get(url)).await?;
        check_status(&resp, "Steam search")?;
        Ok(parse_search_page(resp.text()))
    }
}

#[async_trait]
impl IdentityProvider for SteamProvider {
    fn provider(&self) -> Provider {
        Provider::Steam
    }

    async fn resolve_id(&self, raw_name: &str) -> Result<u64, ResolveError> {
        self.cache
            .get_or_fetch(&format!("steam_id:{raw_name}"), DEFAULT_TTL, || {
                resolve_two_pass(self, raw_name, self.threshold)
            })
            .await
    }

    async fn fetch_detail(&self, external_id: u64) -> Result<RecordFragment, ResolveError> {
        let data = self.app_details(external_id).await?;
        if data.name.is_empty() {
            return Err(ResolveError::DataIntegrity(format!(
                "Steam app {external_id} has no name"
            )));
        }
        Ok(RecordFragment {
            provider: Some(Provider::Steam),
            external_id,
            name: data.name,
            description: Some(data.short_description).filter(|s| !s.is_empty()),
            cover: Some(cover_url(external_id)),
            screenshots: data.screenshots.into_iter().map(|s| s.path_full).collect(),
            developers: data.developers,
            publishers: data.publishers,
            ..RecordFragment::default()
        })
    }
}
