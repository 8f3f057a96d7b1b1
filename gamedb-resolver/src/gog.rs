//! GOG provider: catalog search JSON and the public products API.

use std::sync::Arc;

use async_trait::async_trait;
use gamedb_cache::{CacheAside, DEFAULT_TTL};
use gamedb_catalog::{Provider, RecordFragment};
use gamedb_fetch::{FetchClient, FetchRequest};

use crate::error::ResolveError;
use crate::matching::{Candidate, CandidateSearch, resolve_two_pass};
use crate::provider::{IdentityProvider, absolute_url, check_status, refetch_while_empty};
use crate::types::{GogDetail, GogSearch};

pub const GOG_EMBED_BASE: &str = "https://embed.gog.com";
pub const GOG_API_BASE: &str = "https://api.gog.com";

/// Screenshot size substituted into GOG's `{formatter}` templates.
const SCREENSHOT_FORMATTER: &str = "ggvgl_2x";

pub struct GogProvider {
    fetch: Arc<FetchClient>,
    cache: Arc<CacheAside>,
    embed_base: String,
    api_base: String,
    threshold: f64,
}

impl GogProvider {
    pub fn new(fetch: Arc<FetchClient>, cache: Arc<CacheAside>, threshold: f64) -> Self {
        Self {
            fetch,
            cache,
            embed_base: GOG_EMBED_BASE.to_string(),
            api_base: GOG_API_BASE.to_string(),
            threshold,
        }
    }

    /// Point both endpoints at one server (used by tests).
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        let base = base.into();
        self.embed_base = base.clone();
        self.api_base = base;
        self
    }

    async fn product(&self, id: u64) -> Result<GogDetail, ResolveError> {
        self.cache
            .get_or_fetch(&format!("gog_app:{id}"), DEFAULT_TTL, || async {
                let url = format!(
                    "{}/products/{}?expand=description,screenshots",
                    self.api_base.trim_end_matches('/'),
                    id
                );
                let detail = refetch_while_empty(
                    &format!("GOG product {id}"),
                    || async {
                        let resp = self.fetch.fetch(&FetchRequest::get(url.as_str())).await?;
                        check_status(&resp, &format!("GOG product {id}"))?;
                        Ok::<_, ResolveError>(serde_json::from_str::<GogDetail>(resp.text())?)
                    },
                    |d: &GogDetail| d.id != 0 && d.title.is_empty(),
                )
                .await?;
                if detail.id == 0 {
                    return Err(ResolveError::not_found(format!("GOG product {id}")));
                }
                Ok(detail)
            })
            .await
    }
}

fn screenshot_url(template: &str) -> String {
    absolute_url(&template.replace("{formatter}", SCREENSHOT_FORMATTER))
}

#[async_trait]
impl CandidateSearch for GogProvider {
    async fn search(&self, query: &str) -> Result<Vec<Candidate>, ResolveError> {
        let url = format!(
            "{}/games/ajax/filtered?mediaType=game&search={}",
            self.embed_base.trim_end_matches('/'),
            urlencoding::encode(query)
        );
        let resp = self.fetch.fetch(&FetchRequest::get(url)).await?;
        check_status(&resp, "GOG search")?;
        let results: GogSearch = serde_json::from_str(resp.text())?;
        Ok(results
            .products
            .into_iter()
            .map(|p| Candidate::new(p.id, p.title))
            .collect())
    }
}

#[async_trait]
impl IdentityProvider for GogProvider {
    fn provider(&self) -> Provider {
        Provider::Gog
    }

    async fn resolve_id(&self, raw_name: &str) -> Result<u64, ResolveError> {
        self.cache
            .get_or_fetch(&format!("gog_id:{raw_name}"), DEFAULT_TTL, || {
                resolve_two_pass(self, raw_name, self.threshold)
            })
            .await
    }

    async fn fetch_detail(&self, external_id: u64) -> Result<RecordFragment, ResolveError> {
        let detail = self.product(external_id).await?;
        Ok(RecordFragment {
            provider: Some(Provider::Gog),
            external_id,
            name: detail.title,
            description: detail.description.map(|d| d.full).filter(|s| !s.is_empty()),
            cover: detail
                .images
                .map(|i| i.logo_2x)
                .filter(|s| !s.is_empty())
                .map(|s| absolute_url(&s)),
            languages: detail.languages.into_values().collect(),
            screenshots: detail
                .screenshots
                .iter()
                .map(|s| screenshot_url(&s.formatter_template_url))
                .collect(),
            ..RecordFragment::default()
        })
    }
}
