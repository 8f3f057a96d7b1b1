//! IGDB provider (APIcalypse queries authenticated through a Twitch app token).

use std::sync::Arc;

use async_trait::async_trait;
use gamedb_cache::{CacheAside, DEFAULT_TTL};
use gamedb_catalog::{Provider, RecordFragment, clean_title};
use gamedb_fetch::{FetchClient, FetchRequest, UserAgent};
use serde::de::DeserializeOwned;

use crate::error::ResolveError;
use crate::matching::{Candidate, CandidateSearch, resolve_two_pass};
use crate::provider::{
    IdentityProvider, absolute_url, check_session_status, push_unique, refetch_while_empty,
};
use crate::session::TwitchSession;
use crate::types::{IgdbGame, IgdbImage, IgdbInvolvedCompany, IgdbLanguageSupport, IgdbNamed};

pub const IGDB_API_BASE: &str = "https://api.igdb.com/v4";

/// PC (Microsoft Windows) and PC DOS.
const PC_PLATFORMS: [u64; 2] = [6, 130];
const SEARCH_LIMIT: usize = 40;

pub struct IgdbProvider {
    fetch: Arc<FetchClient>,
    cache: Arc<CacheAside>,
    session: Arc<TwitchSession>,
    api_base: String,
    threshold: f64,
}

impl IgdbProvider {
    pub fn new(
        fetch: Arc<FetchClient>,
        cache: Arc<CacheAside>,
        session: Arc<TwitchSession>,
        threshold: f64,
    ) -> Self {
        Self {
            fetch,
            cache,
            session,
            api_base: IGDB_API_BASE.to_string(),
            threshold,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// POST an APIcalypse query. A rejected token is refreshed once.
    async fn query<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &str,
    ) -> Result<Vec<T>, ResolveError> {
        let url = format!("{}/{}", self.api_base.trim_end_matches('/'), endpoint);
        let mut relogged = false;
        loop {
            let token = self.session.token().await?;
            let request = FetchRequest::post(url.as_str())
                .raw_body("text/plain", body)
                .header("Client-ID", self.session.client_id())
                .header("Authorization", format!("Bearer {token}"))
                .user_agent(UserAgent::Omit);
            let resp = self.fetch.fetch(&request).await?;

            if matches!(resp.status, 401 | 403) && !relogged {
                log::info!("IGDB rejected the access token, logging in again");
                self.session.invalidate().await;
                relogged = true;
                continue;
            }
            check_session_status(&resp, &format!("IGDB {endpoint}"))?;
            return Ok(serde_json::from_str(resp.text())?);
        }
    }

    /// Query `endpoint` for rows, re-fetching while the first row is a
    /// placeholder.
    async fn rows<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &str,
        is_placeholder: impl Fn(&T) -> bool,
    ) -> Result<Vec<T>, ResolveError> {
        refetch_while_empty(
            &format!("IGDB {endpoint}"),
            || self.query::<T>(endpoint, body),
            |rows: &Vec<T>| rows.first().is_some_and(&is_placeholder),
        )
        .await
    }

    async fn game(&self, id: u64) -> Result<IgdbGame, ResolveError> {
        self.cache
            .get_or_fetch(&format!("igdb_game:{id}"), DEFAULT_TTL, || async {
                let rows: Vec<IgdbGame> = self
                    .rows("games", &format!("where id={id}; fields *;"), |g: &IgdbGame| {
                        g.name.is_empty()
                    })
                    .await?;
                rows.into_iter()
                    .next()
                    .ok_or_else(|| ResolveError::not_found(format!("IGDB game {id}")))
            })
            .await
    }

    async fn cover(&self, game: u64) -> Result<String, ResolveError> {
        self.cache
            .get_or_fetch(&format!("igdb_covers:{game}"), DEFAULT_TTL, || async {
                let rows: Vec<IgdbImage> = self
                    .rows("covers", &where_game(game), |i: &IgdbImage| i.url.is_empty())
                    .await?;
                rows.first()
                    .map(|i| original_size(&i.url))
                    .ok_or_else(|| ResolveError::not_found(format!("IGDB cover for {game}")))
            })
            .await
    }

    async fn screenshots(&self, game: u64) -> Result<Vec<String>, ResolveError> {
        self.cache
            .get_or_fetch(&format!("igdb_screenshots:{game}"), DEFAULT_TTL, || async {
                let rows: Vec<IgdbImage> = self
                    .rows("screenshots", &where_game(game), |i: &IgdbImage| {
                        i.url.is_empty()
                    })
                    .await?;
                non_empty(
                    rows.iter().map(|i| original_size(&i.url)).collect(),
                    format!("IGDB screenshots for {game}"),
                )
            })
            .await
    }

    async fn aliases(&self, game: u64) -> Result<Vec<String>, ResolveError> {
        self.cache
            .get_or_fetch(&format!("igdb_aliases:{game}"), DEFAULT_TTL, || async {
                let rows: Vec<IgdbNamed> = self
                    .rows("alternative_names", &where_game(game), |n: &IgdbNamed| {
                        n.name.is_empty()
                    })
                    .await?;
                let mut aliases = Vec::new();
                push_unique(&mut aliases, rows.into_iter().map(|n| n.name));
                non_empty(aliases, format!("IGDB aliases for {game}"))
            })
            .await
    }

    async fn languages(&self, game: u64) -> Result<Vec<String>, ResolveError> {
        self.cache
            .get_or_fetch(&format!("igdb_languages:{game}"), DEFAULT_TTL, || async {
                let supports: Vec<IgdbLanguageSupport> = self
                    .rows("language_supports", &where_game(game), |s: &IgdbLanguageSupport| {
                        s.language == 0
                    })
                    .await?;
                let mut ids: Vec<u64> = supports.iter().map(|s| s.language).collect();
                ids.sort_unstable();
                ids.dedup();
                if ids.is_empty() {
                    return Ok::<_, ResolveError>(Vec::new());
                }

                let list = ids
                    .iter()
                    .map(u64::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                let rows: Vec<IgdbNamed> = self
                    .query(
                        "languages",
                        &format!("where id = ({list}); fields name; limit {};", ids.len()),
                    )
                    .await?;
                let mut names = Vec::new();
                push_unique(&mut names, rows.into_iter().map(|n| n.name));
                Ok(names)
            })
            .await
    }

    async fn involved_companies(&self, game: u64) -> Result<Vec<IgdbInvolvedCompany>, ResolveError> {
        self.cache
            .get_or_fetch(
                &format!("igdb_involved_companies:{game}"),
                DEFAULT_TTL,
                || async {
                    let rows: Vec<IgdbInvolvedCompany> = self
                        .rows("involved_companies", &where_game(game), |c: &IgdbInvolvedCompany| {
                            c.company == 0
                        })
                        .await?;
                    if rows.is_empty() {
                        return Err(ResolveError::not_found(format!(
                            "IGDB involved companies for {game}"
                        )));
                    }
                    Ok(rows)
                },
            )
            .await
    }

    async fn company_name(&self, company: u64) -> Result<String, ResolveError> {
        self.cache
            .get_or_fetch(&format!("igdb_companies:{company}"), DEFAULT_TTL, || async {
                let rows: Vec<IgdbNamed> = self
                    .rows(
                        "companies",
                        &format!("where id={company}; fields *;"),
                        |n: &IgdbNamed| n.name.is_empty(),
                    )
                    .await?;
                rows.into_iter()
                    .next()
                    .map(|n| n.name)
                    .ok_or_else(|| ResolveError::not_found(format!("IGDB company {company}")))
            })
            .await
    }
}

fn where_game(game: u64) -> String {
    format!("where game={game}; fields *;")
}

/// Thumbnail URL → full-size image URL.
fn original_size(url: &str) -> String {
    absolute_url(&url.replacen("t_thumb", "t_original", 1))
}

fn non_empty(items: Vec<String>, what: String) -> Result<Vec<String>, ResolveError> {
    if items.is_empty() {
        Err(ResolveError::not_found(what))
    } else {
        Ok(items)
    }
}

/// APIcalypse search clause for a release title. Separators confuse the
/// search index and quotes would end the string literal.
pub(crate) fn search_query(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if matches!(c, ':' | '-') { ' ' } else { c })
        .filter(|&c| c != '"' && c != '\\')
        .collect();
    format!(
        "search \"{}\"; fields *; limit {};",
        clean_title(&cleaned),
        SEARCH_LIMIT
    )
}

/// Entries that list platforms must include a PC platform.
fn is_pc_candidate(game: &IgdbGame) -> bool {
    game.platforms.is_empty() || game.platforms.iter().any(|p| PC_PLATFORMS.contains(p))
}

#[async_trait]
impl CandidateSearch for IgdbProvider {
    async fn search(&self, query: &str) -> Result<Vec<Candidate>, ResolveError> {
        let games: Vec<IgdbGame> = self.query("games", &search_query(query)).await?;
        Ok(games
            .into_iter()
            .filter(is_pc_candidate)
            .map(|g| {
                let parent = g.parent();
                Candidate::new(g.id, g.name).with_parent(parent)
            })
            .collect())
    }
}

#[async_trait]
impl IdentityProvider for IgdbProvider {
    fn provider(&self) -> Provider {
        Provider::Igdb
    }

    async fn resolve_id(&self, raw_name: &str) -> Result<u64, ResolveError> {
        self.cache
            .get_or_fetch(&format!("igdb_id:{raw_name}"), DEFAULT_TTL, || {
                resolve_two_pass(self, raw_name, self.threshold)
            })
            .await
    }

    async fn fetch_detail(&self, external_id: u64) -> Result<RecordFragment, ResolveError> {
        let game = self.game(external_id).await?;
        let mut fragment = RecordFragment {
            provider: Some(Provider::Igdb),
            external_id,
            name: game.name.clone(),
            description: game.summary.clone().filter(|s| !s.is_empty()),
            ..RecordFragment::default()
        };

        match self.languages(external_id).await {
            Ok(languages) => fragment.languages = languages,
            Err(e) => log::warn!("IGDB languages for {} unavailable: {}", external_id, e),
        }

        if !game.screenshots.is_empty() {
            match self.screenshots(external_id).await {
                Ok(shots) => fragment.screenshots = shots,
                Err(e) => log::warn!("IGDB screenshots for {} unavailable: {}", external_id, e),
            }
        }

        if !game.alternative_names.is_empty() {
            match self.aliases(external_id).await {
                Ok(aliases) => fragment.aliases = aliases,
                Err(e) => log::warn!("IGDB aliases for {} unavailable: {}", external_id, e),
            }
        }

        match self.cover(external_id).await {
            Ok(cover) => fragment.cover = Some(cover),
            Err(e) => log::warn!("IGDB cover for {} unavailable: {}", external_id, e),
        }

        if !game.involved_companies.is_empty() {
            match self.involved_companies(external_id).await {
                Ok(companies) => {
                    for ic in companies.iter().filter(|c| c.developer || c.publisher) {
                        let name = match self.company_name(ic.company).await {
                            Ok(name) => name,
                            Err(e) => {
                                log::warn!("IGDB company {} unavailable: {}", ic.company, e);
                                continue;
                            }
                        };
                        if ic.developer {
                            push_unique(&mut fragment.developers, [name.clone()]);
                        }
                        if ic.publisher {
                            push_unique(&mut fragment.publishers, [name]);
                        }
                    }
                }
                Err(e) => log::warn!(
                    "IGDB involved companies for {} unavailable: {}",
                    external_id,
                    e
                ),
            }
        }

        Ok(fragment)
    }
}
