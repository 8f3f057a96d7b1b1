use std::sync::Arc;

use gamedb_cache::CacheAside;
use gamedb_catalog::{Provider, RecordFragment};
use gamedb_fetch::FetchClient;

use crate::config::Settings;
use crate::error::ResolveError;
use crate::gog::GogProvider;
use crate::igdb::IgdbProvider;
use crate::provider::IdentityProvider;
use crate::session::TwitchSession;
use crate::steam::SteamProvider;

/// Which provider identified a title, and under which id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub provider: Provider,
    pub external_id: u64,
}

/// Providers tried in order until one identifies a title.
pub struct ResolverChain {
    providers: Vec<Box<dyn IdentityProvider>>,
}

impl ResolverChain {
    pub fn new(providers: Vec<Box<dyn IdentityProvider>>) -> Self {
        Self { providers }
    }

    /// IGDB, Steam and GOG in that order. IGDB is left out when no Twitch
    /// credentials are configured.
    pub fn from_settings(
        settings: &Settings,
        fetch: Arc<FetchClient>,
        cache: Arc<CacheAside>,
    ) -> Self {
        let mut providers: Vec<Box<dyn IdentityProvider>> = Vec::new();

        match &settings.twitch {
            Some(creds) => {
                let session = Arc::new(TwitchSession::new(fetch.clone(), creds.clone()));
                providers.push(Box::new(IgdbProvider::new(
                    fetch.clone(),
                    cache.clone(),
                    session,
                    settings.thresholds.igdb,
                )));
            }
            None => log::warn!("Twitch credentials not configured, IGDB lookups disabled"),
        }
        providers.push(Box::new(SteamProvider::new(
            fetch.clone(),
            cache.clone(),
            settings.thresholds.steam,
        )));
        providers.push(Box::new(GogProvider::new(fetch, cache, settings.thresholds.gog)));

        Self::new(providers)
    }

    pub fn providers(&self) -> impl Iterator<Item = Provider> + '_ {
        self.providers.iter().map(|p| p.provider())
    }

    fn get(&self, provider: Provider) -> Option<&dyn IdentityProvider> {
        self.providers
            .iter()
            .find(|p| p.provider() == provider)
            .map(|p| p.as_ref())
    }

    /// Try each provider in order; the first that resolves wins.
    ///
    /// If every provider reports a miss the result is `NotFound`. Otherwise
    /// the last non-miss error is returned so outages are not reported as
    /// unknown titles.
    pub async fn resolve(&self, raw_name: &str) -> Result<Resolution, ResolveError> {
        let mut last_error = None;
        for provider in &self.providers {
            match provider.resolve_id(raw_name).await {
                Ok(external_id) => {
                    log::info!(
                        "Resolved '{}' via {} (id {})",
                        raw_name,
                        provider.provider(),
                        external_id
                    );
                    return Ok(Resolution {
                        provider: provider.provider(),
                        external_id,
                    });
                }
                Err(e) if e.is_not_found() => {
                    log::debug!("{} has no match for '{}'", provider.provider(), raw_name);
                }
                Err(e) => {
                    log::warn!(
                        "{} failed to resolve '{}': {}",
                        provider.provider(),
                        raw_name,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| ResolveError::not_found(raw_name)))
    }

    pub async fn fetch_detail(
        &self,
        provider: Provider,
        external_id: u64,
    ) -> Result<RecordFragment, ResolveError> {
        let p = self.get(provider).ok_or_else(|| {
            ResolveError::Config(format!("provider {provider} is not configured"))
        })?;
        p.fetch_detail(external_id).await
    }

    /// Resolve an id only with `provider`.
    pub async fn resolve_with(
        &self,
        provider: Provider,
        raw_name: &str,
    ) -> Result<u64, ResolveError> {
        let p = self.get(provider).ok_or_else(|| {
            ResolveError::Config(format!("provider {provider} is not configured"))
        })?;
        p.resolve_id(raw_name).await
    }
}

#[cfg(test)]
#[path = "tests/chain_tests.rs"]
mod tests;
