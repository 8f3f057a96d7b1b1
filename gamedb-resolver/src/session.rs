use std::sync::Arc;

use gamedb_fetch::{FetchClient, FetchRequest, UserAgent};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::config::TwitchCredentials;
use crate::error::ResolveError;

pub const TWITCH_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Lazily obtained Twitch app token shared by all IGDB calls.
pub struct TwitchSession {
    fetch: Arc<FetchClient>,
    credentials: TwitchCredentials,
    token_url: String,
    token: Mutex<Option<String>>,
}

impl TwitchSession {
    pub fn new(fetch: Arc<FetchClient>, credentials: TwitchCredentials) -> Self {
        Self::with_token_url(fetch, credentials, TWITCH_TOKEN_URL)
    }

    pub fn with_token_url(
        fetch: Arc<FetchClient>,
        credentials: TwitchCredentials,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            fetch,
            credentials,
            token_url: token_url.into(),
            token: Mutex::new(None),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.credentials.client_id
    }

    /// Current token, logging in first if there is none.
    pub async fn token(&self) -> Result<String, ResolveError> {
        let mut token = self.token.lock().await;
        if let Some(t) = token.as_ref() {
            return Ok(t.clone());
        }
        let fresh = self.login().await?;
        *token = Some(fresh.clone());
        Ok(fresh)
    }

    /// Drop the current token so the next call logs in again.
    pub async fn invalidate(&self) {
        *self.token.lock().await = None;
    }

    async fn login(&self) -> Result<String, ResolveError> {
        let url = format!(
            "{}?client_id={}&client_secret={}&grant_type=client_credentials",
            self.token_url,
            urlencoding::encode(&self.credentials.client_id),
            urlencoding::encode(&self.credentials.client_secret),
        );
        let resp = self
            .fetch
            .fetch(&FetchRequest::post(url).user_agent(UserAgent::Omit))
            .await?;

        if matches!(resp.status, 400 | 401 | 403) {
            return Err(ResolveError::Auth(format!(
                "Twitch login rejected (HTTP {})",
                resp.status
            )));
        }
        if !resp.is_success() {
            return Err(ResolveError::Permanent(format!(
                "Twitch login failed (HTTP {})",
                resp.status
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(resp.text())?;
        if parsed.access_token.is_empty() {
            return Err(ResolveError::Auth("Twitch returned an empty token".to_string()));
        }
        log::debug!("Obtained Twitch access token");
        Ok(parsed.access_token)
    }
}
