use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::Duration;

use crate::error::FetchError;
use crate::solutions::Solution;

/// Resolves an anti-bot challenge for an origin (`scheme://host`) into a
/// reusable solution.
#[async_trait]
pub trait ChallengeSolver: Send + Sync {
    async fn solve(&self, origin: &str) -> Result<Solution, FetchError>;
}

/// Maximum time the solver browser may spend on one challenge, in ms.
const MAX_SOLVE_TIMEOUT_MS: u64 = 120_000;

/// Longest part of an unparseable solver reply kept in the error message.
const SNIPPET_CHARS: usize = 200;

/// Client for a FlareSolverr instance.
pub struct FlareSolverr {
    http: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct SolverResponse {
    status: String,
    #[serde(default)]
    message: String,
    solution: Option<SolverSolution>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SolverSolution {
    user_agent: String,
    #[serde(default)]
    cookies: Vec<SolverCookie>,
}

#[derive(Debug, Deserialize)]
struct SolverCookie {
    name: String,
    value: String,
}

impl FlareSolverr {
    /// `endpoint` is the full API URL, e.g. `http://localhost:8191/v1`.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            // Leave headroom over the browser-side limit.
            .timeout(Duration::from_millis(MAX_SOLVE_TIMEOUT_MS + 10_000))
            .build()
            .map_err(|e| FetchError::Solver(format!("failed to build solver client: {e}")))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl ChallengeSolver for FlareSolverr {
    async fn solve(&self, origin: &str) -> Result<Solution, FetchError> {
        let body = serde_json::json!({
            "cmd": "request.get",
            "url": origin,
            "maxTimeout": MAX_SOLVE_TIMEOUT_MS,
        });

        let resp = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| FetchError::Solver(e.to_string()))?;
        let text = resp
            .text()
            .await
            .map_err(|e| FetchError::Solver(e.to_string()))?;

        let parsed: SolverResponse = serde_json::from_str(&text).map_err(|e| {
            FetchError::Solver(format!(
                "unexpected solver response: {e}. Response: {}",
                snippet(&text)
            ))
        })?;

        if parsed.status != "ok" {
            return Err(FetchError::Solver(format!(
                "solver returned status '{}': {}",
                parsed.status, parsed.message
            )));
        }
        let solution = parsed
            .solution
            .ok_or_else(|| FetchError::Solver("solver response has no solution".to_string()))?;

        let cookies: BTreeMap<String, String> = solution
            .cookies
            .into_iter()
            .map(|c| (c.name, c.value))
            .collect();
        log::debug!("Solver returned {} cookies for {}", cookies.len(), origin);

        Ok(Solution {
            user_agent: solution.user_agent,
            cookies,
        })
    }
}

fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_CHARS).collect()
}
