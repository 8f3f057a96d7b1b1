use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::Duration;

use crate::error::FetchError;
use crate::request::{Body, FetchRequest, FetchResponse, UserAgent};
use crate::solutions::{Solution, SolutionStore, origin_of};
use crate::solver::ChallengeSolver;

/// Browser-like agent sent when a request does not override it.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Statuses worth retrying with backoff.
const RETRYABLE_STATUSES: [u16; 5] = [500, 502, 503, 504, 429];

#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Upper bound for a single attempt.
    pub timeout: Duration,
    /// Delay before the first retry; doubles on every following one.
    pub base_backoff: Duration,
    pub default_user_agent: String,
    /// Where learned anti-bot solutions are persisted. `None` keeps them in
    /// memory only.
    pub solution_path: Option<PathBuf>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            base_backoff: Duration::from_secs(1),
            default_user_agent: DEFAULT_USER_AGENT.to_string(),
            solution_path: None,
        }
    }
}

/// Delay before retry number `attempt` (0-based).
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

/// HTTP client with bounded retries, exponential backoff and anti-bot
/// challenge handling.
pub struct FetchClient {
    http: reqwest::Client,
    config: FetchConfig,
    solver: Option<Arc<dyn ChallengeSolver>>,
    solutions: Arc<Mutex<SolutionStore>>,
}

impl FetchClient {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FetchError::Permanent(format!("failed to build HTTP client: {e}")))?;

        let solutions = match &config.solution_path {
            Some(path) => SolutionStore::load(path),
            None => SolutionStore::in_memory(),
        };

        Ok(Self {
            http,
            config,
            solver: None,
            solutions: Arc::new(Mutex::new(solutions)),
        })
    }

    pub fn with_solver(mut self, solver: Arc<dyn ChallengeSolver>) -> Self {
        self.solver = Some(solver);
        self
    }

    pub fn with_solutions(mut self, store: SolutionStore) -> Self {
        self.solutions = Arc::new(Mutex::new(store));
        self
    }

    /// Issue `request`, retrying transient failures.
    ///
    /// A non-2xx status that is not retryable is returned as a response so
    /// callers can inspect it. When the response is an anti-bot challenge and
    /// a solver is configured, the solver runs once and the request is
    /// re-issued once with the learned solution.
    pub async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let origin = origin_of(&request.url)?;
        let response = self.fetch_with_retries(request, &origin).await?;

        if !response.is_challenge() {
            return Ok(response);
        }
        let Some(solver) = &self.solver else {
            log::warn!("Challenge from {} but no solver is configured", origin);
            return Ok(response);
        };

        log::info!("Solving anti-bot challenge for {}", origin);
        let solution = solver.solve(&origin).await?;
        self.solutions.lock().await.insert(&origin, solution)?;

        self.fetch_with_retries(request, &origin).await
    }

    async fn fetch_with_retries(
        &self,
        request: &FetchRequest,
        origin: &str,
    ) -> Result<FetchResponse, FetchError> {
        let solution = self.solutions.lock().await.get(origin).cloned();
        let mut attempt = 0;

        loop {
            let result = self.send_once(request, solution.as_ref()).await;
            let exhausted = attempt >= request.retries;

            match result {
                Ok(response) if is_retryable_status(response.status) => {
                    if exhausted {
                        return Err(FetchError::Transient(format!(
                            "{} returned {} after {} attempts",
                            request.url,
                            response.status,
                            attempt + 1
                        )));
                    }
                    log::debug!(
                        "{} returned {}, retrying (attempt {})",
                        request.url,
                        response.status,
                        attempt + 1
                    );
                }
                Ok(response) => {
                    if !response.is_success() {
                        log::warn!("{} returned status {}", request.url, response.status);
                    }
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && !exhausted => {
                    log::debug!("{} failed: {}, retrying (attempt {})", request.url, e, attempt + 1);
                }
                Err(e) => return Err(e),
            }

            tokio::time::sleep(backoff_delay(self.config.base_backoff, attempt)).await;
            attempt += 1;
        }
    }

    async fn send_once(
        &self,
        request: &FetchRequest,
        solution: Option<&Solution>,
    ) -> Result<FetchResponse, FetchError> {
        let mut builder = self.http.request(request.method.into(), &request.url);

        let user_agent = match &request.user_agent {
            UserAgent::Omit => None,
            UserAgent::Custom(ua) if ua.is_empty() => None,
            UserAgent::Custom(ua) => Some(ua.as_str()),
            UserAgent::Default => Some(
                solution
                    .map(|s| s.user_agent.as_str())
                    .filter(|ua| !ua.is_empty())
                    .unwrap_or(&self.config.default_user_agent),
            ),
        };
        if let Some(ua) = user_agent {
            builder = builder.header(reqwest::header::USER_AGENT, ua);
        }

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let mut cookies: Vec<String> = request
            .cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        if let Some(solution) = solution {
            for (k, v) in &solution.cookies {
                if !request.cookies.iter().any(|(name, _)| name == k) {
                    cookies.push(format!("{k}={v}"));
                }
            }
        }
        if !cookies.is_empty() {
            builder = builder.header(reqwest::header::COOKIE, cookies.join("; "));
        }

        builder = match &request.body {
            None => builder,
            Some(Body::Json(value)) => builder.json(value),
            Some(Body::Form(pairs)) => builder.form(pairs),
            Some(Body::Raw { content_type, data }) => builder
                .header(reqwest::header::CONTENT_TYPE, content_type.as_str())
                .body(data.clone()),
        };

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let headers: HashMap<String, String> = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_lowercase(), v.to_string()))
            })
            .collect();
        // Honors the charset declared in Content-Type.
        let body = resp.text().await?;

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}
