/// Errors that can occur while fetching a URL.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Timeouts, connection resets and retryable statuses once the retry
    /// budget is spent.
    #[error("Transient network error: {0}")]
    Transient(String),

    /// Failures that retrying will not fix (bad request, redirect loop,
    /// undecodable body).
    #[error("Request failed: {0}")]
    Permanent(String),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Anti-bot solver failed: {0}")]
    Solver(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() || e.is_redirect() || e.is_decode() {
            Self::Permanent(e.to_string())
        } else {
            Self::Transient(e.to_string())
        }
    }
}
