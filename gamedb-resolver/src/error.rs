use gamedb_fetch::FetchError;

/// Errors that can occur while resolving a title against a provider catalog.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Transient provider error: {0}")]
    Transient(String),

    #[error("Provider request failed: {0}")]
    Permanent(String),

    #[error("No confident match for '{name}'")]
    NotFound { name: String },

    #[error("Provider rejected credentials: {0}")]
    Auth(String),

    #[error("Provider kept returning incomplete data: {0}")]
    DataIntegrity(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ResolveError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<FetchError> for ResolveError {
    fn from(e: FetchError) -> Self {
        if e.is_retryable() {
            Self::Transient(e.to_string())
        } else {
            Self::Permanent(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ResolveError {
    fn from(e: serde_json::Error) -> Self {
        Self::Permanent(format!("malformed provider response: {e}"))
    }
}

/// Errors from loading [`Settings`](crate::config::Settings).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },

    #[error("Could not determine config directory")]
    NoConfigDir,
}
