use thiserror::Error;

/// Errors that can occur during CLI command execution.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Runtime creation or async error
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Provider lookup failed
    #[error("Resolve error: {0}")]
    Resolve(String),

    /// Catch-all for other errors
    #[error("{0}")]
    Other(String),
}

impl CliError {
    pub(crate) fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub(crate) fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    pub(crate) fn resolve(msg: impl Into<String>) -> Self {
        Self::Resolve(msg.into())
    }

    pub(crate) fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

impl From<gamedb_import::IngestError> for CliError {
    fn from(e: gamedb_import::IngestError) -> Self {
        use gamedb_import::IngestError;
        match e {
            IngestError::Db(e) => Self::database(e.to_string()),
            IngestError::Resolve(e) => Self::resolve(e.to_string()),
            other => Self::other(other.to_string()),
        }
    }
}
