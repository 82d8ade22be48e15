//! Error types for modelrepo

use thiserror::Error;

/// Boxed error raised by an object store client
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for modelrepo
#[derive(Error, Debug)]
pub enum RepoError {
    /// The model or version does not exist in the consulted store(s)
    #[error("Model not found: {name} ({version})")]
    ModelNotFound { name: String, version: String },

    /// Version string is neither `latest` nor `v<digits>`
    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    /// Model name cannot be mapped onto a storage layout
    #[error("Invalid model name: {0}")]
    InvalidModelName(String),

    /// Error from the remote object store, carried as-is
    #[error(transparent)]
    Remote(BoxError),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RepoError {
    /// Build a not-found error for a model and requested version
    pub fn not_found(name: impl Into<String>, version: impl ToString) -> Self {
        RepoError::ModelNotFound {
            name: name.into(),
            version: version.to_string(),
        }
    }

    /// Wrap an object store client error without reinterpreting it
    pub fn remote(err: impl Into<BoxError>) -> Self {
        RepoError::Remote(err.into())
    }

    /// Whether this is the recoverable not-found condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepoError::ModelNotFound { .. })
    }
}

/// Result type for modelrepo operations
pub type RepoResult<T> = Result<T, RepoError>;

impl From<serde_json::Error> for RepoError {
    fn from(err: serde_json::Error) -> Self {
        RepoError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for RepoError {
    fn from(err: toml::de::Error) -> Self {
        RepoError::Config(err.to_string())
    }
}
