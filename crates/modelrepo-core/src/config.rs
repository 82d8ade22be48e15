//! Configuration types for modelrepo

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{RepoError, RepoResult};

/// Top-level repository configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Which store composition to build
    pub repository: RepositorySettings,
    /// Local storage configuration
    pub storage: StorageConfig,
    /// Remote object store configuration
    pub remote: RemoteConfig,
    /// API server configuration
    pub api: ApiConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl RepositoryConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> RepoResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RepoError::Config(format!("Failed to read config file: {}", e)))?;
        toml::from_str(&content)
            .map_err(|e| RepoError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Reject settings the chosen composition cannot run with
    pub fn validate(&self) -> RepoResult<()> {
        if self.storage.memory_cache_capacity == Some(0) {
            return Err(RepoError::Config(
                "storage.memory_cache_capacity must be at least 1".to_string(),
            ));
        }
        if self.storage.artifact_filename.is_empty() {
            return Err(RepoError::Config(
                "storage.artifact_filename must not be empty".to_string(),
            ));
        }

        if self.repository.kind.uses_remote() {
            if self.remote.bucket.is_empty() {
                return Err(RepoError::Config("remote.bucket must not be empty".to_string()));
            }
            if self.remote.environment.is_empty() || self.remote.environment.contains('/') {
                return Err(RepoError::Config(format!(
                    "remote.environment is not a valid namespace: '{}'",
                    self.remote.environment
                )));
            }
            if self.remote.backend == ObjectStoreBackend::Filesystem
                && self.remote.endpoint.as_deref().map_or(true, str::is_empty)
            {
                return Err(RepoError::Config(
                    "remote.endpoint must name the bucket root directory for the filesystem backend"
                        .to_string(),
                ));
            }
            if self.remote.backend == ObjectStoreBackend::S3 && self.remote.region.is_empty() {
                return Err(RepoError::Config("remote.region must not be empty".to_string()));
            }
        }

        Ok(())
    }
}

/// Store composition selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryKind {
    /// Local disk only
    Local,
    /// Remote object store only
    #[serde(alias = "s3")]
    Remote,
    /// Local over remote, promoting remote fetches
    #[default]
    Caching,
}

impl RepositoryKind {
    /// Whether this composition talks to the remote tier
    pub fn uses_remote(&self) -> bool {
        matches!(self, RepositoryKind::Remote | RepositoryKind::Caching)
    }
}

impl std::fmt::Display for RepositoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepositoryKind::Local => write!(f, "local"),
            RepositoryKind::Remote => write!(f, "remote"),
            RepositoryKind::Caching => write!(f, "caching"),
        }
    }
}

impl FromStr for RepositoryKind {
    type Err = RepoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(RepositoryKind::Local),
            "remote" | "s3" => Ok(RepositoryKind::Remote),
            "caching" => Ok(RepositoryKind::Caching),
            other => Err(RepoError::Config(format!("Unknown repository kind: {}", other))),
        }
    }
}

/// Repository composition settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositorySettings {
    /// Composition to construct
    pub kind: RepositoryKind,
    /// Models fetched at startup so the first request is served locally
    pub prefetch: Vec<String>,
}

/// Local storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base directory; artifacts live at `<models_path>/<name>/<version>/<artifact_filename>`
    pub models_path: PathBuf,
    /// Conventional artifact filename inside a version directory
    pub artifact_filename: String,
    /// Maximum number of artifacts held in memory; `None` keeps every loaded artifact
    pub memory_cache_capacity: Option<usize>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            models_path: PathBuf::from("./models"),
            artifact_filename: "model.h5".to_string(),
            memory_cache_capacity: None,
        }
    }
}

/// Object store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ObjectStoreBackend {
    /// Amazon S3 or an S3-compatible service
    #[default]
    S3,
    /// JSON object API over HTTP
    #[serde(alias = "gcs")]
    Http,
    /// Directory tree standing in for a bucket
    Filesystem,
}

/// Remote object store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Backend implementation
    pub backend: ObjectStoreBackend,
    /// Custom endpoint URL (s3, http) or root directory (filesystem)
    pub endpoint: Option<String>,
    /// Bucket holding the models
    pub bucket: String,
    /// Deployment namespace prefixed to every key (e.g., "development", "production")
    pub environment: String,
    /// Suffix identifying artifact objects
    pub artifact_suffix: String,
    /// Region of the S3 bucket
    pub region: String,
    /// Static S3 access key; the standard AWS environment is used when absent
    pub access_key_id: Option<String>,
    /// Static S3 secret key
    pub secret_access_key: Option<String>,
    /// Optional bearer token for the HTTP backend
    pub access_token: Option<String>,
    /// Request timeout in seconds for the HTTP backend
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            backend: ObjectStoreBackend::S3,
            endpoint: None,
            bucket: "models".to_string(),
            environment: "development".to_string(),
            artifact_suffix: ".h5".to_string(),
            region: "us-east-2".to_string(),
            access_key_id: None,
            secret_access_key: None,
            access_token: None,
            timeout_secs: 300,
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Address to bind the REST API server
    pub address: String,
    /// Port for the REST API server
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json or text)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}
