//! Repository and loader trait definitions

use async_trait::async_trait;
use modelrepo_core::{RepoResult, VersionSpec, VersionTag};
use std::path::Path;
use std::sync::Arc;

/// A store that can resolve named, versioned model artifacts
#[async_trait]
pub trait ModelRepository: Send + Sync {
    /// Artifact type handed back to callers
    type Model: Send + Sync + 'static;

    /// Retrieve a model, resolving `latest` against this repository's versions
    async fn get_model(&self, name: &str, version: VersionSpec) -> RepoResult<Arc<Self::Model>>;

    /// Check whether the repository can serve the requested version
    async fn has_model(&self, name: &str, version: VersionSpec) -> RepoResult<bool>;

    /// Available versions for a model in ascending order
    async fn list_versions(&self, name: &str) -> RepoResult<Vec<VersionTag>>;

    /// Get the repository name
    fn name(&self) -> &'static str;
}

/// Turns artifact files into in-memory models and back.
///
/// Storage code only moves files around; the loader owns the format.
#[async_trait]
pub trait ModelLoader: Send + Sync + 'static {
    /// Loaded model type
    type Model: Send + Sync + 'static;

    /// Load a model from an artifact file
    async fn load(&self, path: &Path) -> RepoResult<Self::Model>;

    /// Persist a model to an artifact file, replacing any existing file
    async fn save(&self, model: &Self::Model, path: &Path) -> RepoResult<()>;
}
