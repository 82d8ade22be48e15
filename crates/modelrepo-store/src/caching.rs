//! Caching repository
//!
//! Tiers the local store over a remote repository. Reads prefer the local
//! tier; a local miss fetches from the remote tier and saves the artifact
//! locally so the next read stays on disk.
//!
//! Two concurrent misses for the same version may both download and both
//! save. Saves replace the whole file and overwrite the same cache key, so
//! this costs duplicate work but never leaves a torn artifact.

use async_trait::async_trait;
use modelrepo_core::{
    resolve_version, sorted_versions, ModelKey, RepoResult, VersionSpec, VersionTag,
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::local::LocalStore;
use crate::traits::{ModelLoader, ModelRepository};

/// Remote tier as seen by the caching repository
pub type RemoteTier<M> = Arc<dyn ModelRepository<Model = M>>;

/// Local-over-remote model repository
pub struct CachingRepository<L: ModelLoader> {
    local: Arc<LocalStore<L>>,
    remote: RemoteTier<L::Model>,
}

impl<L: ModelLoader> CachingRepository<L> {
    /// Compose a local store over a remote repository
    pub fn new(local: Arc<LocalStore<L>>, remote: RemoteTier<L::Model>) -> Self {
        info!(remote = remote.name(), "Initialized caching model repository");
        Self { local, remote }
    }

    /// The local tier
    pub fn local(&self) -> &Arc<LocalStore<L>> {
        &self.local
    }

    async fn resolve(&self, name: &str, version: VersionSpec) -> RepoResult<VersionTag> {
        match version {
            VersionSpec::Exact(tag) => Ok(tag),
            VersionSpec::Latest => {
                let versions = self.list_versions(name).await?;
                resolve_version(name, version, &versions)
            }
        }
    }
}

#[async_trait]
impl<L: ModelLoader> ModelRepository for CachingRepository<L> {
    type Model = L::Model;

    /// Resolves `latest` over the union of both tiers, then reads the local
    /// tier before falling back to the remote one.
    async fn get_model(&self, name: &str, version: VersionSpec) -> RepoResult<Arc<L::Model>> {
        let resolved = self.resolve(name, version).await?;
        let key = ModelKey::new(name, resolved);

        info!(model = %key, requested = %version, "Retrieving model");

        match self.local.get_model(name, resolved.into()).await {
            Ok(model) => return Ok(model),
            Err(e) if e.is_not_found() => {
                info!(model = %key, "Model not in local store, fetching from remote");
            }
            Err(e) => return Err(e),
        }

        let model = self.remote.get_model(name, resolved.into()).await?;

        match self.local.save_model(name, resolved, model.clone()).await {
            Ok(path) => {
                info!(model = %key, path = %path.display(), "Cached model to local store");
            }
            Err(e) => {
                warn!(model = %key, error = %e, "Failed to cache model locally");
            }
        }

        Ok(model)
    }

    async fn has_model(&self, name: &str, version: VersionSpec) -> RepoResult<bool> {
        if self.local.has_model(name, version).await? {
            return Ok(true);
        }
        self.remote.has_model(name, version).await
    }

    /// Union of both tiers; a failing remote contributes nothing.
    async fn list_versions(&self, name: &str) -> RepoResult<Vec<VersionTag>> {
        let local_versions = self.local.list_versions(name).await?;

        let remote_versions = match self.remote.list_versions(name).await {
            Ok(versions) => versions,
            Err(e) => {
                warn!(name = name, error = %e, "Error fetching remote versions");
                Vec::new()
            }
        };

        Ok(sorted_versions(local_versions.into_iter().chain(remote_versions)))
    }

    fn name(&self) -> &'static str {
        "caching"
    }
}
