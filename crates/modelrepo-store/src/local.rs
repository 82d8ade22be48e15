//! Local artifact store
//!
//! Artifacts live on disk at `<base_path>/<name>/<version>/<artifact_filename>`.
//! Loaded artifacts are kept in an [`ArtifactCache`] keyed by `name:version`.

use async_trait::async_trait;
use modelrepo_core::{
    resolve_version, sorted_versions, validate_model_name, ModelKey, RepoError, RepoResult,
    StorageConfig, VersionSpec, VersionTag,
};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::{ArtifactCache, CacheStats};
use crate::traits::{ModelLoader, ModelRepository};

/// Model repository backed by the local filesystem
pub struct LocalStore<L: ModelLoader> {
    /// Base path for model storage
    base_path: PathBuf,
    /// Artifact filename inside each version directory
    artifact_filename: String,
    /// Format plug-in
    loader: Arc<L>,
    /// Loaded artifacts
    cache: ArtifactCache<L::Model>,
}

impl<L: ModelLoader> LocalStore<L> {
    /// Create a new local store
    pub fn new(
        base_path: PathBuf,
        artifact_filename: impl Into<String>,
        loader: Arc<L>,
        cache: ArtifactCache<L::Model>,
    ) -> Self {
        Self {
            base_path,
            artifact_filename: artifact_filename.into(),
            loader,
            cache,
        }
    }

    /// Create a local store from storage configuration
    pub fn from_config(config: &StorageConfig, loader: Arc<L>) -> Self {
        Self::new(
            config.models_path.clone(),
            config.artifact_filename.clone(),
            loader,
            ArtifactCache::new(config.memory_cache_capacity),
        )
    }

    /// Create the base directory if it does not exist yet
    pub async fn init(&self) -> RepoResult<()> {
        if !tokio::fs::try_exists(&self.base_path).await? {
            tokio::fs::create_dir_all(&self.base_path).await?;
            info!(path = %self.base_path.display(), "Created local model directory");
        }

        info!(path = %self.base_path.display(), "Initialized local model store");
        Ok(())
    }

    /// Base directory of this store
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Path of the artifact file for a concrete version
    pub fn artifact_path(&self, name: &str, version: VersionTag) -> PathBuf {
        self.base_path
            .join(name)
            .join(version.to_string())
            .join(&self.artifact_filename)
    }

    /// Memory cache statistics
    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    async fn is_file(path: &Path) -> RepoResult<bool> {
        match tokio::fs::metadata(path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn scan_versions(&self, name: &str) -> RepoResult<Vec<VersionTag>> {
        let model_dir = self.base_path.join(name);

        let mut entries = match tokio::fs::read_dir(&model_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut versions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            // Follows symlinks, like the artifact lookups do
            match tokio::fs::metadata(entry.path()).await {
                Ok(meta) if meta.is_dir() => {}
                Ok(_) => continue,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
            if let Some(tag) = entry.file_name().to_str().and_then(VersionTag::from_segment) {
                versions.push(tag);
            }
        }

        Ok(sorted_versions(versions))
    }

    /// Persist an artifact under `name`/`version` and cache it in memory.
    ///
    /// Saving the same version again replaces the file and the cache entry.
    pub async fn save_model(
        &self,
        name: &str,
        version: VersionTag,
        model: Arc<L::Model>,
    ) -> RepoResult<PathBuf> {
        validate_model_name(name)?;

        let path = self.artifact_path(name, version);
        let version_dir = path
            .parent()
            .ok_or_else(|| RepoError::Internal(format!("No parent for {}", path.display())))?;
        tokio::fs::create_dir_all(version_dir).await?;

        self.loader.save(&model, &path).await?;

        let key = ModelKey::new(name, version);
        self.cache.insert(&key.cache_key(), model).await;

        info!(model = %key, path = %path.display(), "Saved model to local store");
        Ok(path)
    }
}

#[async_trait]
impl<L: ModelLoader> ModelRepository for LocalStore<L> {
    type Model = L::Model;

    async fn get_model(&self, name: &str, version: VersionSpec) -> RepoResult<Arc<L::Model>> {
        validate_model_name(name)?;

        let resolved = match version {
            VersionSpec::Exact(tag) => tag,
            VersionSpec::Latest => {
                resolve_version(name, version, &self.scan_versions(name).await?)?
            }
        };
        let key = ModelKey::new(name, resolved);

        if let Some(model) = self.cache.get(&key.cache_key()).await {
            debug!(model = %key, "Returning cached model from memory");
            return Ok(model);
        }

        let path = self.artifact_path(name, resolved);
        if !Self::is_file(&path).await? {
            return Err(RepoError::not_found(name, resolved));
        }

        info!(model = %key, path = %path.display(), "Loading model from local store");
        let model = Arc::new(self.loader.load(&path).await?);
        self.cache.insert(&key.cache_key(), model.clone()).await;

        Ok(model)
    }

    async fn has_model(&self, name: &str, version: VersionSpec) -> RepoResult<bool> {
        if validate_model_name(name).is_err() {
            return Ok(false);
        }

        let resolved = match version {
            VersionSpec::Exact(tag) => tag,
            VersionSpec::Latest => match self.scan_versions(name).await?.last() {
                Some(tag) => *tag,
                None => return Ok(false),
            },
        };

        Self::is_file(&self.artifact_path(name, resolved)).await
    }

    async fn list_versions(&self, name: &str) -> RepoResult<Vec<VersionTag>> {
        validate_model_name(name)?;
        self.scan_versions(name).await
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
