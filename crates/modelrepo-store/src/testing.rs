//! Test doubles shared by the store tests

use async_trait::async_trait;
use modelrepo_core::{sorted_versions, RepoError, RepoResult, VersionSpec, VersionTag};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::loader::{ModelArtifact, RawArtifactLoader};
use crate::traits::{ModelLoader, ModelRepository};

/// Remote tier that serves synthetic artifacts and counts calls
pub(crate) struct MockRemote {
    versions: Vec<VersionTag>,
    failing: bool,
    get_calls: AtomicUsize,
    has_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

impl MockRemote {
    pub(crate) fn with_versions(versions: &[u64]) -> Self {
        Self {
            versions: sorted_versions(versions.iter().copied().map(VersionTag::new)),
            failing: false,
            get_calls: AtomicUsize::new(0),
            has_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
        }
    }

    /// Every call fails with an infrastructure error
    pub(crate) fn failing() -> Self {
        Self {
            failing: true,
            ..Self::with_versions(&[])
        }
    }

    pub(crate) fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn has_calls(&self) -> usize {
        self.has_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn outage(&self) -> RepoResult<()> {
        if self.failing {
            return Err(RepoError::remote(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "remote unavailable",
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ModelRepository for MockRemote {
    type Model = ModelArtifact;

    async fn get_model(&self, name: &str, version: VersionSpec) -> RepoResult<Arc<ModelArtifact>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.outage()?;

        let resolved = match version {
            VersionSpec::Exact(tag) if self.versions.contains(&tag) => tag,
            VersionSpec::Latest if !self.versions.is_empty() => self.versions[self.versions.len() - 1],
            _ => return Err(RepoError::not_found(name, version)),
        };
        let contents = format!("remote {}:{}", name, resolved);
        Ok(Arc::new(ModelArtifact::from_bytes(contents.into_bytes())))
    }

    async fn has_model(&self, _name: &str, version: VersionSpec) -> RepoResult<bool> {
        self.has_calls.fetch_add(1, Ordering::SeqCst);
        self.outage()?;
        Ok(match version {
            VersionSpec::Latest => !self.versions.is_empty(),
            VersionSpec::Exact(tag) => self.versions.contains(&tag),
        })
    }

    async fn list_versions(&self, _name: &str) -> RepoResult<Vec<VersionTag>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.outage()?;
        Ok(self.versions.clone())
    }

    fn name(&self) -> &'static str {
        "mock-remote"
    }
}

/// Loader that reads like [`RawArtifactLoader`] but refuses to write
pub(crate) struct FailingSaveLoader;

#[async_trait]
impl ModelLoader for FailingSaveLoader {
    type Model = ModelArtifact;

    async fn load(&self, path: &Path) -> RepoResult<ModelArtifact> {
        RawArtifactLoader::new().load(path).await
    }

    async fn save(&self, _model: &ModelArtifact, _path: &Path) -> RepoResult<()> {
        Err(RepoError::Storage("disk full".to_string()))
    }
}
