//! Default artifact loader
//!
//! Treats an artifact file as an opaque byte blob. Services that need a
//! framework-specific model plug in their own [`ModelLoader`].

use async_trait::async_trait;
use modelrepo_core::{RepoError, RepoResult};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::traits::ModelLoader;

/// Opaque model artifact held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelArtifact {
    bytes: Vec<u8>,
    digest: String,
}

impl ModelArtifact {
    /// Wrap raw artifact bytes, computing their SHA-256 digest
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let digest = format!("{:x}", Sha256::digest(&bytes));
        Self { bytes, digest }
    }

    /// Raw artifact contents
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Hex-encoded SHA-256 of the contents
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Loader that reads and writes artifact files verbatim
#[derive(Debug, Clone, Copy, Default)]
pub struct RawArtifactLoader;

impl RawArtifactLoader {
    pub fn new() -> Self {
        Self
    }
}

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// Sibling path used while writing, renamed over the target once complete.
/// Each save stages under its own name so concurrent saves never share a file.
fn staging_path(path: &Path) -> RepoResult<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| RepoError::Storage(format!("Not a file path: {}", path.display())))?;
    let mut staged = file_name.to_os_string();
    staged.push(format!(
        ".{}.{}.partial",
        std::process::id(),
        STAGING_SEQ.fetch_add(1, Ordering::Relaxed)
    ));
    Ok(path.with_file_name(staged))
}

#[async_trait]
impl ModelLoader for RawArtifactLoader {
    type Model = ModelArtifact;

    async fn load(&self, path: &Path) -> RepoResult<ModelArtifact> {
        let bytes = tokio::fs::read(path).await?;
        let artifact = ModelArtifact::from_bytes(bytes);
        debug!(
            path = %path.display(),
            size = artifact.len(),
            digest = %artifact.digest(),
            "Loaded artifact"
        );
        Ok(artifact)
    }

    async fn save(&self, model: &ModelArtifact, path: &Path) -> RepoResult<()> {
        let staged = staging_path(path)?;
        tokio::fs::write(&staged, model.bytes()).await?;

        if let Err(e) = tokio::fs::rename(&staged, path).await {
            let _ = tokio::fs::remove_file(&staged).await;
            return Err(e.into());
        }
        Ok(())
    }
}
