//! Filesystem-backed object store
//!
//! A bucket is a directory under a root directory and object keys are
//! relative paths inside it. Useful for development and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use modelrepo_core::{RepoError, RepoResult};
use std::io::{Error as IoError, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::object_store::{ObjectMeta, ObjectStore};

/// Object store rooted at a local directory
pub struct FsObjectStore {
    /// Directory standing in for the bucket
    bucket_path: PathBuf,
}

impl FsObjectStore {
    /// Create a store for `bucket` under `root`
    pub fn new(root: impl Into<PathBuf>, bucket: &str) -> Self {
        Self {
            bucket_path: root.into().join(bucket),
        }
    }

    /// Map a key onto the bucket directory, refusing keys that climb out of it
    fn object_path(&self, key: &str) -> RepoResult<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('/')
            && key.split('/').all(|seg| !seg.is_empty() && seg != "." && seg != "..");
        if !valid {
            return Err(RepoError::remote(IoError::new(
                ErrorKind::InvalidInput,
                format!("invalid object key: {}", key),
            )));
        }
        Ok(self.bucket_path.join(key))
    }

    fn scan(bucket_path: &Path, prefix: &str) -> Result<Vec<ObjectMeta>, IoError> {
        if !bucket_path.is_dir() {
            return Err(IoError::new(
                ErrorKind::NotFound,
                format!("bucket directory not found: {}", bucket_path.display()),
            ));
        }

        // Only walk the deepest directory the prefix names
        let start = match prefix.rfind('/') {
            Some(idx) => bucket_path.join(&prefix[..idx]),
            None => bucket_path.to_path_buf(),
        };
        if !start.is_dir() {
            return Ok(Vec::new());
        }

        let mut objects = Vec::new();
        for entry in WalkDir::new(&start).sort_by_file_name() {
            let entry = entry.map_err(IoError::from)?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = match entry.path().strip_prefix(bucket_path) {
                Ok(relative) => relative,
                Err(_) => continue,
            };
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if !key.starts_with(prefix) {
                continue;
            }

            let metadata = entry.metadata().map_err(IoError::from)?;
            objects.push(ObjectMeta {
                key,
                size: metadata.len(),
                updated: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn list(&self, prefix: &str) -> RepoResult<Vec<ObjectMeta>> {
        let bucket_path = self.bucket_path.clone();
        let owned_prefix = prefix.to_string();

        let objects = tokio::task::spawn_blocking(move || Self::scan(&bucket_path, &owned_prefix))
            .await
            .map_err(|e| RepoError::Internal(format!("Listing task failed: {}", e)))?
            .map_err(RepoError::remote)?;

        debug!(prefix = prefix, count = objects.len(), "Listed filesystem objects");
        Ok(objects)
    }

    async fn download(&self, key: &str, dest: &Path) -> RepoResult<u64> {
        let source = self.object_path(key)?;
        tokio::fs::copy(&source, dest).await.map_err(RepoError::remote)
    }

    async fn upload(&self, src: &Path, key: &str) -> RepoResult<()> {
        let target = self.object_path(key)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(RepoError::remote)?;
        }
        tokio::fs::copy(src, &target)
            .await
            .map_err(RepoError::remote)?;
        Ok(())
    }

    fn location(&self) -> String {
        format!("file://{}", self.bucket_path.display())
    }
}
