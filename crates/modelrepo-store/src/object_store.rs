//! Object store abstraction
//!
//! The remote tier only needs prefix listing and whole-object transfers.
//! Backend errors are surfaced as [`RepoError::Remote`](modelrepo_core::RepoError::Remote)
//! with the client's own error inside.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use modelrepo_core::RepoResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Listing entry for one stored object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Full object key
    pub key: String,
    /// Object size in bytes
    pub size: u64,
    /// Last modification time, when the backend reports one
    pub updated: Option<DateTime<Utc>>,
}

/// Prefix-addressed object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every object whose key starts with `prefix`, ordered by key
    async fn list(&self, prefix: &str) -> RepoResult<Vec<ObjectMeta>>;

    /// Download an object into `dest`, returning the number of bytes written
    async fn download(&self, key: &str, dest: &Path) -> RepoResult<u64>;

    /// Upload the file at `src` under `key`
    async fn upload(&self, src: &Path, key: &str) -> RepoResult<()>;

    /// Human-readable location (e.g., "gs://models") for logs
    fn location(&self) -> String;
}
