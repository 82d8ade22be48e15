//! In-memory artifact cache
//!
//! Holds loaded artifacts keyed by `name:version`. A cache is either
//! unbounded (entries live as long as the owning store) or bounded by entry
//! count with least-recently-used eviction.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Cached artifact with its access stamp
struct CachedArtifact<M> {
    artifact: Arc<M>,
    /// Logical clock value of the last read or write
    last_accessed: u64,
}

/// Artifact cache shared by concurrent requests
pub struct ArtifactCache<M> {
    /// Maximum number of entries, `None` for unbounded
    capacity: Option<usize>,
    /// Cached artifacts indexed by `name:version`
    entries: RwLock<HashMap<String, CachedArtifact<M>>>,
    /// Monotonic access clock
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<M> ArtifactCache<M> {
    /// Create a cache with an optional entry limit
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            capacity,
            entries: RwLock::new(HashMap::new()),
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cache that never evicts
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Cache holding at most `capacity` artifacts
    pub fn bounded(capacity: usize) -> Self {
        Self::new(Some(capacity))
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Look up an artifact, refreshing its access stamp
    pub async fn get(&self, key: &str) -> Option<Arc<M>> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(entry) => {
                entry.last_accessed = self.tick();
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.artifact.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert or replace an artifact
    pub async fn insert(&self, key: &str, artifact: Arc<M>) {
        let mut entries = self.entries.write().await;

        if let Some(capacity) = self.capacity {
            if !entries.contains_key(key) {
                while entries.len() >= capacity {
                    let oldest = entries
                        .iter()
                        .min_by_key(|(_, entry)| entry.last_accessed)
                        .map(|(k, _)| k.clone());
                    match oldest {
                        Some(evicted) => {
                            warn!(key = %evicted, "Evicting artifact from memory cache (LRU)");
                            entries.remove(&evicted);
                        }
                        None => break,
                    }
                }
            }
        }

        let entry = CachedArtifact {
            artifact,
            last_accessed: self.tick(),
        };
        entries.insert(key.to_string(), entry);

        debug!(key = key, entries = entries.len(), "Cached artifact in memory");
    }

    /// Check if an artifact is cached
    pub async fn contains(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    /// Drop an artifact from the cache
    pub async fn remove(&self, key: &str) -> Option<Arc<M>> {
        self.entries
            .write()
            .await
            .remove(key)
            .map(|entry| entry.artifact)
    }

    /// Number of cached artifacts
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len().await,
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of cached artifacts
    pub entries: usize,
    /// Entry limit, `None` when unbounded
    pub capacity: Option<usize>,
    /// Lookups served from memory
    pub hits: u64,
    /// Lookups that missed
    pub misses: u64,
}
