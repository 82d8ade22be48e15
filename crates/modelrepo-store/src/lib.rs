//! modelrepo-store: Model artifact storage
//!
//! This crate provides the repositories that resolve a named, versioned
//! model artifact:
//! - Local disk store with an in-memory artifact cache
//! - Remote store over a prefix-addressed object store (S3, HTTP JSON API or a directory)
//! - Caching composition that promotes remote fetches into the local store
//! - Factory selecting the composition from configuration

pub mod cache;
pub mod caching;
pub mod factory;
pub mod fs_store;
pub mod http_store;
pub mod loader;
pub mod local;
pub mod object_store;
pub mod remote;
pub mod s3_store;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{ArtifactCache, CacheStats};
pub use caching::CachingRepository;
pub use factory::{create_model_repository, create_object_store};
pub use fs_store::FsObjectStore;
pub use http_store::HttpObjectStore;
pub use loader::{ModelArtifact, RawArtifactLoader};
pub use local::LocalStore;
pub use crate::object_store::{ObjectMeta, ObjectStore};
pub use remote::RemoteStore;
pub use s3_store::S3ObjectStore;
pub use traits::{ModelLoader, ModelRepository};
