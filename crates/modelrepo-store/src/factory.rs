//! Repository construction from configuration

use modelrepo_core::{ObjectStoreBackend, RemoteConfig, RepoResult, RepositoryConfig, RepositoryKind};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::caching::CachingRepository;
use crate::fs_store::FsObjectStore;
use crate::http_store::HttpObjectStore;
use crate::local::LocalStore;
use crate::object_store::ObjectStore;
use crate::remote::RemoteStore;
use crate::s3_store::S3ObjectStore;
use crate::traits::{ModelLoader, ModelRepository};

/// Endpoint of the HTTP backend when none is configured
const DEFAULT_HTTP_ENDPOINT: &str = "https://storage.googleapis.com";

/// Build the object store client the remote tier talks to
pub fn create_object_store(config: &RemoteConfig) -> RepoResult<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match config.backend {
        ObjectStoreBackend::S3 => Arc::new(S3ObjectStore::from_config(config)?),
        ObjectStoreBackend::Http => Arc::new(HttpObjectStore::new(
            config.endpoint.as_deref().unwrap_or(DEFAULT_HTTP_ENDPOINT),
            &config.bucket,
            config.access_token.clone(),
            config.timeout_secs,
        )?),
        ObjectStoreBackend::Filesystem => Arc::new(FsObjectStore::new(
            PathBuf::from(config.endpoint.as_deref().unwrap_or_default()),
            &config.bucket,
        )),
    };
    Ok(store)
}

fn remote_store<L: ModelLoader>(
    config: &RepositoryConfig,
    loader: Arc<L>,
) -> RepoResult<RemoteStore<L>> {
    let object_store = create_object_store(&config.remote)?;
    Ok(RemoteStore::from_config(
        &config.remote,
        &config.storage.artifact_filename,
        object_store,
        loader,
    ))
}

async fn local_store<L: ModelLoader>(
    config: &RepositoryConfig,
    loader: Arc<L>,
) -> RepoResult<LocalStore<L>> {
    let local = LocalStore::from_config(&config.storage, loader);
    local.init().await?;
    Ok(local)
}

/// Create the repository composition selected by `repository.kind`
pub async fn create_model_repository<L: ModelLoader>(
    config: &RepositoryConfig,
    loader: Arc<L>,
) -> RepoResult<Arc<dyn ModelRepository<Model = L::Model>>> {
    config.validate()?;

    let repository: Arc<dyn ModelRepository<Model = L::Model>> = match config.repository.kind {
        RepositoryKind::Local => Arc::new(local_store(config, loader).await?),
        RepositoryKind::Remote => Arc::new(remote_store(config, loader)?),
        RepositoryKind::Caching => {
            let local = Arc::new(local_store(config, loader.clone()).await?);
            let remote = Arc::new(remote_store(config, loader)?);
            Arc::new(CachingRepository::new(local, remote))
        }
    };

    info!(
        kind = %config.repository.kind,
        repository = repository.name(),
        "Created model repository"
    );
    Ok(repository)
}
