//! Remote artifact store
//!
//! Artifacts are objects keyed `<environment>/<name>/v<N>/<file><suffix>`.
//! Every `get_model` downloads into a scratch directory, loads, and removes
//! the scratch directory again; this store keeps nothing between calls.

use async_trait::async_trait;
use modelrepo_core::{
    resolve_version, sorted_versions, validate_model_name, ModelKey, RemoteConfig, RepoError,
    RepoResult, VersionSpec, VersionTag,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::object_store::ObjectStore;
use crate::traits::{ModelLoader, ModelRepository};

/// Model repository backed by a remote object store
pub struct RemoteStore<L: ModelLoader> {
    /// Object store client
    store: Arc<dyn ObjectStore>,
    /// Deployment namespace prefixed to every key
    environment: String,
    /// Suffix identifying artifact objects
    artifact_suffix: String,
    /// Filename used for downloads and uploads
    artifact_filename: String,
    /// Format plug-in
    loader: Arc<L>,
}

impl<L: ModelLoader> RemoteStore<L> {
    /// Create a new remote store
    pub fn new(
        store: Arc<dyn ObjectStore>,
        environment: impl Into<String>,
        artifact_suffix: impl Into<String>,
        artifact_filename: impl Into<String>,
        loader: Arc<L>,
    ) -> Self {
        let remote = Self {
            store,
            environment: environment.into(),
            artifact_suffix: artifact_suffix.into(),
            artifact_filename: artifact_filename.into(),
            loader,
        };

        info!(
            location = %remote.store.location(),
            environment = %remote.environment,
            "Initialized remote model store"
        );
        remote
    }

    /// Create a remote store from configuration
    pub fn from_config(
        config: &RemoteConfig,
        artifact_filename: &str,
        store: Arc<dyn ObjectStore>,
        loader: Arc<L>,
    ) -> Self {
        Self::new(
            store,
            config.environment.clone(),
            config.artifact_suffix.clone(),
            artifact_filename,
            loader,
        )
    }

    /// Listing prefix for a model; the trailing `/` keeps `cat` from matching `cat_dog`
    fn model_prefix(&self, name: &str) -> String {
        format!("{}/{}/", self.environment, name)
    }

    /// Version encoded in the first key segment below the model prefix
    fn version_of(prefix: &str, key: &str) -> Option<VersionTag> {
        let (segment, rest) = key.strip_prefix(prefix)?.split_once('/')?;
        if rest.is_empty() {
            return None;
        }
        VersionTag::from_segment(segment)
    }

    /// Artifact objects for a model with their versions, ordered by key
    async fn list_artifacts(&self, name: &str) -> RepoResult<Vec<(VersionTag, String)>> {
        let prefix = self.model_prefix(name);

        let objects = self.store.list(&prefix).await.map_err(|e| {
            error!(
                location = %self.store.location(),
                prefix = %prefix,
                error = %e,
                "Error listing remote objects"
            );
            e
        })?;

        if objects.is_empty() {
            warn!(
                location = %self.store.location(),
                prefix = %prefix,
                "No remote objects found"
            );
            return Ok(Vec::new());
        }

        Ok(objects
            .into_iter()
            .filter(|object| object.key.ends_with(&self.artifact_suffix))
            .filter_map(|object| Self::version_of(&prefix, &object.key).map(|tag| (tag, object.key)))
            .collect())
    }

    /// Key an artifact for `name`/`version` is published under
    pub fn object_key(&self, name: &str, version: VersionTag) -> String {
        format!("{}{}/{}", self.model_prefix(name), version, self.artifact_filename)
    }

    /// Upload a local artifact file as `name`/`version`.
    pub async fn publish(&self, name: &str, version: VersionTag, path: &Path) -> RepoResult<String> {
        validate_model_name(name)?;
        if !self.artifact_filename.ends_with(&self.artifact_suffix) {
            return Err(RepoError::Config(format!(
                "Artifact filename '{}' does not end with the remote suffix '{}'",
                self.artifact_filename, self.artifact_suffix
            )));
        }

        let key = self.object_key(name, version);
        self.store.upload(path, &key).await?;

        info!(
            model = %ModelKey::new(name, version),
            location = %self.store.location(),
            key = %key,
            "Published model"
        );
        Ok(key)
    }

    async fn download_and_load(&self, key: &str) -> RepoResult<L::Model> {
        let scratch = tempfile::Builder::new().prefix("modelrepo-").tempdir()?;
        let dest = scratch.path().join(&self.artifact_filename);

        info!(
            location = %self.store.location(),
            key = %key,
            dest = %dest.display(),
            "Downloading model"
        );

        let loaded = match self.store.download(key, &dest).await {
            Ok(bytes) => {
                debug!(key = %key, bytes = bytes, "Download complete");
                self.loader.load(&dest).await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = scratch.close() {
            warn!(key = %key, error = %e, "Failed to remove download directory");
        }

        loaded
    }
}

#[async_trait]
impl<L: ModelLoader> ModelRepository for RemoteStore<L> {
    type Model = L::Model;

    async fn get_model(&self, name: &str, version: VersionSpec) -> RepoResult<Arc<L::Model>> {
        validate_model_name(name)?;

        let artifacts = self.list_artifacts(name).await?;
        let available = sorted_versions(artifacts.iter().map(|(tag, _)| *tag));
        let resolved = resolve_version(name, version, &available)?;

        let mut matching = artifacts.iter().filter(|(tag, _)| *tag == resolved);
        let key = match matching.next() {
            Some((_, key)) => key,
            None => return Err(RepoError::not_found(name, resolved)),
        };
        if matching.next().is_some() {
            debug!(
                model = %ModelKey::new(name, resolved),
                key = %key,
                "Several artifacts share a version folder, using the first"
            );
        }

        let model = self.download_and_load(key).await?;
        Ok(Arc::new(model))
    }

    async fn has_model(&self, name: &str, version: VersionSpec) -> RepoResult<bool> {
        if validate_model_name(name).is_err() {
            return Ok(false);
        }

        let versions = self.list_versions(name).await?;
        Ok(match version {
            VersionSpec::Latest => !versions.is_empty(),
            VersionSpec::Exact(tag) => versions.contains(&tag),
        })
    }

    async fn list_versions(&self, name: &str) -> RepoResult<Vec<VersionTag>> {
        validate_model_name(name)?;
        let artifacts = self.list_artifacts(name).await?;
        Ok(sorted_versions(artifacts.into_iter().map(|(tag, _)| tag)))
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs_store::FsObjectStore;
    use crate::loader::RawArtifactLoader;
    use crate::object_store::ObjectMeta;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn tag(n: u64) -> VersionTag {
        VersionTag::new(n)
    }

    fn seed(root: &TempDir, key: &str, contents: &[u8]) {
        let path = root.path().join("models").join(key);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn remote(root: &TempDir) -> RemoteStore<RawArtifactLoader> {
        std::fs::create_dir_all(root.path().join("models")).unwrap();
        RemoteStore::new(
            Arc::new(FsObjectStore::new(root.path(), "models")),
            "dev",
            ".h5",
            "model.h5",
            Arc::new(RawArtifactLoader::new()),
        )
    }

    /// Object store that records downloads and can be told to fail
    struct ScriptedStore {
        keys: Vec<&'static str>,
        fail_listing: bool,
        downloads: AtomicUsize,
    }

    #[async_trait]
    impl ObjectStore for ScriptedStore {
        async fn list(&self, prefix: &str) -> RepoResult<Vec<ObjectMeta>> {
            if self.fail_listing {
                return Err(RepoError::remote(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "listing timed out",
                )));
            }
            Ok(self
                .keys
                .iter()
                .filter(|k| k.starts_with(prefix))
                .map(|k| ObjectMeta {
                    key: k.to_string(),
                    size: 1,
                    updated: None,
                })
                .collect())
        }

        async fn download(&self, _key: &str, dest: &Path) -> RepoResult<u64> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            tokio::fs::write(dest, b"x").await?;
            Ok(1)
        }

        async fn upload(&self, _src: &Path, _key: &str) -> RepoResult<()> {
            Ok(())
        }

        fn location(&self) -> String {
            "scripted://models".to_string()
        }
    }

    fn scripted(keys: Vec<&'static str>, fail_listing: bool) -> (Arc<ScriptedStore>, RemoteStore<RawArtifactLoader>) {
        let store = Arc::new(ScriptedStore {
            keys,
            fail_listing,
            downloads: AtomicUsize::new(0),
        });
        let remote = RemoteStore::new(
            store.clone(),
            "dev",
            ".h5",
            "model.h5",
            Arc::new(RawArtifactLoader::new()),
        );
        (store, remote)
    }

    #[test]
    fn test_version_of_key() {
        let prefix = "dev/model/";
        type Store = RemoteStore<RawArtifactLoader>;
        assert_eq!(Store::version_of(prefix, "dev/model/v1/model.h5"), Some(tag(1)));
        assert_eq!(Store::version_of(prefix, "dev/model/v123/model.h5"), Some(tag(123)));
        assert_eq!(Store::version_of(prefix, "dev/model/other/model.h5"), None);
        assert_eq!(Store::version_of(prefix, "dev/model/v1"), None);
        assert_eq!(Store::version_of(prefix, "dev/model/v1/"), None);
        assert_eq!(Store::version_of(prefix, "prod/model/v1/model.h5"), None);
    }

    #[tokio::test]
    async fn test_list_versions() {
        let root = TempDir::new().unwrap();
        seed(&root, "dev/test_model/v3/model.h5", b"3");
        seed(&root, "dev/test_model/v1/model.h5", b"1");
        seed(&root, "dev/test_model/v2/model.h5", b"2");
        seed(&root, "dev/test_model/v2/metadata.json", b"{}");
        seed(&root, "dev/test_model/v4/metadata.json", b"{}");
        seed(&root, "dev/test_model/notes/model.h5", b"?");
        seed(&root, "prod/test_model/v9/model.h5", b"9");

        let versions = remote(&root).list_versions("test_model").await.unwrap();
        assert_eq!(versions, vec![tag(1), tag(2), tag(3)]);
    }

    #[tokio::test]
    async fn test_list_versions_empty_listing() {
        let root = TempDir::new().unwrap();
        let versions = remote(&root).list_versions("nonexistent_model").await.unwrap();
        assert!(versions.is_empty());
    }

    #[tokio::test]
    async fn test_has_model() {
        let root = TempDir::new().unwrap();
        seed(&root, "dev/test_model/v1/model.h5", b"1");
        seed(&root, "dev/test_model/v2/model.h5", b"2");
        let store = remote(&root);

        assert!(store.has_model("test_model", VersionSpec::Latest).await.unwrap());
        assert!(store.has_model("test_model", tag(2).into()).await.unwrap());
        assert!(!store.has_model("test_model", tag(3).into()).await.unwrap());
        assert!(!store.has_model("nonexistent_model", VersionSpec::Latest).await.unwrap());
    }

    #[tokio::test]
    async fn test_get_model_latest_downloads_highest_version() {
        let root = TempDir::new().unwrap();
        seed(&root, "dev/test_model/v1/model.h5", b"one");
        seed(&root, "dev/test_model/v10/model.h5", b"ten");
        seed(&root, "dev/test_model/v9/model.h5", b"nine");

        let model = remote(&root)
            .get_model("test_model", VersionSpec::Latest)
            .await
            .unwrap();
        assert_eq!(model.bytes(), b"ten");
    }

    #[tokio::test]
    async fn test_get_model_specific_version_with_other_filename() {
        let root = TempDir::new().unwrap();
        seed(&root, "dev/test_model/v2/cat_dog_other_classifier.h5", b"two");

        let model = remote(&root)
            .get_model("test_model", tag(2).into())
            .await
            .unwrap();
        assert_eq!(model.bytes(), b"two");
    }

    #[tokio::test]
    async fn test_get_model_not_found() {
        let root = TempDir::new().unwrap();
        seed(&root, "dev/test_model/v1/model.h5", b"one");
        let store = remote(&root);

        let err = store.get_model("test_model", tag(5).into()).await.unwrap_err();
        assert!(err.is_not_found());

        let err = store
            .get_model("nonexistent_model", VersionSpec::Latest)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_get_model_downloads_every_time() {
        let (store, remote) = scripted(vec!["dev/m/v1/model.h5"], false);

        remote.get_model("m", VersionSpec::Latest).await.unwrap();
        remote.get_model("m", VersionSpec::Latest).await.unwrap();

        assert_eq!(store.downloads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_listing_error_propagates() {
        let (store, remote) = scripted(vec![], true);

        let err = remote.list_versions("m").await.unwrap_err();
        assert!(matches!(err, RepoError::Remote(_)));
        assert_eq!(err.to_string(), "listing timed out");

        let err = remote.get_model("m", VersionSpec::Latest).await.unwrap_err();
        assert!(matches!(err, RepoError::Remote(_)));
        assert_eq!(store.downloads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_publish_then_get() {
        let root = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let src = scratch.path().join("weights.h5");
        std::fs::write(&src, b"published").unwrap();

        let store = remote(&root);
        let key = store.publish("test_model", tag(3), &src).await.unwrap();
        assert_eq!(key, "dev/test_model/v3/model.h5");

        assert_eq!(store.list_versions("test_model").await.unwrap(), vec![tag(3)]);
        let model = store.get_model("test_model", tag(3).into()).await.unwrap();
        assert_eq!(model.bytes(), b"published");
    }
}
