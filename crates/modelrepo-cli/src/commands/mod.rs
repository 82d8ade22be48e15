//! CLI commands implementation

use anyhow::{Context, Result};
use modelrepo_core::{RepositoryConfig, VersionSpec, VersionTag};
use modelrepo_store::{create_object_store, RawArtifactLoader, RemoteStore};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// API client for communicating with the daemon
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn version_url(&self, name: &str, version: VersionSpec) -> String {
        self.url(&format!("/api/v1/models/{}/versions/{}", name, version))
    }

    async fn read<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
        action: &str,
    ) -> Result<T> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let status = response.status();
            let error = response.text().await?;
            anyhow::bail!("Failed to {} ({}): {}", action, status, error)
        }
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self.client.get(self.url("/health")).send().await?;
        Self::read(response, "get status").await
    }

    pub async fn versions(&self, name: &str) -> Result<VersionsResponse> {
        let response = self
            .client
            .get(self.url(&format!("/api/v1/models/{}/versions", name)))
            .send()
            .await?;
        Self::read(response, "list versions").await
    }

    pub async fn has(&self, name: &str, version: VersionSpec) -> Result<AvailabilityResponse> {
        let response = self
            .client
            .get(self.version_url(name, version))
            .send()
            .await?;
        Self::read(response, "check model").await
    }

    pub async fn load(&self, name: &str, version: VersionSpec) -> Result<LoadResponse> {
        let url = format!("{}/load", self.version_url(name, version));
        debug!(url = %url, "Requesting model load");
        let response = self.client.post(url).send().await?;
        Self::read(response, "load model").await
    }
}

/// Health response from API
#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub repository: String,
}

/// Versions response from API
#[derive(Debug, Deserialize)]
pub struct VersionsResponse {
    pub name: String,
    pub versions: Vec<VersionTag>,
}

/// Availability response from API
#[derive(Debug, Deserialize)]
pub struct AvailabilityResponse {
    pub name: String,
    pub version: String,
    pub available: bool,
}

/// Load response from API
#[derive(Debug, Deserialize)]
pub struct LoadResponse {
    pub name: String,
    pub version: String,
    pub size_bytes: usize,
    pub digest: String,
}

/// List the versions of a model
pub async fn versions(client: &ApiClient, name: String) -> Result<()> {
    let response = client.versions(&name).await?;

    if response.versions.is_empty() {
        println!("No versions found for '{}'", response.name);
    } else {
        println!("{:<20} {:<10}", "NAME", "VERSION");
        println!("{}", "-".repeat(30));
        for version in response.versions {
            println!("{:<20} {:<10}", response.name, version);
        }
    }

    Ok(())
}

/// Check whether a model version is available
pub async fn has(client: &ApiClient, name: String, version: VersionSpec) -> Result<()> {
    let response = client.has(&name, version).await?;

    if response.available {
        println!("Model '{}' {} is available", response.name, response.version);
    } else {
        println!("Model '{}' {} is not available", response.name, response.version);
    }

    Ok(())
}

/// Load a model through the daemon
pub async fn load(client: &ApiClient, name: String, version: VersionSpec) -> Result<()> {
    let response = client.load(&name, version).await?;

    println!("Model '{}' {} loaded", response.name, response.version);
    println!("  Size: {} bytes", response.size_bytes);
    println!("  SHA-256: {}", response.digest);

    Ok(())
}

/// Show daemon status
pub async fn status(client: &ApiClient) -> Result<()> {
    let health = client.health().await?;

    println!("modelrepo v{}", health.version);
    println!();
    println!("Status: {}", health.status);
    println!("Repository: {}", health.repository);

    Ok(())
}

/// Upload an artifact file to the remote store configured in `config`
pub async fn publish_artifact(
    config: Option<&Path>,
    name: &str,
    version: VersionTag,
    path: &Path,
) -> Result<String> {
    let config = match config {
        Some(path) => RepositoryConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => RepositoryConfig::default(),
    };

    if !path.is_file() {
        anyhow::bail!("Artifact file not found: {}", path.display());
    }

    let object_store = create_object_store(&config.remote)?;
    let remote = RemoteStore::from_config(
        &config.remote,
        &config.storage.artifact_filename,
        object_store,
        Arc::new(RawArtifactLoader::new()),
    );

    Ok(remote.publish(name, version, path).await?)
}

/// Publish a model version
pub async fn publish(
    config: Option<PathBuf>,
    name: String,
    version: VersionTag,
    path: PathBuf,
) -> Result<()> {
    let key = publish_artifact(config.as_deref(), &name, version, &path).await?;
    println!("Published '{}' {} as {}", name, version, key);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_versions_parses_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/models/classifier/versions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"name": "classifier", "versions": ["v1", "v3"]})),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(&format!("{}/", server.uri()));
        let response = client.versions("classifier").await.unwrap();

        assert_eq!(response.versions, vec![VersionTag::new(1), VersionTag::new(3)]);
    }

    #[tokio::test]
    async fn test_load_reports_daemon_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/models/ghost/versions/latest/load"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Model unavailable"))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri());
        let err = client.load("ghost", VersionSpec::Latest).await.unwrap_err();

        assert!(err.to_string().contains("Model unavailable"));
    }

    #[tokio::test]
    async fn test_has_uses_version_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/models/classifier/versions/v2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"name": "classifier", "version": "v2", "available": true}),
            ))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri());
        let response = client
            .has("classifier", VersionSpec::Exact(VersionTag::new(2)))
            .await
            .unwrap();

        assert!(response.available);
    }

    #[tokio::test]
    async fn test_publish_to_filesystem_bucket() {
        let dir = TempDir::new().unwrap();
        let remote_root = dir.path().join("remote");
        std::fs::create_dir_all(remote_root.join("models")).unwrap();

        let config_path = dir.path().join("modelrepo.toml");
        std::fs::write(
            &config_path,
            format!(
                "[remote]\nbackend = \"filesystem\"\nendpoint = \"{}\"\nbucket = \"models\"\nenvironment = \"dev\"\n",
                remote_root.display()
            ),
        )
        .unwrap();

        let artifact = dir.path().join("weights.h5");
        std::fs::write(&artifact, b"weights").unwrap();

        let key = publish_artifact(Some(&config_path), "classifier", VersionTag::new(5), &artifact)
            .await
            .unwrap();

        assert_eq!(key, "dev/classifier/v5/model.h5");
        assert_eq!(
            std::fs::read(remote_root.join("models").join(&key)).unwrap(),
            b"weights"
        );
    }

    #[tokio::test]
    async fn test_publish_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = publish_artifact(
            None,
            "classifier",
            VersionTag::new(1),
            &dir.path().join("absent.h5"),
        )
        .await;

        assert!(result.is_err());
    }
}
