//! S3 object store
//!
//! Lists with `ListObjectsV2` and transfers whole objects. Credentials come
//! from the configuration when given, otherwise from the standard AWS
//! environment (`AWS_ACCESS_KEY_ID`, container task roles, ...).

use ::object_store::aws::{AmazonS3, AmazonS3Builder};
use ::object_store::path::Path as ObjectPath;
use ::object_store::{ClientOptions, ObjectStore as _, PutPayload};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use modelrepo_core::{RemoteConfig, RepoError, RepoResult};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::object_store::{ObjectMeta, ObjectStore};

/// Object store client for an S3 bucket
pub struct S3ObjectStore {
    client: AmazonS3,
    bucket: String,
}

impl S3ObjectStore {
    /// Build a client from the remote configuration
    pub fn from_config(config: &RemoteConfig) -> RepoResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region)
            .with_client_options(
                ClientOptions::new().with_timeout(Duration::from_secs(config.timeout_secs)),
            );

        if let Some(endpoint) = &config.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }
        if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            builder = builder
                .with_access_key_id(key_id)
                .with_secret_access_key(secret);
        }

        let client = builder.build().map_err(|e| {
            RepoError::Config(format!("Invalid S3 settings for bucket '{}': {}", config.bucket, e))
        })?;

        info!(
            bucket = %config.bucket,
            region = %config.region,
            endpoint = ?config.endpoint,
            "Created S3 client"
        );

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list(&self, prefix: &str) -> RepoResult<Vec<ObjectMeta>> {
        // Listing is segment-wise, so `dev/m/` never matches `dev/m_other/...`
        let prefix_path = ObjectPath::from(prefix.trim_end_matches('/'));

        let listed: Vec<_> = self
            .client
            .list(Some(&prefix_path))
            .try_collect()
            .await
            .map_err(RepoError::remote)?;

        let mut objects: Vec<ObjectMeta> = listed
            .into_iter()
            .map(|meta| ObjectMeta {
                key: meta.location.to_string(),
                size: meta.size as u64,
                updated: Some(meta.last_modified),
            })
            .filter(|object| object.key.starts_with(prefix))
            .collect();

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        debug!(prefix = prefix, count = objects.len(), "Listed S3 objects");
        Ok(objects)
    }

    async fn download(&self, key: &str, dest: &Path) -> RepoResult<u64> {
        let result = self
            .client
            .get(&ObjectPath::from(key))
            .await
            .map_err(RepoError::remote)?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        let mut stream = result.into_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(RepoError::remote)?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(key = key, bytes = written, "Downloaded S3 object");
        Ok(written)
    }

    async fn upload(&self, src: &Path, key: &str) -> RepoResult<()> {
        let body = tokio::fs::read(src).await?;
        let size = body.len();

        self.client
            .put(&ObjectPath::from(key), PutPayload::from(body))
            .await
            .map_err(RepoError::remote)?;

        info!(key = key, bytes = size, "Uploaded S3 object");
        Ok(())
    }

    fn location(&self) -> String {
        format!("s3://{}", self.bucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(endpoint: &str) -> RemoteConfig {
        RemoteConfig {
            bucket: "models".to_string(),
            region: "us-east-2".to_string(),
            endpoint: Some(endpoint.to_string()),
            access_key_id: Some("test-key".to_string()),
            secret_access_key: Some("test-secret".to_string()),
            timeout_secs: 5,
            ..RemoteConfig::default()
        }
    }

    const LISTING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>models</Name>
  <Prefix>dev/m/</Prefix>
  <KeyCount>2</KeyCount>
  <MaxKeys>1000</MaxKeys>
  <IsTruncated>false</IsTruncated>
  <Contents>
    <Key>dev/m/v2/model.h5</Key>
    <LastModified>2024-05-01T10:00:00.000Z</LastModified>
    <ETag>"b"</ETag>
    <Size>1024</Size>
    <StorageClass>STANDARD</StorageClass>
  </Contents>
  <Contents>
    <Key>dev/m/v1/model.h5</Key>
    <LastModified>2024-04-01T10:00:00.000Z</LastModified>
    <ETag>"a"</ETag>
    <Size>3</Size>
    <StorageClass>STANDARD</StorageClass>
  </Contents>
</ListBucketResult>"#;

    #[test]
    fn test_location() {
        let store = S3ObjectStore::from_config(&config("http://localhost:4566")).unwrap();
        assert_eq!(store.location(), "s3://models");
    }

    #[tokio::test]
    async fn test_list_objects_v2() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .and(query_param("list-type", "2"))
            .and(query_param("prefix", "dev/m/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/xml")
                    .set_body_string(LISTING),
            )
            .mount(&mock_server)
            .await;

        let store = S3ObjectStore::from_config(&config(&mock_server.uri())).unwrap();
        let objects = store.list("dev/m/").await.unwrap();

        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].key, "dev/m/v1/model.h5");
        assert_eq!(objects[0].size, 3);
        assert_eq!(objects[1].key, "dev/m/v2/model.h5");
        assert_eq!(objects[1].size, 1024);
        assert!(objects[1].updated.is_some());
    }

    #[tokio::test]
    async fn test_list_error_is_remote_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(403).set_body_string(
                "<Error><Code>AccessDenied</Code><Message>Access Denied</Message></Error>",
            ))
            .mount(&mock_server)
            .await;

        let store = S3ObjectStore::from_config(&config(&mock_server.uri())).unwrap();
        let err = store.list("dev/m/").await.unwrap_err();
        assert!(matches!(err, RepoError::Remote(_)));
    }

    #[tokio::test]
    async fn test_download_writes_file() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models/dev/m/v1/model.h5"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("etag", "\"a\"")
                    .insert_header("last-modified", "Mon, 01 Apr 2024 10:00:00 GMT")
                    .set_body_bytes(b"weights".to_vec()),
            )
            .mount(&mock_server)
            .await;

        let store = S3ObjectStore::from_config(&config(&mock_server.uri())).unwrap();
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("model.h5");

        let written = store.download("dev/m/v1/model.h5", &dest).await.unwrap();
        assert_eq!(written, 7);
        assert_eq!(std::fs::read(dest).unwrap(), b"weights");
    }

    #[tokio::test]
    async fn test_upload_puts_object() {
        let mock_server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/models/dev/m/v3/model.h5"))
            .respond_with(ResponseTemplate::new(200).insert_header("etag", "\"c\""))
            .expect(1)
            .mount(&mock_server)
            .await;

        let dir = TempDir::new().unwrap();
        let src = dir.path().join("model.h5");
        std::fs::write(&src, b"weights").unwrap();

        let store = S3ObjectStore::from_config(&config(&mock_server.uri())).unwrap();
        store.upload(&src, "dev/m/v3/model.h5").await.unwrap();
    }
}
