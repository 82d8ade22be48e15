//! HTTP object store
//!
//! Speaks the JSON object API used by Google Cloud Storage and its
//! emulators:
//! - `GET  {endpoint}/storage/v1/b/{bucket}/o?prefix=..&pageToken=..` lists objects
//! - `GET  {endpoint}/storage/v1/b/{bucket}/o/{key}?alt=media` downloads one
//! - `POST {endpoint}/upload/storage/v1/b/{bucket}/o?uploadType=media&name={key}` uploads one

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use modelrepo_core::{RepoError, RepoResult};
use reqwest::{header, RequestBuilder, Url};
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::object_store::{ObjectMeta, ObjectStore};

/// One page of a listing response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage {
    #[serde(default)]
    items: Vec<ListItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListItem {
    name: String,
    #[serde(default, deserialize_with = "size_from_string_or_number")]
    size: u64,
    updated: Option<DateTime<Utc>>,
}

/// The API encodes sizes as decimal strings; emulators sometimes send numbers.
fn size_from_string_or_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Text(String),
        Number(u64),
    }

    match Size::deserialize(deserializer)? {
        Size::Number(n) => Ok(n),
        Size::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// Object store client over HTTP
pub struct HttpObjectStore {
    /// HTTP client
    client: reqwest::Client,
    /// API base URL
    endpoint: Url,
    /// Bucket holding the objects
    bucket: String,
    /// Bearer token sent with every request
    access_token: Option<String>,
}

impl HttpObjectStore {
    /// Create a new client for `bucket` at `endpoint`
    pub fn new(
        endpoint: &str,
        bucket: &str,
        access_token: Option<String>,
        timeout_secs: u64,
    ) -> RepoResult<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| RepoError::Config(format!("Invalid object store endpoint '{}': {}", endpoint, e)))?;
        if endpoint.cannot_be_a_base() {
            return Err(RepoError::Config(format!(
                "Object store endpoint cannot be a base URL: {}",
                endpoint
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(RepoError::remote)?;

        Ok(Self {
            client,
            endpoint,
            bucket: bucket.to_string(),
            access_token,
        })
    }

    fn url_with(&self, segments: &[&str]) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments);
        }
        url
    }

    fn objects_url(&self) -> Url {
        self.url_with(&["storage", "v1", "b", self.bucket.as_str(), "o"])
    }

    /// The key is a single path segment, so `/` inside it is percent-encoded
    fn object_url(&self, key: &str) -> Url {
        self.url_with(&["storage", "v1", "b", self.bucket.as_str(), "o", key])
    }

    fn upload_url(&self) -> Url {
        self.url_with(&["upload", "storage", "v1", "b", self.bucket.as_str(), "o"])
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn list(&self, prefix: &str) -> RepoResult<Vec<ObjectMeta>> {
        let mut objects = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(self.objects_url())
                .query(&[("prefix", prefix)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: ListPage = self
                .authorize(request)
                .send()
                .await
                .map_err(RepoError::remote)?
                .error_for_status()
                .map_err(RepoError::remote)?
                .json()
                .await
                .map_err(RepoError::remote)?;

            objects.extend(page.items.into_iter().map(|item| ObjectMeta {
                key: item.name,
                size: item.size,
                updated: item.updated,
            }));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        debug!(prefix = prefix, count = objects.len(), "Listed remote objects");
        Ok(objects)
    }

    async fn download(&self, key: &str, dest: &Path) -> RepoResult<u64> {
        let request = self
            .client
            .get(self.object_url(key))
            .query(&[("alt", "media")]);

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(RepoError::remote)?
            .error_for_status()
            .map_err(RepoError::remote)?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(RepoError::remote)?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(key = key, bytes = written, "Downloaded object");
        Ok(written)
    }

    async fn upload(&self, src: &Path, key: &str) -> RepoResult<()> {
        let body = tokio::fs::read(src).await?;
        let size = body.len();

        let request = self
            .client
            .post(self.upload_url())
            .query(&[("uploadType", "media"), ("name", key)])
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(body);

        self.authorize(request)
            .send()
            .await
            .map_err(RepoError::remote)?
            .error_for_status()
            .map_err(RepoError::remote)?;

        info!(key = key, bytes = size, "Uploaded object");
        Ok(())
    }

    fn location(&self) -> String {
        format!("gs://{}", self.bucket)
    }
}
