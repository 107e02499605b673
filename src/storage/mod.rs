//! Object storage client for uploaded media.
//!
//! [`SupabaseStorage`] implements the player's [`ObjectStorage`] port against
//! a Supabase-style storage REST API. [`UnconfiguredStorage`] stands in when
//! no storage service is configured, so stored-file records fail to resolve
//! instead of the server refusing to start.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use marquee_player::ports::{ObjectStorage, StorageError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::StorageConfig;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Deadline for signing and deletes. Uploads carry whole video files and are
/// bounded only by the connect timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const UPLOAD_CACHE_CONTROL: &str = "3600";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignRequest {
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL", alias = "signedUrl")]
    signed_url: String,
}

#[derive(Debug, Serialize)]
struct RemoveRequest<'a> {
    prefixes: [&'a str; 1],
}

/// Storage client bound to one bucket.
#[derive(Clone)]
pub struct SupabaseStorage {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    bucket: String,
    request_timeout: Duration,
}

impl std::fmt::Debug for SupabaseStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseStorage")
            .field("base_url", &self.base_url)
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl SupabaseStorage {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        bucket: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| StorageError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            bucket: bucket.into(),
            request_timeout: REQUEST_TIMEOUT,
        })
    }

    /// Override the deadline applied to sign and remove requests.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Build from the `[storage]` config section, `None` when no service is set.
    pub fn from_config(config: &StorageConfig) -> Result<Option<Self>, StorageError> {
        match &config.base_url {
            Some(base_url) => Self::new(base_url, config.api_key.clone(), &config.bucket).map(Some),
            None => Ok(None),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_url(&self, prefix: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{prefix}{}/{}",
            self.base_url,
            self.bucket,
            encode_path(path)
        )
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key).header("apikey", key),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, StorageError> {
        let resp = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(StorageError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp)
    }
}

/// Percent-encode each segment of an object path, keeping the separators.
fn encode_path(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn public_url(&self, path: &str) -> Result<String, StorageError> {
        Ok(self.object_url("public/", path))
    }

    async fn signed_url(
        &self,
        path: &str,
        expires_in: Duration,
    ) -> Result<Option<String>, StorageError> {
        let request = self
            .client
            .post(self.object_url("sign/", path))
            .timeout(self.request_timeout)
            .json(&SignRequest {
                expires_in: expires_in.as_secs(),
            });

        let resp = match self.send(request).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(path, error = %e, "Error creating signed URL");
                return Ok(None);
            }
        };

        match resp.json::<SignResponse>().await {
            Ok(body) => {
                let signed = if body.signed_url.starts_with("http") {
                    body.signed_url
                } else {
                    format!("{}/storage/v1{}", self.base_url, body.signed_url)
                };
                Ok(Some(signed))
            }
            Err(e) => {
                warn!(path, error = %e, "Malformed signed URL response");
                Ok(None)
            }
        }
    }

    async fn upload(
        &self,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        debug!(path, size = bytes.len(), content_type, "Uploading object");
        let request = self
            .client
            .post(self.object_url("", path))
            .header("content-type", content_type)
            .header("cache-control", UPLOAD_CACHE_CONTROL)
            .header("x-upsert", "false")
            .body(bytes);
        self.send(request).await.map(|_| ())
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        debug!(path, "Removing object");
        let url = format!("{}/storage/v1/object/{}", self.base_url, self.bucket);
        let request = self
            .client
            .delete(url)
            .timeout(self.request_timeout)
            .json(&RemoveRequest { prefixes: [path] });
        self.send(request).await.map(|_| ())
    }
}

/// Storage port used when no storage service is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredStorage;

#[async_trait]
impl ObjectStorage for UnconfiguredStorage {
    async fn public_url(&self, _path: &str) -> Result<String, StorageError> {
        Err(StorageError::NotConfigured("no [storage] base_url".into()))
    }

    async fn signed_url(
        &self,
        _path: &str,
        _expires_in: Duration,
    ) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    async fn upload(&self, _path: &str, _bytes: Bytes, _content_type: &str) -> Result<(), StorageError> {
        Err(StorageError::NotConfigured("no [storage] base_url".into()))
    }

    async fn remove(&self, _path: &str) -> Result<(), StorageError> {
        Err(StorageError::NotConfigured("no [storage] base_url".into()))
    }
}
