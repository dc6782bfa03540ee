//! Client side of the validation backend's REST API.
//!
//! The backend reports rejections inside the JSON body, so responses are
//! decoded whatever their HTTP status. Only a failed exchange or a body that
//! is not the expected JSON is an error.

use std::time::Duration;

use archive_validator_core::model::{UploadOutcome, ValidationOutcome};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::config::ServiceConfig;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("response from {url} is not valid JSON: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The two calls the bridge makes to the backend. Each is exactly one
/// outbound request, never retried here.
#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn upload(&self, archive: Vec<u8>, digest: &str) -> Result<UploadOutcome, BackendError>;

    async fn fetch_report(&self, url: &str) -> Result<ValidationOutcome, BackendError>;
}

/// reqwest-based backend client.
pub struct HttpBackend {
    client: reqwest::Client,
    upload_endpoint: String,
    force_https: bool,
}

impl HttpBackend {
    pub fn new(config: &ServiceConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.backend_timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            upload_endpoint: config.backend_endpoint.clone(),
            force_https: config.force_https,
        })
    }

    async fn decode<T: DeserializeOwned>(
        url: &str,
        resp: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<T, BackendError> {
        let transport = |source| BackendError::Transport {
            url: url.to_string(),
            source,
        };
        let resp = resp.map_err(transport)?;
        debug!(url, status = %resp.status(), "backend responded");
        let body = resp.bytes().await.map_err(transport)?;
        serde_json::from_slice(&body).map_err(|source| BackendError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl BackendClient for HttpBackend {
    async fn upload(&self, archive: Vec<u8>, digest: &str) -> Result<UploadOutcome, BackendError> {
        let size = archive.len();
        let package = Part::bytes(archive)
            .file_name("archive.zip")
            .mime_str("application/octet-stream")
            .map_err(|source| BackendError::Transport {
                url: self.upload_endpoint.clone(),
                source,
            })?;
        let form = Form::new()
            .part("package", package)
            .text("digest", digest.to_string());

        debug!(endpoint = %self.upload_endpoint, size, "uploading archive");
        let resp = self
            .client
            .post(&self.upload_endpoint)
            .multipart(form)
            .send()
            .await;
        Self::decode(&self.upload_endpoint, resp).await
    }

    async fn fetch_report(&self, url: &str) -> Result<ValidationOutcome, BackendError> {
        let url = secure_url(url, self.force_https);
        debug!(%url, "fetching validation report");
        let resp = self.client.get(&url).send().await;
        Self::decode(&url, resp).await
    }
}

/// Rewrites a plain-http URL to https when `force` is set.
pub fn secure_url(url: &str, force: bool) -> String {
    match url.strip_prefix("http://") {
        Some(rest) if force => format!("https://{rest}"),
        _ => url.to_string(),
    }
}
