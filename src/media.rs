//! Media upload adapter.
//!
//! Thin client for the external object-upload service: hand it a local
//! file, get back the public URL. The service is opaque to the rest of the
//! system; nothing here knows or cares what storage sits behind it.

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;
use url::Url;

use crate::config::MediaConfig;

/// Result of a successful upload.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedMedia {
    /// Public URL of the stored object.
    pub url: String,
}

/// Client for the external object-upload service.
#[derive(Clone)]
pub struct MediaStore {
    endpoint: Url,
    http: reqwest::Client,
}

impl MediaStore {
    /// Create a media store client for the configured endpoint.
    pub fn new(config: MediaConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.upload_url)
            .with_context(|| format!("invalid media upload url: {}", config.upload_url))?;
        Ok(Self {
            endpoint,
            http: reqwest::Client::new(),
        })
    }

    /// Upload a locally staged file, returning its public URL.
    pub async fn upload(&self, local_path: &Path) -> Result<UploadedMedia> {
        let bytes = tokio::fs::read(local_path)
            .await
            .with_context(|| format!("failed to read upload file {}", local_path.display()))?;

        let file_name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .context("media upload request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "media upload rejected with status {}",
                response.status()
            ));
        }

        let uploaded: UploadedMedia = response
            .json()
            .await
            .context("media upload response was not valid JSON")?;

        debug!(url = %uploaded.url, "media upload succeeded");
        Ok(uploaded)
    }
}
