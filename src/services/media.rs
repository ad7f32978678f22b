use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tracing::debug;

/// Credentials for the third-party media host.
#[derive(Clone, Debug)]
pub struct MediaHostConfig {
    pub base_url: String,
    pub api_key: String,
}

impl MediaHostConfig {
    /// Reads credentials from the environment. Returns `None` when they
    /// are absent, in which case the client degrades to a no-op.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("MEDIA_API_URL").ok()?;
        let api_key = std::env::var("MEDIA_API_KEY").ok()?;
        Some(Self { base_url, api_key })
    }
}

/// A hosted asset as reported back by the media host.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedImage {
    /// Stable public URL
    pub url: String,
    /// Provider-assigned identifier used for deletion
    pub public_id: String,
}

/// Thin client for the media host that stores listing images.
#[derive(Clone, Debug)]
pub struct MediaClient {
    http: reqwest::Client,
    config: Option<MediaHostConfig>,
}

impl MediaClient {
    pub fn new(config: Option<MediaHostConfig>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Uploads a binary buffer into the given folder, returning the
    /// hosted URL and the deletable identifier.
    pub async fn upload(&self, data: Vec<u8>, folder: &str) -> Result<UploadedImage> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| anyhow!("media host is not configured"))?;

        let response = self
            .http
            .post(format!("{}/v1/upload", config.base_url))
            .bearer_auth(&config.api_key)
            .query(&[("folder", folder)])
            .body(data)
            .send()
            .await
            .context("media host upload request failed")?
            .error_for_status()
            .context("media host rejected the upload")?;

        response
            .json::<UploadedImage>()
            .await
            .context("media host returned an unexpected upload response")
    }

    /// Deletes a hosted asset by its public identifier. Idempotent: an
    /// already-deleted asset counts as deleted, and the call is safe to
    /// retry. A logged no-op when the host is not configured.
    pub async fn delete(&self, public_id: &str) -> Result<()> {
        let Some(config) = self.config.as_ref() else {
            debug!(
                "media host not configured, skipping deletion of {}",
                public_id
            );
            return Ok(());
        };

        let response = self
            .http
            .delete(format!("{}/v1/media/{}", config.base_url, public_id))
            .bearer_auth(&config.api_key)
            .send()
            .await
            .context("media host deletion request failed")?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }

        response
            .error_for_status()
            .context("media host rejected the deletion")?;
        Ok(())
    }
}
