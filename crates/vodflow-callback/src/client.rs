//! Callback HTTP client.

use std::time::Duration;

use reqwest::Client;
use tracing::warn;
use vodflow_models::TranscodeStatus;

use crate::messages::CallbackMessage;

/// Configuration for the callback client.
#[derive(Debug, Clone)]
pub struct CallbackConfig {
    /// Request timeout per callback POST
    pub timeout: Duration,
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

impl CallbackConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            timeout: Duration::from_secs(
                std::env::var("CALLBACK_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }
}

/// Fire-and-forget POSTs to caller callback URLs. Failures are logged and
/// swallowed; delivery is best-effort by contract.
pub struct CallbackClient {
    http: Client,
}

impl CallbackClient {
    /// Create a new callback client.
    pub fn new(config: CallbackConfig) -> reqwest::Result<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http })
    }

    /// Create from environment variables.
    pub fn from_env() -> reqwest::Result<Self> {
        Self::new(CallbackConfig::from_env())
    }

    /// Report overall transcode progress.
    pub async fn send_transcode_status(
        &self,
        url: &str,
        status: TranscodeStatus,
        completion_ratio: f64,
    ) {
        self.post(
            url,
            &CallbackMessage::TranscodeStatus {
                status,
                completion_ratio,
            },
        )
        .await;
    }

    /// Report a segmenting job's intermediate status.
    pub async fn send_segment_transcode_status(&self, url: &str, source: &str) {
        self.post(
            url,
            &CallbackMessage::SegmentTranscodeStatus {
                source: source.to_string(),
                status: TranscodeStatus::Transcoding,
            },
        )
        .await;
    }

    /// Report one rendition delivered.
    pub async fn send_rendition_upload(&self, url: &str, source: &str, destination: &str) {
        self.post(
            url,
            &CallbackMessage::RenditionUpload {
                source: source.to_string(),
                destination: destination.to_string(),
            },
        )
        .await;
    }

    /// Report one rendition push failure with the engine's raw status blob.
    pub async fn send_rendition_upload_error(
        &self,
        url: &str,
        source: &str,
        destination: &str,
        error: &str,
    ) {
        self.post(
            url,
            &CallbackMessage::RenditionUploadError {
                source: source.to_string(),
                destination: destination.to_string(),
                error: error.to_string(),
            },
        )
        .await;
    }

    async fn post(&self, url: &str, message: &CallbackMessage) {
        let result = self.http.post(url).json(message).send().await;
        match result {
            Ok(response) if !response.status().is_success() => {
                warn!(url, status = %response.status(), "callback receiver answered non-2xx");
            }
            Ok(_) => {}
            Err(e) => {
                warn!(url, error = %e, "callback delivery failed");
            }
        }
    }
}
