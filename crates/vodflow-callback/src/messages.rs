//! Callback message schemas.

use serde::{Deserialize, Serialize};
use vodflow_models::TranscodeStatus;

/// One status message POSTed to a caller's callback URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallbackMessage {
    /// Overall transcode progress; `completion_ratio` is 0.0..=1.0 and
    /// reaches 1.0 exactly once, on the terminal message.
    TranscodeStatus {
        status: TranscodeStatus,
        completion_ratio: f64,
    },
    /// Intermediate status for a segmenting job whose push finished.
    SegmentTranscodeStatus {
        source: String,
        status: TranscodeStatus,
    },
    /// One rendition landed at its destination.
    RenditionUpload {
        source: String,
        destination: String,
    },
    /// One rendition push failed; `error` is the engine's raw status blob.
    RenditionUploadError {
        source: String,
        destination: String,
        error: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_shape() {
        let message = CallbackMessage::TranscodeStatus {
            status: TranscodeStatus::Success,
            completion_ratio: 1.0,
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "transcode_status");
        assert_eq!(value["status"], "success");
        assert_eq!(value["completion_ratio"], 1.0);
    }
}
