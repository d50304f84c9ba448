//! Transcode status values reported to caller callbacks.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a job as seen by the caller's callback URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscodeStatus {
    Preparing,
    Transcoding,
    Success,
    Error,
}

impl TranscodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscodeStatus::Preparing => "preparing",
            TranscodeStatus::Transcoding => "transcoding",
            TranscodeStatus::Success => "success",
            TranscodeStatus::Error => "error",
        }
    }
}

impl fmt::Display for TranscodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
