//! Engine trigger payloads.
//!
//! The engine delivers webhooks as newline-joined plain-text fields, not
//! JSON. The parsers here turn those lossy bodies into typed payloads; a
//! malformed body is a recoverable request error, never a panic.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Trigger types the dispatcher understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerType {
    /// Fires once per push when it terminates. Asynchronous: the engine
    /// ignores the HTTP response.
    PushEnd,
    /// Fires once when the engine has discovered the source's tracks.
    /// Synchronous: the engine blocks on the response and never re-delivers.
    LiveTrackList,
}

impl TriggerType {
    pub fn from_header(value: &str) -> Option<Self> {
        match value {
            "PUSH_END" => Some(TriggerType::PushEnd),
            "LIVE_TRACK_LIST" => Some(TriggerType::LiveTrackList),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerType::PushEnd => "PUSH_END",
            TriggerType::LiveTrackList => "LIVE_TRACK_LIST",
        }
    }
}

pub type PayloadResult<T> = Result<T, PayloadError>;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("trigger payload missing field: {0}")]
    MissingField(&'static str),

    #[error("malformed track list: {0}")]
    MalformedTrackList(#[from] serde_json::Error),
}

/// One track as described by a LIVE_TRACK_LIST payload. Keys we do not use
/// (codec details, timing) are ignored on purpose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackInfo {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub trackid: u64,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub fpks: u64,
}

impl TrackInfo {
    pub fn is_video(&self) -> bool {
        self.kind == "video"
    }
}

/// Parsed LIVE_TRACK_LIST body: stream name, then either the literal
/// `null` (the source has ended) or a JSON object of tracks keyed by
/// opaque track IDs.
#[derive(Debug, Clone)]
pub struct LiveTrackListPayload {
    pub stream_name: String,
    /// `None` means the engine sent `null`: the stream is over.
    pub tracks: Option<HashMap<String, TrackInfo>>,
}

impl LiveTrackListPayload {
    pub fn parse(body: &str) -> PayloadResult<Self> {
        let mut lines = body.splitn(2, '\n');
        let stream_name = lines
            .next()
            .filter(|l| !l.is_empty())
            .ok_or(PayloadError::MissingField("stream name"))?
            .to_string();
        let track_list = lines
            .next()
            .map(str::trim)
            .ok_or(PayloadError::MissingField("track list"))?;

        let tracks = if track_list == "null" {
            None
        } else {
            Some(serde_json::from_str(track_list)?)
        };

        Ok(Self {
            stream_name,
            tracks,
        })
    }
}

/// Parsed PUSH_END body: six newline-joined fields, of which we use the
/// stream name (2), configured destination (3), actual destination (4)
/// and last status (6). `null` status means the push succeeded.
#[derive(Debug, Clone)]
pub struct PushEndPayload {
    pub stream_name: String,
    pub configured_destination: String,
    pub actual_destination: String,
    pub last_status: Option<String>,
}

impl PushEndPayload {
    pub fn parse(body: &str) -> PayloadResult<Self> {
        // The status blob in field six may itself contain newlines.
        let lines: Vec<&str> = body.splitn(6, '\n').collect();
        if lines.len() < 6 {
            return Err(PayloadError::MissingField("expected six fields"));
        }

        let last_status = lines[5].trim();
        let last_status = if last_status == "null" || last_status.is_empty() {
            None
        } else {
            Some(last_status.to_string())
        };

        Ok(Self {
            stream_name: lines[1].to_string(),
            configured_destination: lines[2].to_string(),
            actual_destination: lines[3].to_string(),
            last_status,
        })
    }

    /// Whether the engine reported the push as successful.
    pub fn is_success(&self) -> bool {
        self.last_status.is_none()
    }
}
