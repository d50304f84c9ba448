//! Shared data models for the VOD coordinator.
//!
//! This crate provides Serde-serializable types for:
//! - Stream names and their segmenting/transcoding convention
//! - Requested encoding profiles
//! - Transcode status reported to caller callbacks
//! - Engine trigger payloads (line-oriented webhook bodies)

pub mod profile;
pub mod status;
pub mod stream_name;
pub mod triggers;

// Re-export common types
pub use profile::EncodedProfile;
pub use status::TranscodeStatus;
pub use stream_name::{StreamKind, StreamName};
pub use triggers::{
    LiveTrackListPayload, PayloadError, PushEndPayload, TrackInfo, TriggerType,
};
