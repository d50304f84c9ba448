//! Requested rendition descriptors.

use serde::{Deserialize, Serialize};

/// One requested output rendition. Immutable for the lifetime of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedProfile {
    /// Rendition name, e.g. `720p`.
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Target bitrate in bits per second.
    #[serde(default)]
    pub bitrate: u64,
    #[serde(default)]
    pub fps: u32,
}

impl EncodedProfile {
    /// Pick the requested profile closest to an observed track, by pixel
    /// area. Returns `None` when no profiles were requested.
    pub fn closest<'a>(profiles: &'a [Self], width: u32, height: u32) -> Option<&'a Self> {
        let area = i64::from(width) * i64::from(height);
        profiles.iter().min_by_key(|p| {
            let candidate = i64::from(p.width) * i64::from(p.height);
            (candidate - area).abs()
        })
    }
}
