//! Generated stream names.
//!
//! Every job owns a freshly generated, globally unique stream name. The
//! prefix records what the stream was created for; routing decisions are
//! made from the registry entry, not by re-parsing the prefix.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix for plain segmenting streams.
pub const SEGMENTING_PREFIX: &str = "vod_";
/// Prefix for transcoding source streams.
pub const TRANSCODING_PREFIX: &str = "vodtc_";

/// What a stream was created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Segmenting,
    Transcoding,
}

/// A generated, globally unique engine stream name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamName(String);

impl StreamName {
    /// Generate a fresh stream name for the given kind.
    ///
    /// UUIDv4 makes collisions practically impossible; a collision would
    /// silently merge two jobs' state, so nothing else may construct names.
    pub fn generate(kind: StreamKind) -> Self {
        let prefix = match kind {
            StreamKind::Segmenting => SEGMENTING_PREFIX,
            StreamKind::Transcoding => TRANSCODING_PREFIX,
        };
        Self(format!("{}{}", prefix, Uuid::new_v4().simple()))
    }

    /// Wrap a stream name echoed back by the engine in a trigger payload.
    pub fn from_trigger(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Kind according to the naming convention, if the name carries one.
    /// Used for log context only.
    pub fn kind(&self) -> Option<StreamKind> {
        if self.0.starts_with(TRANSCODING_PREFIX) {
            Some(StreamKind::Transcoding)
        } else if self.0.starts_with(SEGMENTING_PREFIX) {
            Some(StreamKind::Segmenting)
        } else {
            None
        }
    }
}

impl fmt::Display for StreamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_names_are_unique() {
        let a = StreamName::generate(StreamKind::Segmenting);
        let b = StreamName::generate(StreamKind::Segmenting);
        assert_ne!(a, b);
    }

    #[test]
    fn test_prefix_reflects_kind() {
        let seg = StreamName::generate(StreamKind::Segmenting);
        assert!(seg.as_str().starts_with(SEGMENTING_PREFIX));
        assert_eq!(seg.kind(), Some(StreamKind::Segmenting));

        let tc = StreamName::generate(StreamKind::Transcoding);
        assert!(tc.as_str().starts_with(TRANSCODING_PREFIX));
        assert_eq!(tc.kind(), Some(StreamKind::Transcoding));
    }

    #[test]
    fn test_foreign_name_has_no_kind() {
        let name = StreamName::from_trigger("somebody_elses_stream");
        assert_eq!(name.kind(), None);
    }
}
