//! Job entries and the push state machine.

use std::collections::HashSet;

use vodflow_models::{EncodedProfile, StreamName};

/// A segmenting job: repackage a source into segments, no transcoding.
#[derive(Debug, Clone)]
pub struct SegmentingJob {
    pub stream_name: StreamName,
    pub callback_url: String,
}

/// Static description of a transcoding job. The mutable push state lives
/// next to it inside the registry, never in handler scope.
#[derive(Debug, Clone)]
pub struct TranscodeJobInfo {
    pub stream_name: StreamName,
    pub callback_url: String,
    pub source_url: String,
    /// Directory (usually an object-store URL) receiving rendition pushes.
    pub upload_dir: String,
    pub profiles: Vec<EncodedProfile>,
}

/// Push progress of a transcoding job.
///
/// `Complete` is reachable only from `InFlight`, so an empty destination
/// set observed before any push started can never read as completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushPhase {
    /// No push has been attempted yet.
    Created,
    /// At least one push is outstanding; the set holds destination URLs.
    InFlight(HashSet<String>),
    /// Every destination that was ever added has confirmed completion.
    Complete,
}

impl PushPhase {
    /// Register a destination. Returns false if the phase cannot accept
    /// one (already complete).
    pub(crate) fn add(&mut self, destination: &str) -> bool {
        match self {
            PushPhase::Created => {
                let mut set = HashSet::new();
                set.insert(destination.to_string());
                *self = PushPhase::InFlight(set);
                true
            }
            PushPhase::InFlight(set) => {
                set.insert(destination.to_string());
                true
            }
            PushPhase::Complete => false,
        }
    }

    /// Confirm a destination. Transitions to `Complete` when the last one
    /// drains; the drained flag is decided inside the same mutation.
    pub(crate) fn remove(&mut self, destination: &str) -> RemoveOutcome {
        match self {
            PushPhase::Created | PushPhase::Complete => RemoveOutcome::UnknownDestination,
            PushPhase::InFlight(set) => {
                if !set.remove(destination) {
                    return RemoveOutcome::UnknownDestination;
                }
                if set.is_empty() {
                    *self = PushPhase::Complete;
                    RemoveOutcome::Removed { drained: true }
                } else {
                    RemoveOutcome::Removed { drained: false }
                }
            }
        }
    }
}

/// Outcome of a destination removal, reported atomically with the removal
/// itself so concurrent PUSH_END deliveries cannot race a check-then-act.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The destination was tracked and is now gone. `drained` is true for
    /// exactly one removal per job: the one that emptied the set.
    Removed { drained: bool },
    /// The stream is known but the destination is not tracked (late,
    /// duplicate, or inconsistent trigger).
    UnknownDestination,
    /// No job under that stream name.
    UnknownStream,
}

/// Registry lookup result: the union tag replaces stream-name prefix
/// sniffing for trigger routing.
#[derive(Debug, Clone)]
pub enum JobEntry {
    Segmenting(SegmentingJob),
    Transcoding(TranscodeJobInfo),
}
