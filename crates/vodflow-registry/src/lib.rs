//! Concurrent in-memory job registry.
//!
//! This crate provides:
//! - Lock-guarded caches for segmenting and transcoding jobs
//! - The per-job push state machine (Created -> InFlight -> Complete)
//! - Atomic destination removal with drain detection

pub mod job;
pub mod registry;

pub use job::{JobEntry, PushPhase, RemoveOutcome, SegmentingJob, TranscodeJobInfo};
pub use registry::JobRegistry;
