//! The job registry.
//!
//! Two independent sub-caches so segmenting churn never contends with
//! transcoding push traffic. Critical sections contain map operations
//! only; network calls happen strictly outside the locks, and no caller
//! holds a reference into a cache across a lock scope (lookups clone).

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::warn;
use vodflow_models::StreamName;

use crate::job::{
    JobEntry, PushPhase, RemoveOutcome, SegmentingJob, TranscodeJobInfo,
};

struct TranscodeJob {
    info: TranscodeJobInfo,
    pushes: PushPhase,
}

/// Concurrent store of all in-flight jobs, keyed by stream name.
#[derive(Default)]
pub struct JobRegistry {
    segmenting: Mutex<HashMap<String, SegmentingJob>>,
    transcoding: Mutex<HashMap<String, TranscodeJob>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a segmenting job. The caller guarantees the name is fresh.
    pub fn store_segmenting(&self, stream_name: StreamName, callback_url: impl Into<String>) {
        let job = SegmentingJob {
            callback_url: callback_url.into(),
            stream_name,
        };
        let mut cache = self.segmenting.lock().unwrap();
        if let Some(old) = cache.insert(job.stream_name.as_str().to_string(), job) {
            warn!(stream = %old.stream_name, "segmenting job overwritten; stream name reused");
        }
    }

    /// Insert a transcoding job in the `Created` phase.
    pub fn store_transcoding(&self, info: TranscodeJobInfo) {
        let key = info.stream_name.as_str().to_string();
        let job = TranscodeJob {
            info,
            pushes: PushPhase::Created,
        };
        let mut cache = self.transcoding.lock().unwrap();
        if cache.insert(key, job).is_some() {
            warn!("transcoding job overwritten; stream name reused");
        }
    }

    /// Look up a job. Absence is a recoverable "unknown stream" condition
    /// (late or duplicate trigger), not a fault.
    pub fn get(&self, stream_name: &str) -> Option<JobEntry> {
        if let Some(job) = self.transcoding.lock().unwrap().get(stream_name) {
            return Some(JobEntry::Transcoding(job.info.clone()));
        }
        self.segmenting
            .lock()
            .unwrap()
            .get(stream_name)
            .map(|job| JobEntry::Segmenting(job.clone()))
    }

    /// Register an in-flight push destination on a transcoding job.
    /// Returns false when the job is unknown or already complete.
    pub fn add_destination(&self, stream_name: &str, destination: &str) -> bool {
        let mut cache = self.transcoding.lock().unwrap();
        match cache.get_mut(stream_name) {
            Some(job) => job.pushes.add(destination),
            None => false,
        }
    }

    /// Confirm a push destination. The drained flag comes back atomically
    /// with the removal, so two concurrent PUSH_END deliveries can never
    /// both observe an empty set.
    pub fn remove_destination(&self, stream_name: &str, destination: &str) -> RemoveOutcome {
        let mut cache = self.transcoding.lock().unwrap();
        match cache.get_mut(stream_name) {
            Some(job) => job.pushes.remove(destination),
            None => RemoveOutcome::UnknownStream,
        }
    }

    /// Drop a job from whichever cache holds it. Idempotent.
    pub fn remove(&self, stream_name: &str) {
        if self.transcoding.lock().unwrap().remove(stream_name).is_some() {
            return;
        }
        self.segmenting.lock().unwrap().remove(stream_name);
    }

    /// Total number of live jobs, for admission control.
    pub fn len(&self) -> usize {
        self.segmenting.lock().unwrap().len() + self.transcoding.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
