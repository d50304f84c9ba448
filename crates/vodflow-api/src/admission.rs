//! Admission control for job-creation endpoints.
//!
//! Bounds concurrently in-flight jobs to protect the engine from
//! overload. This is a soft capacity signal: the gap between the check
//! and the registry insert is accepted in exchange for simplicity.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts requests between admission and job registration, on top of a
/// live query of registry size supplied by the caller.
pub struct AdmissionController {
    max_jobs: usize,
    in_flight: AtomicUsize,
}

impl AdmissionController {
    pub fn new(max_jobs: usize) -> Self {
        Self {
            max_jobs,
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Admit one request, or `None` when `current_jobs` plus requests
    /// already in flight reach the cap. The permit releases its slot on
    /// drop.
    pub fn try_admit(&self, current_jobs: usize) -> Option<AdmissionPermit<'_>> {
        let previous = self.in_flight.fetch_add(1, Ordering::SeqCst);
        if current_jobs + previous >= self.max_jobs {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            return None;
        }
        Some(AdmissionPermit { controller: self })
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// RAII admission slot.
pub struct AdmissionPermit<'a> {
    controller: &'a AdmissionController,
}

impl Drop for AdmissionPermit<'_> {
    fn drop(&mut self) {
        self.controller.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
