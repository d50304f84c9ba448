//! Application state.

use std::sync::Arc;

use vodflow_callback::CallbackClient;
use vodflow_mist::MistClient;
use vodflow_registry::JobRegistry;

use crate::admission::AdmissionController;
use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub registry: Arc<JobRegistry>,
    pub mist: Arc<MistClient>,
    pub callback: Arc<CallbackClient>,
    pub admission: Arc<AdmissionController>,
}

impl AppState {
    /// Create new application state.
    pub fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let mist = MistClient::from_env()?;
        let callback = CallbackClient::from_env()?;
        let admission = AdmissionController::new(config.max_jobs);

        Ok(Self {
            config,
            registry: Arc::new(JobRegistry::new()),
            mist: Arc::new(mist),
            callback: Arc::new(callback),
            admission: Arc::new(admission),
        })
    }
}
