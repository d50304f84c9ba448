//! Axum HTTP API server for the VOD coordinator.
//!
//! This crate provides:
//! - Orchestration handlers for segmenting and transcoding ingest
//! - The trigger dispatcher for engine webhooks
//! - Admission control over concurrently in-flight jobs
//! - Request-ID and request-logging middleware

pub mod admission;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
