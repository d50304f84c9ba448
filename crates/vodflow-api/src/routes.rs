//! API routes.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::health::ok;
use crate::handlers::transcode::transcode_file;
use crate::handlers::trigger::mist_trigger;
use crate::handlers::vod::upload_vod;
use crate::middleware::{request_id, request_logging};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/vod", post(upload_vod))
        .route("/transcode/file", post(transcode_file))
        .route("/mist/trigger", post(mist_trigger));

    Router::new()
        .nest("/api", api_routes)
        .route("/ok", get(ok))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .with_state(state)
}
