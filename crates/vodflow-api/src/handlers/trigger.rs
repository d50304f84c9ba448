//! Engine trigger endpoint.

use axum::extract::State;
use axum::http::HeaderMap;
use tracing::error;
use vodflow_models::TriggerType;

use crate::dispatch;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Single inbound webhook for all engine triggers, classified by the
/// `X-Trigger` header. The body is the engine's newline-delimited payload,
/// not JSON.
pub async fn mist_trigger(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> ApiResult<&'static str> {
    let trigger = headers
        .get("X-Trigger")
        .and_then(|v| v.to_str().ok())
        .and_then(TriggerType::from_header)
        .ok_or_else(|| ApiError::bad_request("missing or unknown X-Trigger header"))?;

    let result = match trigger {
        TriggerType::LiveTrackList => dispatch::live_track_list(&state, &body).await,
        TriggerType::PushEnd => dispatch::push_end(&state, &body).await,
    };

    if let Err(e) = &result {
        // The engine ignores this response for PUSH_END and only cares
        // about the status for synchronous triggers; the log line is the
        // real observability channel.
        error!(trigger = trigger.as_str(), error = %e, "trigger dispatch failed");
    }
    result.map(|()| "OK")
}
