//! VOD segmenting ingest.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use vodflow_models::{StreamKind, StreamName, TriggerType};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// VOD ingest request.
#[derive(Debug, Deserialize)]
pub struct VodRequest {
    /// Source asset URL
    pub url: String,
    /// Caller's status callback URL
    pub callback_url: String,
    pub output_locations: Vec<OutputLocation>,
}

#[derive(Debug, Deserialize)]
pub struct OutputLocation {
    pub url: String,
    #[serde(default)]
    pub outputs: OutputFlags,
}

#[derive(Debug, Default, Deserialize)]
pub struct OutputFlags {
    #[serde(default)]
    pub source_segments: bool,
}

#[derive(Serialize)]
pub struct VodResponse {
    pub request_id: String,
}

/// Accept a VOD request: seed a segmenting job and command the engine to
/// ingest the source and push segments to the flagged output location.
/// Everything after this response arrives via the callback URL.
pub async fn upload_vod(
    State(state): State<AppState>,
    payload: Result<Json<VodRequest>, JsonRejection>,
) -> ApiResult<Json<VodResponse>> {
    let Json(request) = payload.map_err(map_rejection)?;
    let target = validate(&request)?;

    let _permit = state
        .admission
        .try_admit(state.registry.len())
        .ok_or(ApiError::TooManyRequests)?;

    let stream_name = StreamName::generate(StreamKind::Segmenting);
    state
        .registry
        .store_segmenting(stream_name.clone(), &request.callback_url);

    let result = issue_engine_commands(&state, &stream_name, &request.url, target).await;
    if let Err(e) = result {
        // The job never started; leaving the entry would leak an
        // admission slot forever.
        state.registry.remove(stream_name.as_str());
        scrub_triggers(&state, &stream_name, &[TriggerType::PushEnd]).await;
        return Err(e.into());
    }

    let request_id = Uuid::new_v4().to_string();
    info!(stream = %stream_name, %request_id, "segmenting job accepted");

    Ok(Json(VodResponse { request_id }))
}

fn validate(request: &VodRequest) -> ApiResult<&str> {
    if request.url.is_empty() {
        return Err(ApiError::bad_request("url must not be empty"));
    }
    if request.callback_url.is_empty() {
        return Err(ApiError::bad_request("callback_url must not be empty"));
    }

    let mut segment_targets = request
        .output_locations
        .iter()
        .filter(|l| l.outputs.source_segments);
    let target = segment_targets
        .next()
        .ok_or_else(|| ApiError::bad_request("no output location flagged source_segments"))?;
    if segment_targets.next().is_some() {
        return Err(ApiError::bad_request(
            "more than one output location flagged source_segments",
        ));
    }
    if target.url.is_empty() {
        return Err(ApiError::bad_request("output location url must not be empty"));
    }
    Ok(&target.url)
}

async fn issue_engine_commands(
    state: &AppState,
    stream_name: &StreamName,
    source_url: &str,
    target: &str,
) -> vodflow_mist::MistResult<()> {
    state
        .mist
        .add_trigger(
            stream_name.as_str(),
            TriggerType::PushEnd.as_str(),
            &state.config.trigger_handler_url(),
            false,
        )
        .await?;
    state
        .mist
        .create_stream(stream_name.as_str(), source_url)
        .await?;
    state.mist.push_start(stream_name.as_str(), target).await?;
    Ok(())
}

/// Best-effort removal of an aborted job's trigger registrations. Stream
/// names are never reused, so a registration left behind would sit in the
/// engine's global config forever. Failures are logged, never propagated:
/// the caller is already reporting the error that aborted the job.
pub(crate) async fn scrub_triggers(
    state: &AppState,
    stream_name: &StreamName,
    triggers: &[TriggerType],
) {
    for trigger in triggers {
        if let Err(e) = state
            .mist
            .delete_trigger(stream_name.as_str(), trigger.as_str())
            .await
        {
            warn!(
                stream = %stream_name,
                trigger = trigger.as_str(),
                error = %e,
                "failed to remove trigger registration for aborted job"
            );
        }
    }
}

pub(crate) fn map_rejection(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::UnsupportedMediaType("expected application/json".to_string())
        }
        other => ApiError::BadRequest(other.to_string()),
    }
}
