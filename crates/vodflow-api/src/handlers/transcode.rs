//! Transcode ingest.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use vodflow_models::{EncodedProfile, StreamKind, StreamName, TriggerType};
use vodflow_registry::TranscodeJobInfo;

use crate::error::{ApiError, ApiResult};
use crate::handlers::vod::{map_rejection, scrub_triggers};
use crate::state::AppState;

/// Transcode request.
#[derive(Debug, Deserialize)]
pub struct TranscodeRequest {
    /// Source asset URL
    pub source_location: String,
    /// Caller's status callback URL
    pub callback_url: String,
    /// Directory receiving one push per produced rendition
    pub upload_location: String,
    #[serde(default)]
    pub profiles: Vec<EncodedProfile>,
}

#[derive(Serialize)]
pub struct TranscodeResponse {
    pub request_id: String,
}

/// Accept a transcode request: seed a transcoding job and register the
/// triggers that drive it. Pushes start later, one per discovered video
/// track, from the LIVE_TRACK_LIST trigger.
pub async fn transcode_file(
    State(state): State<AppState>,
    payload: Result<Json<TranscodeRequest>, JsonRejection>,
) -> ApiResult<Json<TranscodeResponse>> {
    let Json(request) = payload.map_err(map_rejection)?;
    validate(&request)?;

    let _permit = state
        .admission
        .try_admit(state.registry.len())
        .ok_or(ApiError::TooManyRequests)?;

    let stream_name = StreamName::generate(StreamKind::Transcoding);
    state.registry.store_transcoding(TranscodeJobInfo {
        stream_name: stream_name.clone(),
        callback_url: request.callback_url.clone(),
        source_url: request.source_location.clone(),
        upload_dir: request.upload_location.clone(),
        profiles: request.profiles.clone(),
    });

    let result = issue_engine_commands(&state, &stream_name, &request.source_location).await;
    if let Err(e) = result {
        state.registry.remove(stream_name.as_str());
        scrub_triggers(
            &state,
            &stream_name,
            &[TriggerType::LiveTrackList, TriggerType::PushEnd],
        )
        .await;
        return Err(e.into());
    }

    let request_id = Uuid::new_v4().to_string();
    info!(stream = %stream_name, %request_id, "transcoding job accepted");

    Ok(Json(TranscodeResponse { request_id }))
}

fn validate(request: &TranscodeRequest) -> ApiResult<()> {
    if request.source_location.is_empty() {
        return Err(ApiError::bad_request("source_location must not be empty"));
    }
    if request.callback_url.is_empty() {
        return Err(ApiError::bad_request("callback_url must not be empty"));
    }
    if request.upload_location.is_empty() {
        return Err(ApiError::bad_request("upload_location must not be empty"));
    }
    Ok(())
}

async fn issue_engine_commands(
    state: &AppState,
    stream_name: &StreamName,
    source_url: &str,
) -> vodflow_mist::MistResult<()> {
    let handler = state.config.trigger_handler_url();
    // The engine blocks on LIVE_TRACK_LIST; registration is synchronous
    // so every track's push is attempted before the engine moves on.
    state
        .mist
        .add_trigger(
            stream_name.as_str(),
            TriggerType::LiveTrackList.as_str(),
            &handler,
            true,
        )
        .await?;
    state
        .mist
        .add_trigger(
            stream_name.as_str(),
            TriggerType::PushEnd.as_str(),
            &handler,
            false,
        )
        .await?;
    state
        .mist
        .create_stream(stream_name.as_str(), source_url)
        .await?;
    Ok(())
}
