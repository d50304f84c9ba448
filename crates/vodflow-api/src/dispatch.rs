//! Trigger dispatch.
//!
//! The engine reports back through line-oriented webhooks with no
//! machine-readable job IDs; the stream name in the payload is the only
//! join key. Routing resolves it once against the registry, which returns
//! a tagged entry, so no code here re-parses name prefixes.
//!
//! The engine ignores the HTTP status of PUSH_END deliveries and blocks
//! on LIVE_TRACK_LIST without ever re-delivering it. Error responses are
//! therefore observability, never a correctness mechanism: every outcome
//! that matters is driven through the registry and the callback client.

use tracing::{error, info, warn};

use vodflow_models::{
    EncodedProfile, LiveTrackListPayload, PushEndPayload, StreamName, TrackInfo, TranscodeStatus,
    TriggerType,
};
use vodflow_registry::{JobEntry, RemoveOutcome, SegmentingJob, TranscodeJobInfo};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Handle a LIVE_TRACK_LIST delivery.
///
/// Must not return before every discovered track's push has been
/// attempted: the engine will not send the track list again.
pub async fn live_track_list(state: &AppState, body: &str) -> ApiResult<()> {
    let payload = LiveTrackListPayload::parse(body)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let Some(tracks) = payload.tracks else {
        // The stream ended; its source stream serves no further purpose.
        info!(stream = %payload.stream_name, "track list closed, deleting source stream");
        state.mist.delete_stream(&payload.stream_name).await?;
        return Ok(());
    };

    let job = match state.registry.get(&payload.stream_name) {
        Some(JobEntry::Transcoding(job)) => job,
        Some(JobEntry::Segmenting(_)) => {
            return Err(ApiError::inconsistent(format!(
                "LIVE_TRACK_LIST for segmenting stream {}",
                payload.stream_name
            )));
        }
        None => return Err(ApiError::UnknownStream(payload.stream_name)),
    };

    // Partial success is acceptable: a failed push loses one rendition,
    // not the job.
    for (track_id, track) in tracks.iter().filter(|(_, t)| t.is_video()) {
        let destination = rendition_destination(&job, track);
        match state
            .mist
            .push_start(job.stream_name.as_str(), &destination)
            .await
        {
            Ok(()) => {
                if !state
                    .registry
                    .add_destination(job.stream_name.as_str(), &destination)
                {
                    warn!(
                        stream = %job.stream_name,
                        %destination,
                        "push started for a job no longer accepting destinations"
                    );
                }
            }
            Err(e) => {
                error!(
                    stream = %job.stream_name,
                    track = %track_id,
                    %destination,
                    error = %e,
                    "push start failed, continuing with remaining tracks"
                );
            }
        }
    }

    Ok(())
}

/// Handle a PUSH_END delivery.
pub async fn push_end(state: &AppState, body: &str) -> ApiResult<()> {
    let payload =
        PushEndPayload::parse(body).map_err(|e| ApiError::bad_request(e.to_string()))?;

    match state.registry.get(&payload.stream_name) {
        Some(JobEntry::Transcoding(job)) => transcoding_push_end(state, &job, &payload).await,
        Some(JobEntry::Segmenting(job)) => segmenting_push_end(state, &job).await,
        None => {
            // Kind-by-prefix tells a lost job of ours from a foreign stream.
            let name = StreamName::from_trigger(payload.stream_name);
            warn!(stream = %name, kind = ?name.kind(), "PUSH_END for untracked stream");
            Err(ApiError::UnknownStream(name.as_str().to_string()))
        }
    }
}

/// One rendition push of a transcoding job terminated.
async fn transcoding_push_end(
    state: &AppState,
    job: &TranscodeJobInfo,
    payload: &PushEndPayload,
) -> ApiResult<()> {
    let stream = job.stream_name.as_str();
    let destination = payload.configured_destination.as_str();

    // Check-and-remove is one registry operation; the drained flag decides
    // who sends the terminal callback even under concurrent deliveries.
    let drained = match state.registry.remove_destination(stream, destination) {
        RemoveOutcome::Removed { drained } => drained,
        RemoveOutcome::UnknownDestination => {
            return Err(ApiError::inconsistent(format!(
                "PUSH_END for stream {stream} cites untracked destination {destination}"
            )));
        }
        RemoveOutcome::UnknownStream => {
            return Err(ApiError::UnknownStream(stream.to_string()));
        }
    };

    match &payload.last_status {
        None => {
            state
                .callback
                .send_rendition_upload(
                    &job.callback_url,
                    &job.source_url,
                    &payload.actual_destination,
                )
                .await;
        }
        Some(blob) => {
            warn!(stream, destination, status = %blob, "rendition push failed");
            state
                .callback
                .send_rendition_upload_error(&job.callback_url, &job.source_url, destination, blob)
                .await;
        }
    }

    if drained {
        info!(stream, "all pushes confirmed, transcode complete");
        state
            .callback
            .send_transcode_status(&job.callback_url, TranscodeStatus::Success, 1.0)
            .await;
        state.registry.remove(stream);
    }

    Ok(())
}

/// The single push of a segmenting job terminated. Tear down the stream
/// and its trigger registration; each failure is reported independently
/// and does not roll back the other.
async fn segmenting_push_end(state: &AppState, job: &SegmentingJob) -> ApiResult<()> {
    let stream = job.stream_name.as_str();
    let mut first_error = None;

    if let Err(e) = state
        .mist
        .delete_trigger(stream, TriggerType::PushEnd.as_str())
        .await
    {
        error!(stream, error = %e, "failed to delete trigger registration");
        first_error = Some(e);
    }

    if let Err(e) = state.mist.delete_stream(stream).await {
        error!(stream, error = %e, "failed to delete stream");
        first_error.get_or_insert(e);
    }

    state
        .callback
        .send_segment_transcode_status(&job.callback_url, stream)
        .await;

    state.registry.remove(stream);

    match first_error {
        None => Ok(()),
        Some(e) => Err(ApiError::Engine(e)),
    }
}

/// Synthesize the output-push URL for one discovered video track: the
/// closest requested rendition under the job's upload directory, with the
/// resolution and track selectors in the query.
fn rendition_destination(job: &TranscodeJobInfo, track: &TrackInfo) -> String {
    let rendition = EncodedProfile::closest(&job.profiles, track.width, track.height)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| format!("{}x{}", track.width, track.height));

    format!(
        "{}/{}/{}_{}x{}/index.m3u8?video={}&audio=maxbps",
        job.upload_dir.trim_end_matches('/'),
        job.stream_name,
        rendition,
        track.width,
        track.height,
        track.trackid,
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use vodflow_callback::{CallbackClient, CallbackConfig};
    use vodflow_mist::{MistClient, MistConfig};
    use vodflow_models::{StreamKind, StreamName};
    use vodflow_registry::JobRegistry;

    use crate::admission::AdmissionController;
    use crate::config::ApiConfig;

    use super::*;

    /// State wired to a wiremock engine; callback URLs are per-job.
    fn test_state(engine: &MockServer) -> AppState {
        let config = ApiConfig::default();
        let mist = MistClient::new(MistConfig {
            base_url: engine.uri(),
            ..MistConfig::default()
        })
        .unwrap();
        AppState {
            admission: Arc::new(AdmissionController::new(config.max_jobs)),
            config,
            registry: Arc::new(JobRegistry::new()),
            mist: Arc::new(mist),
            callback: Arc::new(CallbackClient::new(CallbackConfig::default()).unwrap()),
        }
    }

    async fn mount_engine_ok(engine: &MockServer) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "authorize": {"status": "OK"},
                "streams": {"placeholder": {}},
                "config": {"triggers": {}},
            })))
            .mount(engine)
            .await;
    }

    /// Decode the engine commands a wiremock server received, as JSON.
    async fn engine_commands(engine: &MockServer) -> Vec<serde_json::Value> {
        engine
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| {
                let form: HashMap<String, String> =
                    serde_urlencoded::from_bytes(&r.body).unwrap();
                serde_json::from_str(&form["command"]).unwrap()
            })
            .collect()
    }

    async fn callback_messages(receiver: &MockServer) -> Vec<serde_json::Value> {
        receiver
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect()
    }

    fn seed_transcode_job(state: &AppState, callback_url: &str) -> StreamName {
        let name = StreamName::generate(StreamKind::Transcoding);
        state.registry.store_transcoding(TranscodeJobInfo {
            stream_name: name.clone(),
            callback_url: callback_url.to_string(),
            source_url: "http://source/video.mp4".to_string(),
            upload_dir: "s3+https://bucket/out".to_string(),
            profiles: vec![],
        });
        name
    }

    fn push_end_body(stream: &str, destination: &str, status: &str) -> String {
        format!("1\n{stream}\n{destination}\n{destination}\n[]\n{status}")
    }

    #[tokio::test]
    async fn test_track_list_null_deletes_source_without_pushes() {
        let engine = MockServer::start().await;
        mount_engine_ok(&engine).await;
        let state = test_state(&engine);

        live_track_list(&state, "vodtc_gone\nnull").await.unwrap();

        let commands = engine_commands(&engine).await;
        assert_eq!(commands.len(), 1);
        assert!(commands[0].get("deletestream").is_some());
    }

    #[tokio::test]
    async fn test_track_list_starts_one_push_per_video_track() {
        let engine = MockServer::start().await;
        mount_engine_ok(&engine).await;
        let state = test_state(&engine);
        let name = seed_transcode_job(&state, "http://caller/status");

        let body = format!(
            "{}\n{}",
            name,
            r#"{"v1":{"type":"video","trackid":1,"width":1280,"height":720},
                "v2":{"type":"video","trackid":2,"width":640,"height":360},
                "a1":{"type":"audio","trackid":3}}"#,
        );
        live_track_list(&state, &body).await.unwrap();

        let commands = engine_commands(&engine).await;
        let targets: Vec<&str> = commands
            .iter()
            .filter_map(|c| c["push_start"]["target"].as_str())
            .collect();
        assert_eq!(targets.len(), 2);
        assert_ne!(targets[0], targets[1]);

        // Both destinations are now tracked: confirming them drains the job.
        assert_eq!(
            state.registry.remove_destination(name.as_str(), targets[0]),
            RemoveOutcome::Removed { drained: false }
        );
        assert_eq!(
            state.registry.remove_destination(name.as_str(), targets[1]),
            RemoveOutcome::Removed { drained: true }
        );
    }

    #[tokio::test]
    async fn test_track_list_continues_past_failed_push() {
        let engine = MockServer::start().await;
        // Engine refuses everything; each track still gets its attempt.
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "authorize": {"status": "DENIED"},
            })))
            .mount(&engine)
            .await;
        let state = test_state(&engine);
        let name = seed_transcode_job(&state, "http://caller/status");

        let body = format!(
            "{}\n{}",
            name,
            r#"{"v1":{"type":"video","trackid":1,"width":1280,"height":720},
                "v2":{"type":"video","trackid":2,"width":640,"height":360}}"#,
        );
        live_track_list(&state, &body).await.unwrap();

        assert_eq!(engine_commands(&engine).await.len(), 2);
        // Nothing registered, so the job must not look drained later.
        assert_eq!(
            state.registry.remove_destination(name.as_str(), "anything"),
            RemoveOutcome::UnknownDestination
        );
    }

    #[tokio::test]
    async fn test_track_list_for_unknown_stream_is_an_error() {
        let engine = MockServer::start().await;
        mount_engine_ok(&engine).await;
        let state = test_state(&engine);

        let err = live_track_list(&state, "vodtc_unknown\n{}")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::UnknownStream(_)));
    }

    #[tokio::test]
    async fn test_push_end_for_foreign_stream_is_an_error() {
        let engine = MockServer::start().await;
        mount_engine_ok(&engine).await;
        let state = test_state(&engine);

        let err = push_end(
            &state,
            &push_end_body("somebody_elses_stream", "dest", "null"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::UnknownStream(_)));
        assert!(engine_commands(&engine).await.is_empty());
    }

    #[tokio::test]
    async fn test_push_end_untracked_destination_removes_nothing() {
        let engine = MockServer::start().await;
        mount_engine_ok(&engine).await;
        let state = test_state(&engine);
        let name = seed_transcode_job(&state, "http://caller/status");
        state.registry.add_destination(name.as_str(), "dest-a");

        let err = push_end(&state, &push_end_body(name.as_str(), "dest-b", "null"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Inconsistent(_)));

        // dest-a is still tracked.
        assert_eq!(
            state.registry.remove_destination(name.as_str(), "dest-a"),
            RemoveOutcome::Removed { drained: true }
        );
    }

    #[tokio::test]
    async fn test_push_end_drains_set_and_sends_one_terminal_callback() {
        let engine = MockServer::start().await;
        mount_engine_ok(&engine).await;
        let receiver = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&receiver)
            .await;

        let state = test_state(&engine);
        let name = seed_transcode_job(&state, &receiver.uri());
        state.registry.add_destination(name.as_str(), "dest-a");
        state.registry.add_destination(name.as_str(), "dest-b");

        push_end(&state, &push_end_body(name.as_str(), "dest-a", "null"))
            .await
            .unwrap();
        let messages = callback_messages(&receiver).await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["type"], "rendition_upload");

        push_end(&state, &push_end_body(name.as_str(), "dest-b", "null"))
            .await
            .unwrap();
        let messages = callback_messages(&receiver).await;
        assert_eq!(messages.len(), 3);
        let terminals: Vec<_> = messages
            .iter()
            .filter(|m| m["type"] == "transcode_status")
            .collect();
        assert_eq!(terminals.len(), 1);
        assert_eq!(terminals[0]["status"], "success");
        assert_eq!(terminals[0]["completion_ratio"], 1.0);

        // Job is gone; a repeat delivery is reported, not absorbed.
        assert!(state.registry.get(name.as_str()).is_none());
        let err = push_end(&state, &push_end_body(name.as_str(), "dest-a", "null"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::UnknownStream(_)));
    }

    #[tokio::test]
    async fn test_push_end_failure_forwards_status_blob() {
        let engine = MockServer::start().await;
        mount_engine_ok(&engine).await;
        let receiver = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&receiver)
            .await;

        let state = test_state(&engine);
        let name = seed_transcode_job(&state, &receiver.uri());
        state.registry.add_destination(name.as_str(), "dest-a");

        push_end(
            &state,
            &push_end_body(name.as_str(), "dest-a", r#"{"error":"disk full"}"#),
        )
        .await
        .unwrap();

        let messages = callback_messages(&receiver).await;
        let upload_error = messages
            .iter()
            .find(|m| m["type"] == "rendition_upload_error")
            .unwrap();
        assert_eq!(upload_error["error"], r#"{"error":"disk full"}"#);
    }

    #[tokio::test]
    async fn test_segmenting_push_end_tears_down_stream() {
        let engine = MockServer::start().await;
        mount_engine_ok(&engine).await;
        let receiver = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&receiver)
            .await;

        let state = test_state(&engine);
        let name = StreamName::generate(StreamKind::Segmenting);
        state.registry.store_segmenting(name.clone(), receiver.uri());

        push_end(&state, &push_end_body(name.as_str(), "s3+https://bucket/seg", "null"))
            .await
            .unwrap();

        // Trigger registration rewritten and stream deleted.
        let commands = engine_commands(&engine).await;
        assert!(commands
            .iter()
            .any(|c| c.get("config").and_then(|c| c.get("triggers")).is_some()));
        assert!(commands.iter().any(|c| c.get("deletestream").is_some()));

        let messages = callback_messages(&receiver).await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["type"], "segment_transcode_status");

        assert!(state.registry.get(name.as_str()).is_none());
    }

    #[tokio::test]
    async fn test_rendition_destination_uses_closest_profile() {
        let job = TranscodeJobInfo {
            stream_name: StreamName::from_trigger("vodtc_x"),
            callback_url: String::new(),
            source_url: String::new(),
            upload_dir: "s3+https://bucket/out/".to_string(),
            profiles: vec![EncodedProfile {
                name: "720p".to_string(),
                width: 1280,
                height: 720,
                bitrate: 3_000_000,
                fps: 30,
            }],
        };
        let track = TrackInfo {
            kind: "video".to_string(),
            trackid: 7,
            width: 1280,
            height: 720,
            fpks: 0,
        };
        assert_eq!(
            rendition_destination(&job, &track),
            "s3+https://bucket/out/vodtc_x/720p_1280x720/index.m3u8?video=7&audio=maxbps"
        );
    }
}
