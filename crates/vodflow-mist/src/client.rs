//! Engine HTTP client.

use std::time::Duration;

use reqwest::Client;
use tokio::sync::Mutex;
use tracing::debug;

use crate::commands::{
    Authorize, Command, CommandEnvelope, EngineResponse, TriggerConfig, TriggerEntry,
};
use crate::error::{MistError, MistResult};

/// Configuration for the engine client.
#[derive(Debug, Clone)]
pub struct MistConfig {
    /// Base URL of the engine's API endpoint
    pub base_url: String,
    /// Engine API username
    pub username: String,
    /// Engine API password
    pub password: String,
    /// Request timeout; a stuck engine must never block a serving task
    /// indefinitely
    pub timeout: Duration,
}

impl Default for MistConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4242/api2".to_string(),
            username: "test".to_string(),
            password: "test".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl MistConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("MIST_URL").unwrap_or(defaults.base_url),
            username: std::env::var("MIST_USERNAME").unwrap_or(defaults.username),
            password: std::env::var("MIST_PASSWORD").unwrap_or(defaults.password),
            timeout: Duration::from_secs(
                std::env::var("MIST_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }
}

/// Client for the media engine's command API.
///
/// No operation here retries; the credentials are static and protocol
/// errors are surfaced to the caller, which owns retry policy.
pub struct MistClient {
    http: Client,
    config: MistConfig,
    /// Serializes every trigger read-modify-write. The engine only
    /// supports wholesale replacement of a trigger type's registrations,
    /// so interleaved transactions would silently lose updates.
    trigger_lock: Mutex<()>,
}

impl MistClient {
    /// Create a new engine client.
    pub fn new(config: MistConfig) -> MistResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(MistError::Network)?;

        Ok(Self {
            http,
            config,
            trigger_lock: Mutex::new(()),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> MistResult<Self> {
        Self::new(MistConfig::from_env())
    }

    /// Register a source stream with the engine. The engine answers with
    /// the streams it now knows; an empty list means the command silently
    /// did nothing, which is an error here.
    pub async fn create_stream(&self, name: &str, source_url: &str) -> MistResult<()> {
        let response = self.send(Command::add_stream(name, source_url)).await?;
        match response.streams {
            Some(streams) if !streams.is_empty() => Ok(()),
            _ => Err(MistError::NoEffect(format!(
                "addstream {name} returned no streams"
            ))),
        }
    }

    /// Start pushing a stream to a destination URL.
    pub async fn push_start(&self, stream: &str, target: &str) -> MistResult<()> {
        self.send(Command::push_start(stream, target)).await?;
        Ok(())
    }

    /// Delete a stream from the engine.
    pub async fn delete_stream(&self, name: &str) -> MistResult<()> {
        self.send(Command::delete_stream(name)).await?;
        Ok(())
    }

    /// Read the engine's current trigger configuration. An absent config
    /// section means no triggers are registered.
    pub async fn get_triggers(&self) -> MistResult<TriggerConfig> {
        let response = self.send(Command::read_config()).await?;
        Ok(response
            .config
            .and_then(|c| c.triggers)
            .unwrap_or_default())
    }

    /// Register `handler_url` for `trigger_name` on one stream.
    ///
    /// One serialized transaction: fetch the whole config, drop any
    /// existing registration of this stream under this trigger name,
    /// append the new entry, write the whole config back.
    pub async fn add_trigger(
        &self,
        stream: &str,
        trigger_name: &str,
        handler_url: &str,
        sync: bool,
    ) -> MistResult<()> {
        let _guard = self.trigger_lock.lock().await;

        let mut triggers = self.get_triggers().await?;
        scrub_stream(&mut triggers, trigger_name, stream);
        triggers
            .entry(trigger_name.to_string())
            .or_default()
            .push(TriggerEntry {
                handler: handler_url.to_string(),
                streams: vec![stream.to_string()],
                sync,
            });

        self.send(Command::write_triggers(triggers)).await?;
        Ok(())
    }

    /// Remove every registration of one stream under one trigger name.
    pub async fn delete_trigger(&self, stream: &str, trigger_name: &str) -> MistResult<()> {
        let _guard = self.trigger_lock.lock().await;

        let mut triggers = self.get_triggers().await?;
        scrub_stream(&mut triggers, trigger_name, stream);

        self.send(Command::write_triggers(triggers)).await?;
        Ok(())
    }

    /// Send one command and check the authorization status of the reply.
    async fn send(&self, command: Command) -> MistResult<EngineResponse> {
        let envelope = CommandEnvelope {
            authorize: Authorize {
                username: self.config.username.clone(),
                password: self.config.password.clone(),
            },
            command,
        };
        let payload = serde_json::to_string(&envelope)?;

        debug!(url = %self.config.base_url, "sending engine command");

        let response = self
            .http
            .post(&self.config.base_url)
            .form(&[("command", payload.as_str())])
            .send()
            .await?;

        let body = response.text().await?;
        let parsed: EngineResponse = serde_json::from_str(&body)?;

        let auth = parsed
            .authorize
            .as_ref()
            .ok_or(MistError::MissingField("authorize"))?;
        if auth.status != "OK" {
            return Err(MistError::Unauthorized(auth.status.clone()));
        }

        Ok(parsed)
    }
}

/// Drop `stream` from every entry under `trigger_name`, discarding entries
/// left without streams.
fn scrub_stream(triggers: &mut TriggerConfig, trigger_name: &str, stream: &str) {
    if let Some(entries) = triggers.get_mut(trigger_name) {
        for entry in entries.iter_mut() {
            entry.streams.retain(|s| s != stream);
        }
        entries.retain(|entry| !entry.streams.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex as StdMutex};

    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> MistClient {
        MistClient::new(MistConfig {
            base_url: server.uri(),
            ..MistConfig::default()
        })
        .unwrap()
    }

    fn decode_command(request: &Request) -> serde_json::Value {
        let form: HashMap<String, String> =
            serde_urlencoded::from_bytes(&request.body).unwrap();
        serde_json::from_str(&form["command"]).unwrap()
    }

    /// In-memory engine double: remembers the trigger config across
    /// commands, like the real engine's global state.
    #[derive(Clone, Default)]
    struct FakeEngine {
        triggers: Arc<StdMutex<TriggerConfig>>,
    }

    impl Respond for FakeEngine {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let command = decode_command(request);
            let mut triggers = self.triggers.lock().unwrap();

            if let Some(new_triggers) = command
                .get("config")
                .and_then(|c| c.get("triggers"))
            {
                *triggers = serde_json::from_value(new_triggers.clone()).unwrap();
            }

            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "authorize": {"status": "OK"},
                "config": {"triggers": &*triggers},
            }))
        }
    }

    #[tokio::test]
    async fn test_create_stream_checks_visible_effect() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "authorize": {"status": "OK"},
                "streams": {},
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .create_stream("vod_abc", "http://source/video.mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, MistError::NoEffect(_)));
    }

    #[tokio::test]
    async fn test_rejected_authorization_is_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "authorize": {"status": "CHALL"},
            })))
            .expect(1) // no retry
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.push_start("vod_abc", "target").await.unwrap_err();
        assert!(matches!(err, MistError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_unparseable_response_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.delete_stream("vod_abc").await.unwrap_err();
        assert!(matches!(err, MistError::Decode(_)));
    }

    #[tokio::test]
    async fn test_add_trigger_replaces_own_stream_only() {
        let server = MockServer::start().await;
        let engine = FakeEngine::default();
        Mock::given(method("POST"))
            .respond_with(engine.clone())
            .mount(&server)
            .await;

        let client = client_for(&server);
        client
            .add_trigger("vod_a", "PUSH_END", "http://coordinator/old", false)
            .await
            .unwrap();
        client
            .add_trigger("vod_b", "PUSH_END", "http://coordinator/t", false)
            .await
            .unwrap();
        // Re-registering vod_a must replace its old entry, not stack one.
        client
            .add_trigger("vod_a", "PUSH_END", "http://coordinator/new", false)
            .await
            .unwrap();

        let triggers = engine.triggers.lock().unwrap().clone();
        let entries = &triggers["PUSH_END"];
        assert_eq!(entries.len(), 2);
        let a = entries
            .iter()
            .find(|e| e.streams == ["vod_a"])
            .unwrap();
        assert_eq!(a.handler, "http://coordinator/new");
    }

    #[tokio::test]
    async fn test_delete_trigger_leaves_other_streams() {
        let server = MockServer::start().await;
        let engine = FakeEngine::default();
        Mock::given(method("POST"))
            .respond_with(engine.clone())
            .mount(&server)
            .await;

        let client = client_for(&server);
        client
            .add_trigger("vod_a", "PUSH_END", "http://coordinator/t", false)
            .await
            .unwrap();
        client
            .add_trigger("vod_b", "PUSH_END", "http://coordinator/t", false)
            .await
            .unwrap();
        client.delete_trigger("vod_a", "PUSH_END").await.unwrap();

        let triggers = engine.triggers.lock().unwrap().clone();
        let entries = &triggers["PUSH_END"];
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].streams, ["vod_b"]);
    }

    /// N tasks race to register triggers for N distinct streams through
    /// one client; the serialized transaction must not lose any of them.
    #[tokio::test]
    async fn test_concurrent_add_triggers_lose_nothing() {
        let server = MockServer::start().await;
        let engine = FakeEngine::default();
        Mock::given(method("POST"))
            .respond_with(engine.clone())
            .mount(&server)
            .await;

        let client = Arc::new(client_for(&server));
        let n = 16;

        let mut handles = Vec::new();
        for i in 0..n {
            let client = Arc::clone(&client);
            handles.push(tokio::spawn(async move {
                client
                    .add_trigger(
                        &format!("vod_{i}"),
                        "PUSH_END",
                        "http://coordinator/t",
                        false,
                    )
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let triggers = engine.triggers.lock().unwrap().clone();
        let entries = &triggers["PUSH_END"];
        assert_eq!(entries.len(), n);
        for i in 0..n {
            let stream = format!("vod_{i}");
            assert!(entries.iter().any(|e| e.streams == [stream.clone()]));
        }
    }
}
