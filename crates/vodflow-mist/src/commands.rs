//! Typed engine commands and responses.
//!
//! Every command travels as one JSON document: the payload keyed by the
//! command name, with a sibling `authorize` block. The engine replies with
//! a JSON object that always carries `authorize.status` plus whatever
//! fields the operation produced.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Static engine credentials, sent alongside every command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authorize {
    pub username: String,
    pub password: String,
}

/// Source definition for `addstream`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSource {
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushStart {
    pub stream: String,
    pub target: String,
}

/// One handler registration for a trigger type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerEntry {
    pub handler: String,
    pub streams: Vec<String>,
    pub sync: bool,
}

/// The engine's global trigger configuration: trigger-type name to handler
/// registrations. The engine only supports replacing a whole value, never
/// editing one entry.
pub type TriggerConfig = HashMap<String, Vec<TriggerEntry>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggers: Option<TriggerConfig>,
}

/// A command payload. Serialization produces the engine's wire shape:
/// the variant name becomes the top-level key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// `{"addstream": {"<name>": {"source": "..."}}}`
    #[serde(rename = "addstream")]
    AddStream(HashMap<String, StreamSource>),

    /// `{"push_start": {"stream": "...", "target": "..."}}`
    #[serde(rename = "push_start")]
    PushStart(PushStart),

    /// `{"deletestream": {"<name>": null}}`
    #[serde(rename = "deletestream")]
    DeleteStream(HashMap<String, serde_json::Value>),

    /// `{"config": {"triggers": {...}}}`; with `triggers` omitted this is
    /// a plain config read.
    #[serde(rename = "config")]
    Config(ConfigSection),
}

impl Command {
    pub fn add_stream(name: &str, source_url: &str) -> Self {
        let mut streams = HashMap::new();
        streams.insert(
            name.to_string(),
            StreamSource {
                source: source_url.to_string(),
            },
        );
        Command::AddStream(streams)
    }

    pub fn push_start(stream: &str, target: &str) -> Self {
        Command::PushStart(PushStart {
            stream: stream.to_string(),
            target: target.to_string(),
        })
    }

    pub fn delete_stream(name: &str) -> Self {
        let mut streams = HashMap::new();
        streams.insert(name.to_string(), serde_json::Value::Null);
        Command::DeleteStream(streams)
    }

    pub fn read_config() -> Self {
        Command::Config(ConfigSection::default())
    }

    pub fn write_triggers(triggers: TriggerConfig) -> Self {
        Command::Config(ConfigSection {
            triggers: Some(triggers),
        })
    }
}

/// The full document POSTed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub authorize: Authorize,
    #[serde(flatten)]
    pub command: Command,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthStatus {
    pub status: String,
}

/// Engine response. Operation fields are optional; which ones appear
/// depends on the command.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineResponse {
    pub authorize: Option<AuthStatus>,
    #[serde(default)]
    pub streams: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub config: Option<ConfigSection>,
}
