//! Engine client error types.

use thiserror::Error;

pub type MistResult<T> = Result<T, MistError>;

#[derive(Debug, Error)]
pub enum MistError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("failed to decode engine response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Credentials are static, so a rejected authorization is terminal
    /// and never retried.
    #[error("engine rejected authorization: {0}")]
    Unauthorized(String),

    #[error("engine response missing expected field: {0}")]
    MissingField(&'static str),

    /// The engine accepted the command but its response shows no visible
    /// effect, e.g. an addstream answer listing zero streams.
    #[error("command had no visible effect: {0}")]
    NoEffect(String),
}
