//! Liveness probe.

/// Liveness endpoint; answers the literal `OK`.
pub async fn ok() -> &'static str {
    "OK"
}
