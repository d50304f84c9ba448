//! Outbound status-callback client.
//!
//! Jobs report progress to the caller's callback URL out-of-band; the
//! original HTTP response never reopens. Sends are fire-and-forget: a
//! dead callback receiver is the caller's problem, logged here and
//! never allowed to fail a dispatch.

pub mod client;
pub mod messages;

pub use client::{CallbackClient, CallbackConfig};
pub use messages::CallbackMessage;
