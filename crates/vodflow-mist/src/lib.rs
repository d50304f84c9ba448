//! Command client for the MistServer-style media engine.
//!
//! This crate provides:
//! - Typed engine commands and the authorization envelope
//! - The `command=<urlencoded-json>` form POST transport
//! - Serialized read-modify-write transactions over the engine's
//!   global trigger configuration

pub mod client;
pub mod commands;
pub mod error;

pub use client::{MistClient, MistConfig};
pub use commands::{Command, TriggerConfig, TriggerEntry};
pub use error::{MistError, MistResult};
