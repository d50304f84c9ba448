//! Request handlers.

pub mod health;
pub mod transcode;
pub mod trigger;
pub mod vod;

pub use health::*;
pub use transcode::*;
pub use trigger::*;
pub use vod::*;
