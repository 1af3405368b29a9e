//! Error types for the decision engine.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// No channel in the snapshot matches the configured AFK channel name.
    /// A configuration error: retrying later cycles cannot fix it.
    #[error("afk channel {0:?} not found in snapshot")]
    AfkChannelMissing(String),
}
