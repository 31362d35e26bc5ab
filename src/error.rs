// Typed errors with thiserror. Arbitration itself never fails; these only
// come out of the parsing boundary (config, raw events, channel names).

use thiserror::Error;

/// Arbiter error types.
#[derive(Error, Debug)]
pub enum ArbiterError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown input channel: {0}")]
    UnknownChannel(String),

    #[error("Invalid pointer event: {0}")]
    InvalidEvent(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ArbiterError {
    fn from(err: serde_json::Error) -> Self {
        ArbiterError::Serialization(err.to_string())
    }
}
