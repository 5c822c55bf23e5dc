//! Error classes of the detection pipeline.
//!
//! - `CaptureError::Unavailable` is transient; the frame pump defers and retries.
//! - `TransportError::Network` is terminal for the current request or session.
//! - `TransportError::Decode` drops the offending message only.
//! - `TransportError::ProtocolViolation` marks a message nobody is waiting for.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no frame available")]
    Unavailable,
    #[error("frame encode failed: {0}")]
    Encode(String),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}

impl TransportError {
    /// True when the failure ends the request or session it occurred on.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransportError::Network(_))
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(e: serde_json::Error) -> Self {
        TransportError::Decode(e.to_string())
    }
}

impl From<tungstenite::Error> for TransportError {
    fn from(e: tungstenite::Error) -> Self {
        TransportError::Network(e.to_string())
    }
}

/// Failure of a one-shot detection round trip.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}
