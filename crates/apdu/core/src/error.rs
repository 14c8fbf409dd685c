//! Error types specific to card transport

use crate::response::StatusWord;

/// Transport error type
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection error
    #[error("Failed to connect to device")]
    Connection,

    /// Transmission error
    #[error("Failed to transmit data")]
    Transmission,

    /// Device error reported by the reader stack
    #[error("Device error: {0}")]
    Device(String),

    /// The card answered with a status word other than 90 00
    #[error("Card returned error status: {0}")]
    Status(StatusWord),

    /// Response shorter than the two status bytes
    #[error("Response too short: {0} bytes")]
    ResponseTooShort(usize),

    /// Command does not fit or does not parse as a short APDU
    #[error("Invalid command length: {0} bytes")]
    InvalidCommandLength(usize),

    /// Other error with message
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Create a general other error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other(message.into())
    }

    /// Get the status word if this is a status word error
    pub const fn status_word(&self) -> Option<StatusWord> {
        match self {
            Self::Status(sw) => Some(*sw),
            _ => None,
        }
    }
}
