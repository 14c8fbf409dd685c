//! Error types for PC/SC transport

use apdu_core::TransportError;

/// PC/SC-specific errors
#[derive(Debug, thiserror::Error)]
pub enum PcscError {
    /// PC/SC error
    #[error("PC/SC error: {0}")]
    Pcsc(#[from] pcsc::Error),

    /// No readers available
    #[error("No readers available")]
    NoReadersAvailable,

    /// Reader not found
    #[error("Reader not found: {0}")]
    ReaderNotFound(String),

    /// No card present in reader
    #[error("No card present in reader: {0}")]
    NoCard(String),
}

impl From<PcscError> for TransportError {
    fn from(error: PcscError) -> Self {
        match error {
            PcscError::NoCard(_) | PcscError::ReaderNotFound(_) | PcscError::NoReadersAvailable => {
                Self::Connection
            }
            PcscError::Pcsc(pcsc::Error::RemovedCard | pcsc::Error::ResetCard) => Self::Connection,
            PcscError::Pcsc(e) => Self::Device(e.to_string()),
        }
    }
}
