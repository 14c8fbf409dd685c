//! Error types for PACE and secure messaging

use std::fmt;

use apdu_core::{StatusWord, TransportError};
use iso7816_tlv::TlvError;

/// Result type for PACE operations
pub type Result<T> = std::result::Result<T, Error>;

/// Steps of the PACE handshake, used to tell which round trip failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// SELECT and READ BINARY of EF.CardAccess
    ReadCardAccess,
    /// MSE:SET AT
    SetAuthenticationTemplate,
    /// GENERAL AUTHENTICATE returning the encrypted nonce
    GetNonce,
    /// Deriving K_pi and decrypting the nonce
    DecryptNonce,
    /// GENERAL AUTHENTICATE exchanging the mapping keys
    MapNonce,
    /// GENERAL AUTHENTICATE exchanging the ephemeral keys
    KeyAgreement,
    /// GENERAL AUTHENTICATE exchanging the authentication tokens
    MutualAuthentication,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ReadCardAccess => "reading EF.CardAccess",
            Self::SetAuthenticationTemplate => "MSE:SET AT",
            Self::GetNonce => "requesting nonce",
            Self::DecryptNonce => "decrypting nonce",
            Self::MapNonce => "mapping nonce",
            Self::KeyAgreement => "key agreement",
            Self::MutualAuthentication => "mutual authentication",
        };
        f.write_str(name)
    }
}

/// Error type for PACE operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O failure or non-success status word from the card
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The card sent something that violates the protocol
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A cipher or MAC could not be initialised
    #[error("Failed to initialise {0}")]
    CryptoInit(&'static str),

    /// The card's authentication token did not verify
    #[error("Authentication failed: card token mismatch")]
    AuthenticationFailed,

    /// A protected response carried a MAC that did not verify
    #[error("MAC verification failed")]
    MacVerificationFailed,

    /// An encoded curve point was rejected
    #[error("Malformed point: {0}")]
    MalformedPoint(&'static str),

    /// The operation is not available on this transport
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    /// The secure channel failed earlier and can no longer be used
    #[error("Secure channel is unusable after a previous failure")]
    ChannelUnusable,

    /// A handshake step failed
    #[error("PACE step failed ({step}): {source}")]
    Step {
        /// The step that failed
        step: Step,
        /// Underlying error
        source: Box<Self>,
    },
}

impl Error {
    /// Create a protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// The innermost error, skipping any step context
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Step { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// The handshake step this error was raised in, if any
    pub const fn step(&self) -> Option<Step> {
        match self {
            Self::Step { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// The status word returned by the card, if this error carries one
    pub fn status_word(&self) -> Option<StatusWord> {
        match self.root_cause() {
            Self::Transport(e) => e.status_word(),
            _ => None,
        }
    }
}

impl From<TlvError> for Error {
    fn from(error: TlvError) -> Self {
        Self::Protocol(format!("malformed TLV: {error}"))
    }
}

/// Attach the failing handshake step to an error
pub(crate) trait StepExt<T> {
    /// Wrap the error in [`Error::Step`]
    fn during(self, step: Step) -> Result<T>;
}

impl<T, E: Into<Error>> StepExt<T> for std::result::Result<T, E> {
    fn during(self, step: Step) -> Result<T> {
        self.map_err(|e| Error::Step {
            step,
            source: Box::new(e.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cause_unwraps_step() {
        let result: Result<()> = Err(Error::AuthenticationFailed);
        let err = result.during(Step::MutualAuthentication).unwrap_err();

        assert_eq!(err.step(), Some(Step::MutualAuthentication));
        assert!(matches!(err.root_cause(), Error::AuthenticationFailed));
        assert_eq!(
            err.to_string(),
            "PACE step failed (mutual authentication): Authentication failed: card token mismatch"
        );
    }

    #[test]
    fn test_status_word_through_step() {
        let result: std::result::Result<(), TransportError> =
            Err(TransportError::Status(StatusWord::new(0x63, 0xC2)));
        let err = result.during(Step::MapNonce).unwrap_err();

        assert_eq!(err.status_word(), Some(StatusWord::new(0x63, 0xC2)));
        assert!(Error::MacVerificationFailed.status_word().is_none());
    }
}
