//! Transport traits for APDU communication with cards
//!
//! This module provides the abstraction every card link implements, whether it
//! talks to a physical reader or wraps another transport in a protected channel.

use std::fmt;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::{command::Command, error::TransportError, response::Response};

/// Trait for card transports
///
/// Implementations provide [`do_transmit_raw`](Self::do_transmit_raw); the
/// structured [`transmit`](Self::transmit) defaults to serializing the command,
/// sending it raw and checking the status word. Wrapping transports (such as a
/// secure messaging channel) override `transmit` instead.
pub trait CardTransport: fmt::Debug {
    /// Error type returned by the transport
    type Error: std::error::Error + From<TransportError>;

    /// Send raw APDU bytes to card and return response bytes, status word included
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, Self::Error> {
        trace!(command = %hex::encode(command), "Transmitting raw command");
        let result = self.do_transmit_raw(command);
        match &result {
            Ok(response) => {
                trace!(response = %hex::encode(response), "Received raw response");
            }
            Err(e) => {
                debug!(error = %e, "Transport error during transmission");
            }
        }
        result
    }

    /// Internal implementation of transmit_raw
    /// This is the method that concrete implementations should override
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, Self::Error>;

    /// Send a structured command and return the response payload
    ///
    /// Any status word other than `90 00` is reported as
    /// [`TransportError::Status`].
    fn transmit(&mut self, command: &Command) -> Result<Bytes, Self::Error> {
        let raw = command.try_to_bytes()?;
        let response = self.transmit_raw(&raw)?;
        let response = Response::from_bytes(&response)?;
        Ok(response.into_payload()?)
    }

    /// Check if the transport is connected to a physical card
    fn is_connected(&self) -> bool {
        true
    }

    /// Reset the transport connection
    fn reset(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<T: CardTransport + ?Sized> CardTransport for &mut T {
    type Error = T::Error;

    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, Self::Error> {
        (**self).transmit_raw(command)
    }

    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, Self::Error> {
        (**self).do_transmit_raw(command)
    }

    fn transmit(&mut self, command: &Command) -> Result<Bytes, Self::Error> {
        (**self).transmit(command)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn reset(&mut self) -> Result<(), Self::Error> {
        (**self).reset()
    }
}

#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct MockTransport {
    /// Mock responses to return
    pub(crate) responses: Vec<Bytes>,
    /// Commands that were sent
    pub(crate) commands: Vec<Bytes>,
}

#[cfg(test)]
impl MockTransport {
    /// Create a new mock transport with the given responses
    pub(crate) const fn new(responses: Vec<Bytes>) -> Self {
        Self {
            responses,
            commands: Vec::new(),
        }
    }
}

#[cfg(test)]
impl CardTransport for MockTransport {
    type Error = TransportError;

    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, Self::Error> {
        self.commands.push(Bytes::copy_from_slice(command));

        if self.responses.is_empty() {
            return Err(TransportError::Transmission);
        }
        Ok(self.responses.remove(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StatusWord;
    use hex_literal::hex;

    #[test]
    fn test_transmit_strips_status_word() {
        let mut transport = MockTransport::new(vec![Bytes::from_static(&hex!("0102 9000"))]);
        let cmd = Command::new_with_le(0x00, 0xB0, 0x00, 0x00, 0x00);

        let payload = transport.transmit(&cmd).unwrap();
        assert_eq!(payload.as_ref(), &hex!("0102"));
        assert_eq!(transport.commands[0].as_ref(), &hex!("00B00000 00"));
    }

    #[test]
    fn test_transmit_reports_status_error() {
        let mut transport = MockTransport::new(vec![Bytes::from_static(&hex!("6A82"))]);
        let cmd = Command::new(0x00, 0xA4, 0x01, 0x0C).with_data(hex!("011C").to_vec());

        let err = transport.transmit(&cmd).unwrap_err();
        assert_eq!(err.status_word(), Some(StatusWord::new(0x6A, 0x82)));
    }

    #[test]
    fn test_transmit_raw_keeps_status_word() {
        let mut transport = MockTransport::new(vec![Bytes::from_static(&hex!("6A82"))]);
        let response = transport.transmit_raw(&hex!("00A4010C02011C")).unwrap();
        assert_eq!(response.as_ref(), &hex!("6A82"));
    }

    #[test]
    fn test_transport_by_mutable_reference() {
        fn select<T: CardTransport>(mut card: T) -> Result<Bytes, T::Error> {
            card.transmit(&Command::new(0x00, 0xA4, 0x04, 0x00))
        }

        let mut transport = MockTransport::new(vec![Bytes::from_static(&hex!("9000"))]);
        assert!(select(&mut transport).unwrap().is_empty());
        assert!(matches!(select(&mut transport), Err(TransportError::Transmission)));
        assert_eq!(transport.commands.len(), 2);
    }
}
