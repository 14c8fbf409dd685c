//! PC/SC transport implementation

use std::{ffi::CString, fmt};

use apdu_core::{CardTransport, TransportError};
use bytes::Bytes;
use pcsc::{Card, Context, Disposition};
use tracing::{debug, info, trace};

use crate::{config::PcscConfig, error::PcscError};

/// Card connection through one PC/SC reader
pub struct PcscTransport {
    context: Context,
    /// Live card handle; `None` after removal or reset
    card: Option<Card>,
    reader_name: String,
    config: PcscConfig,
}

impl fmt::Debug for PcscTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscTransport")
            .field("reader_name", &self.reader_name)
            .field("connected", &self.card.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl PcscTransport {
    /// Open the card in `reader_name`
    ///
    /// Fails if no card can be reached in the reader.
    pub(crate) fn new(
        context: Context,
        reader_name: &str,
        config: PcscConfig,
    ) -> Result<Self, PcscError> {
        let mut transport = Self {
            context,
            card: None,
            reader_name: reader_name.to_owned(),
            config,
        };

        transport.ensure_card()?;
        info!(reader = %transport.reader_name, "Card connected");

        Ok(transport)
    }

    /// Reader this transport talks through
    pub fn reader_name(&self) -> &str {
        &self.reader_name
    }

    /// ATR of the connected card
    pub fn atr(&self) -> Result<Vec<u8>, PcscError> {
        let card = self.card.as_ref().ok_or_else(|| self.no_card())?;
        Ok(card.get_attribute_owned(pcsc::Attribute::AtrString)?)
    }

    fn no_card(&self) -> PcscError {
        PcscError::NoCard(self.reader_name.clone())
    }

    /// Connect unless a card handle is already held
    fn ensure_card(&mut self) -> Result<&mut Card, PcscError> {
        if self.card.is_none() {
            let reader = CString::new(self.reader_name.as_str())
                .map_err(|_| PcscError::ReaderNotFound(self.reader_name.clone()))?;

            let card = self
                .context
                .connect(&reader, self.config.share_mode.into(), self.config.protocols)
                .map_err(|e| match e {
                    pcsc::Error::NoSmartcard => self.no_card(),
                    pcsc::Error::UnknownReader => PcscError::ReaderNotFound(self.reader_name.clone()),
                    other => other.into(),
                })?;
            self.card = Some(card);
        }

        self.card.as_mut().ok_or_else(|| PcscError::NoCard(self.reader_name.clone()))
    }

    fn exchange(&mut self, command: &[u8]) -> Result<Bytes, PcscError> {
        let mut buffer = [0u8; pcsc::MAX_BUFFER_SIZE];
        let card = self.ensure_card()?;

        match card.transmit(command, &mut buffer) {
            Ok(response) => {
                trace!(sent = command.len(), received = response.len(), "APDU exchanged");
                Ok(Bytes::copy_from_slice(response))
            }
            Err(e @ (pcsc::Error::ResetCard | pcsc::Error::RemovedCard)) => {
                self.card = None;
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl CardTransport for PcscTransport {
    type Error = TransportError;

    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        match self.exchange(command) {
            // one retry on a fresh handle when the card was reset underneath us
            Err(PcscError::Pcsc(pcsc::Error::ResetCard)) if self.config.auto_reconnect => {
                debug!(reader = %self.reader_name, "Card was reset, reconnecting");
                Ok(self.exchange(command)?)
            }
            result => Ok(result?),
        }
    }

    fn is_connected(&self) -> bool {
        self.card.is_some()
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        if let Some(card) = self.card.take() {
            if let Err((_, e)) = card.disconnect(Disposition::ResetCard) {
                debug!(error = %e, "Failed to reset card on disconnect");
            }
        }

        self.ensure_card()?;
        Ok(())
    }
}

impl Drop for PcscTransport {
    fn drop(&mut self) {
        if let Some(card) = self.card.take() {
            let _ = card.disconnect(Disposition::LeaveCard);
        }
    }
}
