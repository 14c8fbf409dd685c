//! Secure messaging channel established by PACE
//!
//! Every command is encrypted and authenticated with the session keys and
//! every response is verified before anything in it is trusted. The channel
//! implements [`CardTransport`] itself, so the generic helpers in
//! [`crate::file`] work over it unchanged.
//!
//! The send sequence counter (SSC) starts at zero, is incremented once before
//! protecting a command and once more before verifying its response.
//!
//! Any failure during an exchange makes the channel unusable. The only
//! exception is a non-success status word that arrived inside a correctly
//! authenticated response: the card answered properly, it just refused the
//! command. A command too large to protect is rejected before anything is
//! sent and leaves the channel as it was.

use apdu_core::{
    Bytes, CardTransport, Command, MAX_SHORT_DATA_LEN, Response, StatusWord, TransportError,
};
use iso7816_tlv::ber::{Tlv, Value};
use tracing::{debug, trace, warn};

use crate::constants::{CLA_SECURE_MESSAGING, tags};
use crate::crypto::{self, BLOCK_SIZE, Block, MAC_LEN};
use crate::error::{Error, Result};
use crate::kdf::SessionKeys;
use crate::tlv;

/// Padding-content indicator in DO87: ISO/IEC 7816-4 padding
const PADDING_INDICATOR: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelState {
    Established,
    Unusable,
}

/// A response after MAC verification and decryption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnprotectedResponse {
    data: Bytes,
    status: StatusWord,
}

impl UnprotectedResponse {
    /// Decrypted response data, empty if the card sent none
    pub const fn data(&self) -> &Bytes {
        &self.data
    }

    /// Status word from the authenticated status object
    pub const fn status(&self) -> StatusWord {
        self.status
    }
}

/// Secure messaging wrapper around a plain card transport
#[derive(Debug)]
pub struct SecureMessaging<T: CardTransport<Error = TransportError>> {
    transport: T,
    keys: SessionKeys,
    ssc: u64,
    state: ChannelState,
}

impl<T: CardTransport<Error = TransportError>> SecureMessaging<T> {
    /// Wrap a transport with the session keys from a completed handshake
    pub const fn new(transport: T, keys: SessionKeys) -> Self {
        Self {
            transport,
            keys,
            ssc: 0,
            state: ChannelState::Established,
        }
    }

    /// Current value of the send sequence counter
    pub const fn send_sequence_counter(&self) -> u64 {
        self.ssc
    }

    /// Whether the channel can still be used
    pub const fn is_usable(&self) -> bool {
        matches!(self.state, ChannelState::Established)
    }

    /// Borrow the underlying plain transport
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the underlying plain transport
    ///
    /// Anything sent directly bypasses the channel and desynchronises the
    /// counter with the card.
    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give back the underlying plain transport
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// A counter value as the 16 byte block used for IVs and MACs
    fn ssc_block(ssc: u64) -> Block {
        let mut block = [0u8; BLOCK_SIZE];
        block[BLOCK_SIZE - 8..].copy_from_slice(&ssc.to_be_bytes());
        block
    }

    fn next_ssc(&self) -> Result<u64> {
        self.ssc
            .checked_add(1)
            .ok_or_else(|| Error::protocol("send sequence counter exhausted"))
    }

    fn iv(&self, ssc: u64) -> Result<Block> {
        crypto::aes_ecb_encrypt_block(self.keys.enc(), &Self::ssc_block(ssc))
    }

    /// Increment the counter and wrap a command into its protected form
    ///
    /// The counter only moves once the protected command is complete, so a
    /// command that cannot be protected leaves the channel in step with the card.
    pub fn protect_command(&mut self, command: &Command) -> Result<Bytes> {
        let ssc = self.next_ssc()?;

        let header = [
            command.cla | CLA_SECURE_MESSAGING,
            command.ins,
            command.p1,
            command.p2,
        ];

        let mut objects = Vec::new();
        if let Some(data) = command.data().filter(|data| !data.is_empty()) {
            let cryptogram =
                crypto::aes_cbc_encrypt(self.keys.enc(), &self.iv(ssc)?, &crypto::pad(data))?;
            let mut value = Vec::with_capacity(1 + cryptogram.len());
            value.push(PADDING_INDICATOR);
            value.extend_from_slice(&cryptogram);
            objects.extend(tlv::primitive(tags::SM_CRYPTOGRAM, value)?.to_vec());
        }
        if let Some(le) = command.expected_length() {
            objects.extend(tlv::primitive(tags::SM_EXPECTED_LENGTH, vec![le])?.to_vec());
        }

        let mut mac_input = Vec::with_capacity(2 * BLOCK_SIZE + objects.len());
        mac_input.extend_from_slice(&Self::ssc_block(ssc));
        mac_input.extend(crypto::pad(&header));
        mac_input.extend_from_slice(&objects);
        let mac = crypto::cmac8(self.keys.mac(), &crypto::pad(&mac_input))?;
        objects.extend(tlv::primitive(tags::SM_MAC, mac.to_vec())?.to_vec());

        if objects.len() > MAX_SHORT_DATA_LEN {
            return Err(Error::protocol(format!(
                "protected command body of {} bytes does not fit a short APDU",
                objects.len()
            )));
        }

        let [cla, ins, p1, p2] = header;
        let apdu = Command::new_with_data(cla, ins, p1, p2, objects)
            .with_le(0x00)
            .try_to_bytes()?;

        self.ssc = ssc;
        debug!(
            ssc = self.ssc,
            header = %hex::encode_upper(header),
            "Protected command"
        );
        Ok(apdu)
    }

    /// Increment the counter, verify the MAC of a protected response body and decrypt it
    pub fn unprotect_response(&mut self, body: &[u8]) -> Result<UnprotectedResponse> {
        self.ssc = self.next_ssc()?;

        let mut cryptogram = None;
        let mut status = None;
        let mut mac = None;
        let mut remaining = body;

        while !remaining.is_empty() {
            let offset = body.len() - remaining.len();
            let (object, rest) = Tlv::parse(remaining);
            let object = object?;
            remaining = rest;

            let Value::Primitive(value) = object.value() else {
                return Err(Error::protocol(format!(
                    "constructed object {} in protected response",
                    tlv::tag_name(object.tag())
                )));
            };

            match object.tag().to_bytes() {
                [tags::SM_CRYPTOGRAM] if cryptogram.is_none() && status.is_none() => {
                    cryptogram = Some(value.clone());
                }
                [tags::SM_STATUS_WORD] if status.is_none() => status = Some(value.clone()),
                [tags::SM_MAC] if remaining.is_empty() => mac = Some((offset, value.clone())),
                _ => {
                    return Err(Error::protocol(format!(
                        "unexpected object {} in protected response",
                        tlv::tag_name(object.tag())
                    )));
                }
            }
        }

        let (mac_offset, mac) = mac.ok_or_else(|| Error::protocol("response MAC object missing"))?;
        let status = status.ok_or_else(|| Error::protocol("response status object missing"))?;

        let mut mac_input = Vec::with_capacity(BLOCK_SIZE + mac_offset);
        mac_input.extend_from_slice(&Self::ssc_block(self.ssc));
        mac_input.extend_from_slice(&body[..mac_offset]);
        if mac.len() != MAC_LEN
            || !crypto::verify_cmac8(self.keys.mac(), &crypto::pad(&mac_input), &mac)?
        {
            warn!(ssc = self.ssc, "Response MAC verification failed");
            return Err(Error::MacVerificationFailed);
        }

        let status = match status.as_slice() {
            [sw1, sw2] => StatusWord::new(*sw1, *sw2),
            _ => {
                return Err(Error::protocol(format!(
                    "status object has {} bytes, expected 2",
                    status.len()
                )));
            }
        };

        let data = match cryptogram {
            Some(cryptogram) => self.decrypt_cryptogram(&cryptogram)?,
            None => Bytes::new(),
        };

        debug!(ssc = self.ssc, status = %status, len = data.len(), "Verified response");
        Ok(UnprotectedResponse { data, status })
    }

    fn decrypt_cryptogram(&self, value: &[u8]) -> Result<Bytes> {
        let [indicator, cryptogram @ ..] = value else {
            return Err(Error::protocol("empty cryptogram object"));
        };
        if *indicator != PADDING_INDICATOR {
            return Err(Error::protocol(format!(
                "unsupported padding indicator {indicator:02X}"
            )));
        }
        if cryptogram.is_empty() {
            return Err(Error::protocol("empty cryptogram"));
        }

        let plaintext = crypto::aes_cbc_decrypt(self.keys.enc(), &self.iv(self.ssc)?, cryptogram)?;
        Ok(Bytes::copy_from_slice(crypto::unpad(&plaintext)?))
    }

    fn exchange(&mut self, apdu: &[u8]) -> Result<UnprotectedResponse> {
        let raw = self.transport.transmit_raw(apdu)?;
        let response = Response::from_bytes(&raw)?;

        match response.payload() {
            Some(body) => self.unprotect_response(body),
            None => {
                // nothing to verify, the card has dropped secure messaging
                self.ssc = self.next_ssc()?;
                Err(TransportError::Status(response.status()).into())
            }
        }
    }
}

impl<T: CardTransport<Error = TransportError>> CardTransport for SecureMessaging<T> {
    type Error = Error;

    fn do_transmit_raw(&mut self, _command: &[u8]) -> Result<Bytes> {
        Err(Error::UnsupportedOperation(
            "raw APDUs cannot be sent over secure messaging",
        ))
    }

    fn transmit(&mut self, command: &Command) -> Result<Bytes> {
        if !self.is_usable() {
            return Err(Error::ChannelUnusable);
        }

        trace!(ins = command.ins, ssc = self.ssc, "Secure messaging command");
        // nothing has reached the card if protection fails
        let apdu = self.protect_command(command)?;
        let response = self.exchange(&apdu).inspect_err(|error| {
            warn!(%error, "Secure messaging exchange failed, closing channel");
            self.state = ChannelState::Unusable;
        })?;

        if !response.status().is_success() {
            return Err(TransportError::Status(response.status()).into());
        }
        Ok(response.data)
    }

    fn is_connected(&self) -> bool {
        self.is_usable() && self.transport.is_connected()
    }

    fn reset(&mut self) -> Result<()> {
        // a card reset ends the session on the card side as well
        self.state = ChannelState::Unusable;
        Ok(self.transport.reset()?)
    }
}
