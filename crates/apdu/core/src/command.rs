//! APDU command definitions
//!
//! This module provides the short command APDU according to ISO/IEC 7816-4:
//! a four byte header, an optional data field prefixed by Lc and an optional
//! expected response length (Le).

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::TransportError;

/// Expected length type for APDU commands
///
/// A value of `0` requests up to 256 bytes, as in ISO/IEC 7816-4 short form.
pub type ExpectedLength = u8;

/// Largest data field a short APDU can carry
pub const MAX_SHORT_DATA_LEN: usize = 255;

/// Generic APDU command structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command class byte
    pub cla: u8,
    /// Instruction byte
    pub ins: u8,
    /// Parameter 1
    pub p1: u8,
    /// Parameter 2
    pub p2: u8,
    /// Command data (optional)
    pub data: Option<Bytes>,
    /// Expected length (optional)
    pub le: Option<ExpectedLength>,
}

impl Command {
    /// Create a new command with just the header bytes
    ///
    /// Being `const`, this is how command templates are declared:
    ///
    /// ```
    /// use apdu_core::Command;
    ///
    /// const READ_BINARY: Command = Command::new(0x00, 0xB0, 0x00, 0x00);
    /// let cmd = READ_BINARY.with_le(0x00);
    /// assert_eq!(cmd.to_bytes().as_ref(), &[0x00, 0xB0, 0x00, 0x00, 0x00]);
    /// ```
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: None,
        }
    }

    /// Create a new command with expected response length (Le)
    pub const fn new_with_le(cla: u8, ins: u8, p1: u8, p2: u8, le: ExpectedLength) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: Some(le),
        }
    }

    /// Create a new command with data payload
    pub fn new_with_data<T: Into<Bytes>>(cla: u8, ins: u8, p1: u8, p2: u8, data: T) -> Self {
        Self::new(cla, ins, p1, p2).with_data(data)
    }

    /// Set the data field
    pub fn with_data<T: Into<Bytes>>(mut self, data: T) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Set the expected length field
    pub const fn with_le(mut self, le: ExpectedLength) -> Self {
        self.le = Some(le);
        self
    }

    /// Replace the class byte
    pub const fn with_class(mut self, cla: u8) -> Self {
        self.cla = cla;
        self
    }

    /// The four header bytes CLA, INS, P1, P2
    pub const fn header(&self) -> [u8; 4] {
        [self.cla, self.ins, self.p1, self.p2]
    }

    /// Command payload data, if any
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Expected response length, if any
    pub const fn expected_length(&self) -> Option<ExpectedLength> {
        self.le
    }

    /// Calculate length of serialized command
    pub fn command_length(&self) -> usize {
        let mut length = 4;
        if let Some(data) = self.data() {
            length += 1 + data.len();
        }
        if self.le.is_some() {
            length += 1;
        }
        length
    }

    /// Serialize the command
    ///
    /// Fails when the data field does not fit a short APDU.
    pub fn try_to_bytes(&self) -> Result<Bytes, TransportError> {
        if let Some(data) = self.data() {
            if data.len() > MAX_SHORT_DATA_LEN {
                return Err(TransportError::InvalidCommandLength(data.len()));
            }
        }
        Ok(self.to_bytes())
    }

    /// Convert to raw APDU bytes
    ///
    /// The Lc byte is truncated for oversized data; use [`Self::try_to_bytes`]
    /// when the data length is not known to fit.
    pub fn to_bytes(&self) -> Bytes {
        let mut buffer = BytesMut::with_capacity(self.command_length());

        buffer.put_slice(&self.header());

        // Lc and data; an empty data field is encoded as absent
        if let Some(data) = self.data().filter(|data| !data.is_empty()) {
            buffer.put_u8(data.len() as u8);
            buffer.put_slice(data);
        }

        if let Some(le) = self.le {
            buffer.put_u8(le);
        }

        buffer.freeze()
    }

    /// Parse a command from raw bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self, TransportError> {
        let [cla, ins, p1, p2, body @ ..] = data else {
            return Err(TransportError::InvalidCommandLength(data.len()));
        };

        let mut command = Self::new(*cla, *ins, *p1, *p2);

        match body {
            [] => {}
            [le] => command.le = Some(*le),
            [lc, rest @ ..] => {
                let lc = *lc as usize;
                if rest.len() < lc || rest.len() > lc + 1 {
                    return Err(TransportError::InvalidCommandLength(data.len()));
                }
                if lc > 0 {
                    command.data = Some(Bytes::copy_from_slice(&rest[..lc]));
                }
                if let Some(le) = rest.get(lc) {
                    command.le = Some(*le);
                }
            }
        }

        Ok(command)
    }
}
