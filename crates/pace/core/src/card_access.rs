//! EF.CardAccess: the PACE security info advertised by the card
//!
//! The file holds a DER `SET OF SEQUENCE { OID, INTEGER version, INTEGER parameterId }`.
//! Only cards advertising exactly one PACE record are supported.

use apdu_core::CardTransport;
use iso7816_tlv::ber::Tlv;
use tracing::{debug, trace};

use crate::constants::{
    EF_CARD_ACCESS, ID_PACE_ECDH_GM_AES_CBC_CMAC_256, PARAMETER_ID_NIST_P256, tags,
};
use crate::error::{Error, Result};
use crate::file::{read_binary, select_file};
use crate::tlv;

/// A PACE record from EF.CardAccess
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardAccessInfo {
    /// Protocol object identifier, content bytes only
    protocol: Vec<u8>,
    /// Protocol version
    version: u32,
    /// Standardized domain parameter id
    parameter_id: u32,
}

impl CardAccessInfo {
    /// Create a record from its parts
    pub fn new(protocol: impl Into<Vec<u8>>, version: u32, parameter_id: u32) -> Self {
        Self {
            protocol: protocol.into(),
            version,
            parameter_id,
        }
    }

    /// The record this crate implements: ECDH Generic Mapping with AES-256 on P-256
    pub fn pace_ecdh_gm_aes256_p256() -> Self {
        Self::new(ID_PACE_ECDH_GM_AES_CBC_CMAC_256, 2, PARAMETER_ID_NIST_P256)
    }

    /// Protocol OID content bytes
    pub fn protocol(&self) -> &[u8] {
        &self.protocol
    }

    /// Protocol version
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Standardized domain parameter id
    pub const fn parameter_id(&self) -> u32 {
        self.parameter_id
    }

    /// Parse the contents of EF.CardAccess
    pub fn from_der(data: &[u8]) -> Result<Self> {
        let (set, rest) = Tlv::parse(data);
        let set = set?;
        if !rest.is_empty() {
            trace!(trailing = rest.len(), "Ignoring bytes after EF.CardAccess SET");
        }

        let records = tlv::constructed_value(&set, &tlv::tag(tags::DER_SET)?)?;
        let [record] = records else {
            return Err(Error::protocol(format!(
                "expected exactly one security info record, found {}",
                records.len()
            )));
        };

        let fields = tlv::constructed_value(record, &tlv::tag(tags::DER_SEQUENCE)?)?;
        let [protocol, version, parameter_id] = fields else {
            return Err(Error::protocol(format!(
                "security info has {} fields, expected 3",
                fields.len()
            )));
        };

        let protocol = tlv::primitive_value(protocol, &tlv::tag(tags::OBJECT_IDENTIFIER)?)?;
        if protocol.is_empty() {
            return Err(Error::protocol("empty protocol identifier"));
        }

        Ok(Self {
            protocol: protocol.to_vec(),
            version: parse_integer(version)?,
            parameter_id: parse_integer(parameter_id)?,
        })
    }

    /// Encode as the DER contents of EF.CardAccess
    pub fn to_der(&self) -> Result<Vec<u8>> {
        let record = tlv::constructed(
            tlv::tag(tags::DER_SEQUENCE)?,
            vec![
                tlv::primitive(tags::OBJECT_IDENTIFIER, self.protocol.clone())?,
                tlv::primitive(tags::DER_INTEGER, encode_integer(self.version))?,
                tlv::primitive(tags::DER_INTEGER, encode_integer(self.parameter_id))?,
            ],
        )?;
        Ok(tlv::constructed(tlv::tag(tags::DER_SET)?, vec![record])?.to_vec())
    }

    /// Check that the record names the supported protocol and curve
    pub fn validate(&self) -> Result<()> {
        if self.protocol != ID_PACE_ECDH_GM_AES_CBC_CMAC_256 {
            return Err(Error::protocol(format!(
                "unsupported PACE protocol {}",
                hex::encode(&self.protocol)
            )));
        }
        if self.parameter_id != PARAMETER_ID_NIST_P256 {
            return Err(Error::protocol(format!(
                "unsupported domain parameter id {}",
                self.parameter_id
            )));
        }
        Ok(())
    }
}

impl TryFrom<&[u8]> for CardAccessInfo {
    type Error = Error;

    fn try_from(data: &[u8]) -> Result<Self> {
        Self::from_der(data)
    }
}

/// Select and read EF.CardAccess, then parse its single PACE record
pub fn read_card_access<T: CardTransport>(card: &mut T) -> Result<CardAccessInfo>
where
    Error: From<T::Error>,
{
    select_file(card, &EF_CARD_ACCESS)?;
    let content = read_binary(card)?;
    debug!(content = %hex::encode(&content), "Read EF.CardAccess");
    CardAccessInfo::from_der(&content)
}

/// Non-negative DER INTEGER that fits in 32 bits
fn parse_integer(tlv: &Tlv) -> Result<u32> {
    let bytes = tlv::primitive_value(tlv, &tlv::tag(tags::DER_INTEGER)?)?;

    match bytes {
        [] => Err(Error::protocol("empty INTEGER")),
        [first, ..] if first & 0x80 != 0 => Err(Error::protocol("negative INTEGER")),
        [0x00, rest @ ..] if rest.len() > 4 => Err(Error::protocol("INTEGER out of range")),
        [first, rest @ ..] if *first != 0x00 && rest.len() > 3 => {
            Err(Error::protocol("INTEGER out of range"))
        }
        bytes => Ok(bytes
            .iter()
            .fold(0u32, |acc, &b| (acc << 8) | u32::from(b))),
    }
}

/// Minimal DER INTEGER content for a non-negative value
fn encode_integer(value: u32) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
    let mut out = Vec::with_capacity(5);
    if bytes[start] & 0x80 != 0 {
        out.push(0x00);
    }
    out.extend_from_slice(&bytes[start..]);
    out
}
