//! Command templates, object identifiers and tags used by PACE

use apdu_core::Command;

/// Object identifier content of id-PACE-ECDH-GM-AES-CBC-CMAC-256 (0.4.0.127.0.7.2.2.4.2.4)
pub const ID_PACE_ECDH_GM_AES_CBC_CMAC_256: [u8; 10] =
    [0x04, 0x00, 0x7F, 0x00, 0x07, 0x02, 0x02, 0x04, 0x02, 0x04];

/// Standardized domain parameter id of NIST P-256
pub const PARAMETER_ID_NIST_P256: u32 = 12;

/// File identifier of EF.CardAccess
pub const EF_CARD_ACCESS: [u8; 2] = [0x01, 0x1C];

/// SELECT FILE by EF identifier under the current DF, no response data
pub const SELECT_FILE: Command = Command::new(0x00, 0xA4, 0x01, 0x0C);

/// SELECT by DF name (application identifier)
pub const SELECT_APPLICATION: Command = Command::new(0x00, 0xA4, 0x04, 0x00);

/// READ BINARY from offset zero, as many bytes as available
pub const READ_BINARY: Command = Command::new_with_le(0x00, 0xB0, 0x00, 0x00, 0x00);

/// MSE:SET AT for mutual authentication
pub const MSE_SET_AT: Command = Command::new_with_le(0x00, 0x22, 0xC1, 0xA4, 0x00);

/// GENERAL AUTHENTICATE, command chaining bit set
pub const GENERAL_AUTHENTICATE_CHAINED: Command = Command::new_with_le(0x10, 0x86, 0x00, 0x00, 0x00);

/// GENERAL AUTHENTICATE, last command of the chain
pub const GENERAL_AUTHENTICATE: Command = Command::new_with_le(0x00, 0x86, 0x00, 0x00, 0x00);

/// Class bits marking a command as secure messaging with an authenticated header
pub const CLA_SECURE_MESSAGING: u8 = 0x0C;

/// Tags of the dynamic authentication data objects
pub(crate) mod tags {
    pub(crate) const DYNAMIC_AUTHENTICATION_DATA: u8 = 0x7C;
    pub(crate) const ENCRYPTED_NONCE: u8 = 0x80;
    pub(crate) const MAPPING_DATA_TERMINAL: u8 = 0x81;
    pub(crate) const MAPPING_DATA_CARD: u8 = 0x82;
    pub(crate) const EPHEMERAL_KEY_TERMINAL: u8 = 0x83;
    pub(crate) const EPHEMERAL_KEY_CARD: u8 = 0x84;
    pub(crate) const AUTH_TOKEN_TERMINAL: u8 = 0x85;
    pub(crate) const AUTH_TOKEN_CARD: u8 = 0x86;

    pub(crate) const CRYPTOGRAPHIC_MECHANISM: u8 = 0x80;
    pub(crate) const PASSWORD_REFERENCE: u8 = 0x83;

    pub(crate) const PUBLIC_KEY: u16 = 0x7F49;
    pub(crate) const OBJECT_IDENTIFIER: u8 = 0x06;
    pub(crate) const EC_PUBLIC_POINT: u8 = 0x86;

    pub(crate) const DER_SET: u8 = 0x31;
    pub(crate) const DER_SEQUENCE: u8 = 0x30;
    pub(crate) const DER_INTEGER: u8 = 0x02;

    pub(crate) const SM_CRYPTOGRAM: u8 = 0x87;
    pub(crate) const SM_EXPECTED_LENGTH: u8 = 0x97;
    pub(crate) const SM_STATUS_WORD: u8 = 0x99;
    pub(crate) const SM_MAC: u8 = 0x8E;
}

/// KDF counter for the encryption key
pub(crate) const KDF_ENC: u32 = 1;
/// KDF counter for the MAC key
pub(crate) const KDF_MAC: u32 = 2;
/// KDF counter for the password key
pub(crate) const KDF_PI: u32 = 3;
