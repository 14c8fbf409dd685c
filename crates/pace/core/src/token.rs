//! Authentication tokens exchanged in the last GENERAL AUTHENTICATE
//!
//! T(pk) = CMAC8(K_mac, `7F49 { 06 <oid>, 86 <pk> }`), where pk is the other
//! side's ephemeral public key.

use iso7816_tlv::ber::Tag;
use tracing::warn;

use crate::constants::tags;
use crate::crypto::{self, MAC_LEN};
use crate::ec::CurvePoint;
use crate::error::{Error, Result};
use crate::tlv;

/// Encode the public key data object the token is computed over
pub fn authentication_input(protocol: &[u8], public_key: &CurvePoint) -> Result<Vec<u8>> {
    let public_key_tag = Tag::try_from(tags::PUBLIC_KEY)?;
    let object = tlv::constructed(
        public_key_tag,
        vec![
            tlv::primitive(tags::OBJECT_IDENTIFIER, protocol.to_vec())?,
            tlv::primitive(tags::EC_PUBLIC_POINT, public_key.encode().to_vec())?,
        ],
    )?;
    Ok(object.to_vec())
}

/// Compute the token over the other side's ephemeral public key
pub fn compute_token(mac_key: &[u8], protocol: &[u8], public_key: &CurvePoint) -> Result<[u8; MAC_LEN]> {
    crypto::cmac8(mac_key, &authentication_input(protocol, public_key)?)
}

/// Check a token received from the card against our own ephemeral public key
pub fn verify_token(
    mac_key: &[u8],
    protocol: &[u8],
    public_key: &CurvePoint,
    token: &[u8],
) -> Result<()> {
    if crypto::verify_cmac8(mac_key, &authentication_input(protocol, public_key)?, token)? {
        Ok(())
    } else {
        warn!("Card authentication token did not verify");
        Err(Error::AuthenticationFailed)
    }
}
