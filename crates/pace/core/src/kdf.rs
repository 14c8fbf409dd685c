//! Key derivation: K_pi for the nonce and the session keys K_enc / K_mac

use std::fmt;

use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::constants::{KDF_ENC, KDF_MAC, KDF_PI};
use crate::crypto::{self, BLOCK_SIZE, Key};
use crate::error::{Error, Result};

/// KDF(secret, counter) = SHA-256(secret || counter as 4 byte big endian)
pub fn kdf(secret: &[u8], counter: u32) -> Zeroizing<Key> {
    let mut hasher = Sha256::new();
    hasher.update(secret);
    hasher.update(counter.to_be_bytes());
    Zeroizing::new(hasher.finalize().into())
}

/// Derive K_pi from the password (CAN, PIN or PUK bytes)
pub fn password_key(password: &[u8]) -> Zeroizing<Key> {
    kdf(password, KDF_PI)
}

/// Decrypt the nonce sent by the card with K_pi and an all-zero IV
pub fn decrypt_nonce(password: &[u8], encrypted_nonce: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if encrypted_nonce.is_empty() {
        return Err(Error::protocol("encrypted nonce is empty"));
    }
    let key = password_key(password);
    let nonce = crypto::aes_cbc_decrypt(key.as_slice(), &[0u8; BLOCK_SIZE], encrypted_nonce)?;
    Ok(Zeroizing::new(nonce))
}

/// Session keys agreed by PACE
///
/// Both keys are wiped from memory when dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SessionKeys {
    enc: Key,
    mac: Key,
}

impl SessionKeys {
    /// Create session keys from raw key material
    pub const fn new(enc: Key, mac: Key) -> Self {
        Self { enc, mac }
    }

    /// Derive K_enc and K_mac from the x coordinate of the shared point
    pub fn derive(shared_secret: &[u8]) -> Self {
        Self {
            enc: *kdf(shared_secret, KDF_ENC),
            mac: *kdf(shared_secret, KDF_MAC),
        }
    }

    /// Encryption key
    pub const fn enc(&self) -> &Key {
        &self.enc
    }

    /// MAC key
    pub const fn mac(&self) -> &Key {
        &self.mac
    }
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeys")
            .field("enc", &"<redacted>")
            .field("mac", &"<redacted>")
            .finish()
    }
}
