//! Symmetric primitives: AES-CBC, single-block AES-ECB, truncated AES-CMAC
//! and ISO/IEC 7816-4 padding.
//!
//! All keys are 32 bytes (AES-256). Ciphertexts handled here are always
//! block aligned; padding is applied explicitly by the caller with [`pad`].

use aes::Aes256;
use cipher::{
    BlockDecryptMut, BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit, block_padding::NoPadding,
};
use cmac::{Cmac, Mac};

use crate::error::{Error, Result};

/// AES block size in bytes
pub const BLOCK_SIZE: usize = 16;

/// Length of the truncated CMAC used by PACE and secure messaging
pub const MAC_LEN: usize = 8;

/// AES-256 key
pub type Key = [u8; 32];

/// Single AES block
pub type Block = [u8; BLOCK_SIZE];

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Pad data according to ISO/IEC 7816-4: a `80` byte, then zeros up to the
/// next block boundary. Always adds at least one byte.
pub fn pad(data: &[u8]) -> Vec<u8> {
    let padded_len = (data.len() / BLOCK_SIZE + 1) * BLOCK_SIZE;
    let mut padded = Vec::with_capacity(padded_len);
    padded.extend_from_slice(data);
    padded.push(0x80);
    padded.resize(padded_len, 0x00);
    padded
}

/// Strip ISO/IEC 7816-4 padding
///
/// Trailing zeros are skipped; the byte before them must be `80`.
pub fn unpad(data: &[u8]) -> Result<&[u8]> {
    let end = data
        .iter()
        .rposition(|&b| b != 0x00)
        .ok_or_else(|| Error::protocol("padding marker missing"))?;

    if data[end] != 0x80 {
        return Err(Error::protocol("invalid padding"));
    }
    Ok(&data[..end])
}

fn check_block_aligned(data: &[u8]) -> Result<()> {
    if data.len() % BLOCK_SIZE != 0 {
        return Err(Error::protocol(format!(
            "data length {} is not a multiple of the block size",
            data.len()
        )));
    }
    Ok(())
}

/// AES-CBC encrypt block aligned data
pub fn aes_cbc_encrypt(key: &[u8], iv: &Block, data: &[u8]) -> Result<Vec<u8>> {
    check_block_aligned(data)?;
    let encryptor =
        Aes256CbcEnc::new_from_slices(key, iv).map_err(|_| Error::CryptoInit("AES-CBC"))?;
    Ok(encryptor.encrypt_padded_vec_mut::<NoPadding>(data))
}

/// AES-CBC decrypt block aligned data
pub fn aes_cbc_decrypt(key: &[u8], iv: &Block, data: &[u8]) -> Result<Vec<u8>> {
    check_block_aligned(data)?;
    let decryptor =
        Aes256CbcDec::new_from_slices(key, iv).map_err(|_| Error::CryptoInit("AES-CBC"))?;
    decryptor
        .decrypt_padded_vec_mut::<NoPadding>(data)
        .map_err(|_| Error::protocol("AES-CBC decryption failed"))
}

/// Encrypt a single block with AES in ECB mode
pub fn aes_ecb_encrypt_block(key: &[u8], block: &Block) -> Result<Block> {
    let cipher = Aes256::new_from_slice(key).map_err(|_| Error::CryptoInit("AES"))?;
    let mut out = aes::Block::from(*block);
    cipher.encrypt_block(&mut out);

    let mut result = [0u8; BLOCK_SIZE];
    result.copy_from_slice(&out);
    Ok(result)
}

fn cmac(key: &[u8], data: &[u8]) -> Result<Cmac<Aes256>> {
    let mut mac = <Cmac<Aes256> as Mac>::new_from_slice(key)
        .map_err(|_| Error::CryptoInit("AES-CMAC"))?;
    mac.update(data);
    Ok(mac)
}

/// AES-CMAC truncated to its leftmost [`MAC_LEN`] bytes
pub fn cmac8(key: &[u8], data: &[u8]) -> Result<[u8; MAC_LEN]> {
    let tag = cmac(key, data)?.finalize().into_bytes();
    let mut truncated = [0u8; MAC_LEN];
    truncated.copy_from_slice(&tag[..MAC_LEN]);
    Ok(truncated)
}

/// Check a truncated AES-CMAC in constant time
///
/// Returns `Ok(false)` for a mismatch, including a tag of the wrong length.
pub fn verify_cmac8(key: &[u8], data: &[u8], tag: &[u8]) -> Result<bool> {
    if tag.len() != MAC_LEN {
        return Ok(false);
    }
    Ok(cmac(key, data)?.verify_truncated_left(tag).is_ok())
}
