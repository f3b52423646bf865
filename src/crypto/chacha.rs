//! ChaCha20-Poly1305 as used for OpenSSH private keys
//! (`chacha20-poly1305@openssh.com`)
//!
//! This is not the RFC 8439 AEAD. Two keystreams are taken from the same
//! ChaCha20 key with an all-zero nonce:
//! - block 0 encrypts 32 zero bytes, giving the one-time Poly1305 key
//! - block 1 onwards encrypts the payload
//!
//! The tag is Poly1305 over the ciphertext alone, with no associated data
//! and no length block, and is appended after the ciphertext.
//!
//! OpenSSH derives 64 bytes of key material for this cipher. Only the first
//! 32 bytes key the payload stream; the second half is the packet-length key
//! of the transport variant and is unused for private keys.

use chacha20::cipher::{KeyIvInit, StreamCipher, StreamCipherSeek};
use chacha20::ChaCha20;
use poly1305::universal_hash::KeyInit;
use poly1305::Poly1305;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::SecureBytes;
use crate::error::{KeyCodecError, Result};

/// Key material derived by the KDF for this cipher
pub const KEY_MATERIAL_LEN: usize = 64;

/// Authentication tag length (128 bits)
pub const TAG_LEN: usize = 16;

const KEY_LEN: usize = 32;
const NONCE: [u8; 12] = [0u8; 12];
const BLOCK_LEN: u64 = 64;

/// Build the payload keystream (positioned at block 1) and the Poly1305
/// instance keyed from block 0.
fn keystreams(key_material: &[u8]) -> Result<(ChaCha20, Poly1305)> {
    if key_material.len() != KEY_MATERIAL_LEN {
        return Err(KeyCodecError::CipherFailure(format!(
            "chacha20-poly1305 expects {} bytes of key material, got {}",
            KEY_MATERIAL_LEN,
            key_material.len()
        )));
    }

    let mut cipher = ChaCha20::new_from_slices(&key_material[..KEY_LEN], &NONCE)
        .map_err(|e| KeyCodecError::CipherFailure(e.to_string()))?;

    let mut poly_key = Zeroizing::new([0u8; KEY_LEN]);
    cipher
        .try_apply_keystream(&mut poly_key[..])
        .map_err(|_| KeyCodecError::CipherFailure("poly1305 key stream failed".into()))?;

    cipher
        .try_seek(BLOCK_LEN)
        .map_err(|_| KeyCodecError::CipherFailure("chacha20 seek failed".into()))?;

    let mac = Poly1305::new(poly1305::Key::from_slice(&poly_key[..]));
    Ok((cipher, mac))
}

/// Encrypt `plaintext`, returning `ciphertext || tag`
pub fn encrypt(plaintext: &[u8], key_material: &[u8]) -> Result<Vec<u8>> {
    let (mut cipher, mac) = keystreams(key_material)?;

    // Plaintext until the keystream is applied, wiped if that fails
    let mut output = Zeroizing::new(Vec::with_capacity(plaintext.len() + TAG_LEN));
    output.extend_from_slice(plaintext);
    cipher
        .try_apply_keystream(&mut output)
        .map_err(|_| KeyCodecError::CipherFailure("chacha20 keystream exhausted".into()))?;

    let tag = mac.compute_unpadded(&output);
    output.extend_from_slice(tag.as_slice());
    Ok(std::mem::take(&mut *output))
}

/// Verify the trailing tag and decrypt `ciphertext || tag`
///
/// # Errors
/// - `MalformedContainer` if the input is shorter than a tag
/// - `DecryptionFailed` if the tag does not verify (wrong key or tampered data)
pub fn decrypt(sealed: &[u8], key_material: &[u8]) -> Result<SecureBytes> {
    if sealed.len() < TAG_LEN {
        return Err(KeyCodecError::MalformedContainer(
            "ciphertext shorter than the authentication tag".into(),
        ));
    }

    let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);
    let (mut cipher, mac) = keystreams(key_material)?;

    let expected = mac.compute_unpadded(ciphertext);
    if !bool::from(expected.as_slice().ct_eq(tag)) {
        return Err(KeyCodecError::DecryptionFailed);
    }

    let mut plaintext = SecureBytes::new(ciphertext.to_vec());
    cipher
        .try_apply_keystream(&mut plaintext)
        .map_err(|_| KeyCodecError::CipherFailure("chacha20 keystream exhausted".into()))?;

    Ok(plaintext)
}
