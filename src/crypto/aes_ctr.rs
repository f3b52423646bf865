//! AES-256 in counter mode (`aes256-ctr`)
//!
//! Counter mode is a plain keystream: no padding is added here and the
//! output is exactly as long as the input. Block alignment of the private
//! section is the container's job.

use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;
use zeroize::Zeroizing;

use super::SecureBytes;
use crate::error::{KeyCodecError, Result};

/// Key length (256 bits)
pub const KEY_LEN: usize = 32;

/// IV length, one AES block
pub const IV_LEN: usize = 16;

type Aes256Ctr = Ctr128BE<Aes256>;

fn apply_keystream(key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<()> {
    let mut cipher = Aes256Ctr::new_from_slices(key, iv).map_err(|_| {
        KeyCodecError::CipherFailure(format!(
            "aes256-ctr expects a {}-byte key and {}-byte IV, got {} and {}",
            KEY_LEN,
            IV_LEN,
            key.len(),
            iv.len()
        ))
    })?;

    cipher
        .try_apply_keystream(data)
        .map_err(|_| KeyCodecError::CipherFailure("aes256-ctr keystream exhausted".into()))
}

/// Encrypt `plaintext` under `key`/`iv`. Ciphertext length equals plaintext length.
pub fn encrypt(plaintext: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
    // Holds plaintext until the keystream is applied, wiped if that fails
    let mut buffer = Zeroizing::new(plaintext.to_vec());
    apply_keystream(key, iv, &mut buffer)?;
    Ok(std::mem::take(&mut *buffer))
}

/// Decrypt `ciphertext` under `key`/`iv` into a wiped-on-drop buffer
pub fn decrypt(ciphertext: &[u8], key: &[u8], iv: &[u8]) -> Result<SecureBytes> {
    let mut buffer = SecureBytes::new(ciphertext.to_vec());
    apply_keystream(key, iv, &mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = [0x42u8; KEY_LEN];
        let iv = [0x24u8; IV_LEN];
        let plaintext = b"Hello, World! This is secret data.";

        let ciphertext = encrypt(plaintext, &key, &iv).unwrap();
        assert_eq!(ciphertext.len(), plaintext.len());
        assert_ne!(&ciphertext[..], &plaintext[..]);

        let decrypted = decrypt(&ciphertext, &key, &iv).unwrap();
        assert_eq!(&*decrypted, plaintext);
    }

    #[test]
    fn test_nist_sp800_38a_vector() {
        // F.5.5 CTR-AES256.Encrypt, first block
        let key = hex::decode("603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4")
            .unwrap();
        let iv = hex::decode("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff").unwrap();
        let plaintext = hex::decode("6bc1bee22e409f96e93d7e117393172a").unwrap();

        let ciphertext = encrypt(&plaintext, &key, &iv).unwrap();
        assert_eq!(hex::encode(ciphertext), "601ec313775789a5b7a7f504bbf3d228");
    }

    #[test]
    fn test_wrong_key_length_fails() {
        let result = encrypt(b"data", &[0u8; 16], &[0u8; IV_LEN]);
        assert!(matches!(result, Err(KeyCodecError::CipherFailure(_))));
    }

    #[test]
    fn test_wrong_iv_length_fails() {
        let result = decrypt(b"data", &[0u8; KEY_LEN], &[0u8; 12]);
        assert!(matches!(result, Err(KeyCodecError::CipherFailure(_))));
    }
}
