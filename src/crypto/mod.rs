//! Cipher & KDF engine for OpenSSH private key containers
//!
//! This module provides:
//! - bcrypt-pbkdf for passphrase-based key derivation
//! - AES-256-CTR and the OpenSSH ChaCha20-Poly1305 variant for the private section
//! - The static cipher profile table
//! - Secure memory handling with automatic zeroing

pub mod aes_ctr;
pub mod chacha;
mod kdf;
mod secure_bytes;

use clap::ValueEnum;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

pub use kdf::{
    derive_key, KdfParameters, BCRYPT_ROUNDS, KDF_BCRYPT, KDF_NONE, MAX_BCRYPT_ROUNDS, MAX_SALT_LEN,
    SALT_LEN,
};
pub use secure_bytes::SecureBytes;

use crate::error::{KeyCodecError, Result};

/// Private section cipher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CipherKind {
    #[value(skip)]
    None,
    Aes256Ctr,
    #[serde(rename = "chacha20-poly1305")]
    #[value(name = "chacha20-poly1305")]
    ChaCha20Poly1305,
}

impl CipherKind {
    pub fn profile(self) -> &'static CipherProfile {
        match self {
            CipherKind::None => &CIPHER_PROFILES[0],
            CipherKind::Aes256Ctr => &CIPHER_PROFILES[1],
            CipherKind::ChaCha20Poly1305 => &CIPHER_PROFILES[2],
        }
    }

    /// Wire name, as written in the container's cipher field
    pub fn name(self) -> &'static str {
        self.profile().name
    }

    /// Cipher actually used when encrypting with a passphrase. Anything that
    /// is not ChaCha20-Poly1305 falls back to AES-256-CTR.
    pub fn for_encryption(self) -> CipherKind {
        match self {
            CipherKind::ChaCha20Poly1305 => CipherKind::ChaCha20Poly1305,
            CipherKind::None | CipherKind::Aes256Ctr => CipherKind::Aes256Ctr,
        }
    }
}

impl std::fmt::Display for CipherKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Static parameters of a private section cipher
#[derive(Debug, PartialEq, Eq)]
pub struct CipherProfile {
    pub kind: CipherKind,
    pub name: &'static str,
    pub block_size: usize,
    pub key_len: usize,
    pub iv_len: usize,
    pub tag_len: usize,
}

/// The three ciphers this codec writes
pub static CIPHER_PROFILES: [CipherProfile; 3] = [
    CipherProfile {
        kind: CipherKind::None,
        name: "none",
        block_size: 8,
        key_len: 0,
        iv_len: 0,
        tag_len: 0,
    },
    CipherProfile {
        kind: CipherKind::Aes256Ctr,
        name: "aes256-ctr",
        block_size: 16,
        key_len: aes_ctr::KEY_LEN,
        iv_len: aes_ctr::IV_LEN,
        tag_len: 0,
    },
    CipherProfile {
        kind: CipherKind::ChaCha20Poly1305,
        name: "chacha20-poly1305@openssh.com",
        block_size: 8,
        key_len: chacha::KEY_MATERIAL_LEN,
        iv_len: 0,
        tag_len: chacha::TAG_LEN,
    },
];

impl CipherProfile {
    pub fn by_name(name: &str) -> Option<&'static CipherProfile> {
        CIPHER_PROFILES.iter().find(|profile| profile.name == name)
    }

    pub fn is_encrypted(&self) -> bool {
        self.kind != CipherKind::None
    }

    /// Bytes the KDF must produce for this cipher (key followed by IV)
    pub fn key_material_len(&self) -> usize {
        self.key_len + self.iv_len
    }

    /// Encrypt a block-aligned private section with derived key material.
    /// For AEAD profiles the tag is appended to the returned bytes.
    pub fn encrypt(&self, plaintext: &[u8], key_material: &[u8]) -> Result<Vec<u8>> {
        self.check_key_material(key_material)?;
        match self.kind {
            CipherKind::None => Ok(plaintext.to_vec()),
            CipherKind::Aes256Ctr => {
                let (key, iv) = key_material.split_at(self.key_len);
                aes_ctr::encrypt(plaintext, key, iv)
            }
            CipherKind::ChaCha20Poly1305 => chacha::encrypt(plaintext, key_material),
        }
    }

    /// Inverse of [`CipherProfile::encrypt`]; `sealed` includes the tag, if any
    pub fn decrypt(&self, sealed: &[u8], key_material: &[u8]) -> Result<SecureBytes> {
        self.check_key_material(key_material)?;
        match self.kind {
            CipherKind::None => Ok(SecureBytes::from(sealed)),
            CipherKind::Aes256Ctr => {
                let (key, iv) = key_material.split_at(self.key_len);
                aes_ctr::decrypt(sealed, key, iv)
            }
            CipherKind::ChaCha20Poly1305 => chacha::decrypt(sealed, key_material),
        }
    }

    fn check_key_material(&self, key_material: &[u8]) -> Result<()> {
        if key_material.len() != self.key_material_len() {
            return Err(KeyCodecError::CipherFailure(format!(
                "{} expects {} bytes of key material, got {}",
                self.name,
                self.key_material_len(),
                key_material.len()
            )));
        }
        Ok(())
    }
}

/// Fill `buf` from the operating system's CSPRNG
pub fn fill_random(buf: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| KeyCodecError::RandomSourceFailure(e.to_string()))
}

/// A random 32-bit value from the operating system's CSPRNG
pub fn random_u32() -> Result<u32> {
    let mut bytes = [0u8; 4];
    fill_random(&mut bytes)?;
    Ok(u32::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_table() {
        let none = CipherProfile::by_name("none").unwrap();
        assert_eq!(none.block_size, 8);
        assert_eq!(none.key_material_len(), 0);
        assert!(!none.is_encrypted());

        let aes = CipherProfile::by_name("aes256-ctr").unwrap();
        assert_eq!(aes.block_size, 16);
        assert_eq!(aes.key_material_len(), 48);
        assert_eq!(aes.tag_len, 0);

        let chacha = CipherProfile::by_name("chacha20-poly1305@openssh.com").unwrap();
        assert_eq!(chacha.block_size, 8);
        assert_eq!(chacha.key_material_len(), 64);
        assert_eq!(chacha.tag_len, 16);

        assert!(CipherProfile::by_name("aes128-cbc").is_none());
    }

    #[test]
    fn test_kind_profile_roundtrip() {
        for profile in CIPHER_PROFILES.iter() {
            assert_eq!(profile.kind.profile(), profile);
            assert_eq!(profile.kind.name(), profile.name);
        }
    }

    #[test]
    fn test_for_encryption_defaults_to_aes() {
        assert_eq!(CipherKind::None.for_encryption(), CipherKind::Aes256Ctr);
        assert_eq!(CipherKind::Aes256Ctr.for_encryption(), CipherKind::Aes256Ctr);
        assert_eq!(
            CipherKind::ChaCha20Poly1305.for_encryption(),
            CipherKind::ChaCha20Poly1305
        );
    }

    #[test]
    fn test_profile_encrypt_decrypt() {
        let plaintext = [0x5Au8; 32];
        for profile in CIPHER_PROFILES.iter() {
            let key_material = vec![0x11u8; profile.key_material_len()];
            let sealed = profile.encrypt(&plaintext, &key_material).unwrap();
            assert_eq!(sealed.len(), plaintext.len() + profile.tag_len);

            let opened = profile.decrypt(&sealed, &key_material).unwrap();
            assert_eq!(&*opened, &plaintext);
        }
    }

    #[test]
    fn test_profile_rejects_wrong_key_material_len() {
        let aes = CipherKind::Aes256Ctr.profile();
        let result = aes.encrypt(&[0u8; 16], &[0u8; 32]);
        assert!(matches!(result, Err(KeyCodecError::CipherFailure(_))));
    }

    #[test]
    fn test_cipher_kind_serde_names() {
        let json = serde_json::to_string(&CipherKind::ChaCha20Poly1305).unwrap();
        assert_eq!(json, "\"chacha20-poly1305\"");
        let parsed: CipherKind = serde_json::from_str("\"aes256-ctr\"").unwrap();
        assert_eq!(parsed, CipherKind::Aes256Ctr);
    }
}
