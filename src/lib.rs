//! sshkey-codec - OpenSSH private key container codec
//!
//! This crate provides:
//! - Generation of RSA, Ed25519 and ECDSA key pairs
//! - Reading and writing the `openssh-key-v1` container with bcrypt-pbkdf
//!   and aes256-ctr or chacha20-poly1305@openssh.com encryption
//! - Import and export of PEM (PKCS#1 / SEC1) and PKCS#8 private keys
//! - Public key lines and SHA256 / MD5 fingerprints

pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod format;
pub mod keys;
pub mod pipeline;

pub use crypto::CipherKind;
pub use error::{ErrorKind, KeyCodecError, Result};
pub use format::KeyFormat;
pub use keys::{KeyAlgorithm, KeyHandle, KeyType, PublicKeyInfo};
pub use pipeline::{
    convert, copy_to_buffer, generate, import, inspect, load_private_key, ExportOptions,
    ExportedKey, ImportReport, InspectReport,
};
