//! bcrypt-pbkdf key derivation
//!
//! OpenSSH derives the private section's cipher key and IV from the
//! passphrase with bcrypt-pbkdf. The output is not a simple concatenation
//! of independent blocks: bytes are interleaved across the whole requested
//! length, so key and IV must always be derived together in one call.

use bcrypt_pbkdf::bcrypt_pbkdf;

use super::{fill_random, SecureBytes};
use crate::error::{KeyCodecError, Result};

/// KDF name written when the private section is encrypted
pub const KDF_BCRYPT: &str = "bcrypt";

/// KDF name written when the private section is stored in the clear
pub const KDF_NONE: &str = "none";

/// Salt length used for new containers
pub const SALT_LEN: usize = 16;

/// Round count used for new containers
pub const BCRYPT_ROUNDS: u32 = 16;

/// Highest round count accepted from an existing container. Each round
/// costs a full bcrypt pass over the output, so an unbounded count read
/// from a file would let it stall the caller.
pub const MAX_BCRYPT_ROUNDS: u32 = 1024;

/// Longest salt accepted from an existing container
pub const MAX_SALT_LEN: usize = 64;

/// Salt and round count of one bcrypt-pbkdf derivation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfParameters {
    pub salt: Vec<u8>,
    pub rounds: u32,
}

impl KdfParameters {
    /// Fresh parameters for a new export. Never reuse these across exports.
    pub fn generate() -> Result<Self> {
        let mut salt = vec![0u8; SALT_LEN];
        fill_random(&mut salt)?;

        Ok(Self {
            salt,
            rounds: BCRYPT_ROUNDS,
        })
    }

    /// Derive `output_len` bytes of key material for these parameters
    pub fn derive(&self, passphrase: &[u8], output_len: usize) -> Result<SecureBytes> {
        derive_key(passphrase, &self.salt, self.rounds, output_len)
    }
}

/// Derive key material from a passphrase with bcrypt-pbkdf
///
/// # Errors
/// Returns `KdfFailure` for an empty passphrase, empty salt, zero rounds or
/// an output length the primitive rejects. No partially derived material is
/// ever returned: the output buffer is wiped when the derivation fails.
pub fn derive_key(
    passphrase: &[u8],
    salt: &[u8],
    rounds: u32,
    output_len: usize,
) -> Result<SecureBytes> {
    if passphrase.is_empty() {
        return Err(KeyCodecError::KdfFailure("empty passphrase".into()));
    }
    if rounds == 0 {
        return Err(KeyCodecError::KdfFailure("zero rounds".into()));
    }

    let mut output = SecureBytes::zeroed(output_len);
    bcrypt_pbkdf(passphrase, salt, rounds, &mut output)
        .map_err(|e| KeyCodecError::KdfFailure(e.to_string()))?;

    tracing::trace!(rounds, output_len, "bcrypt-pbkdf derivation complete");
    Ok(output)
}
