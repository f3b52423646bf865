//! Format and cipher detection for armored key text
//!
//! Nothing here takes a passphrase. Detection only tells the caller whether
//! to prompt for one before the real decode is attempted.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::armor;
use super::container::AUTH_MAGIC;
use super::wire;
use crate::crypto::{CipherKind, CipherProfile};
use crate::error::{KeyCodecError, Result};

const PKCS8_MARKER: &str = "BEGIN PRIVATE KEY";
const PKCS8_ENCRYPTED_MARKER: &str = "BEGIN ENCRYPTED PRIVATE KEY";
const OPENSSH_MARKER: &str = "BEGIN OPENSSH PRIVATE KEY";
const LEGACY_ENCRYPTED_MARKER: &str = "Proc-Type: 4,ENCRYPTED";
const LEGACY_DEK_MARKER: &str = "DEK-Info:";

/// Private key envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum KeyFormat {
    #[serde(rename = "openssh")]
    #[value(name = "openssh")]
    OpenSsh,
    Pem,
    Pkcs8,
}

impl std::fmt::Display for KeyFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            KeyFormat::OpenSsh => "openssh",
            KeyFormat::Pem => "pem",
            KeyFormat::Pkcs8 => "pkcs8",
        })
    }
}

/// Whether armored text holds a private key or an authorized-keys line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTextKind {
    Private,
    Public,
}

/// Result of [`detect_cipher`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CipherDetection {
    pub cipher: CipherKind,
    pub passphrase_required: bool,
    /// Cipher name declared by an OpenSSH container, verbatim
    pub declared_name: Option<String>,
}

impl CipherDetection {
    fn unencrypted() -> Self {
        Self {
            cipher: CipherKind::None,
            passphrase_required: false,
            declared_name: None,
        }
    }
}

/// Classify armored key text by its markers. Unrecognized text is PEM.
pub fn detect_format(text: &str) -> KeyFormat {
    let text = text.trim();
    if text.contains(OPENSSH_MARKER) {
        KeyFormat::OpenSsh
    } else if text.contains(PKCS8_MARKER) || text.contains(PKCS8_ENCRYPTED_MARKER) {
        KeyFormat::Pkcs8
    } else {
        KeyFormat::Pem
    }
}

/// Private if it carries a private key marker, public if it starts like an
/// authorized-keys line, otherwise private (the decode attempt will decide).
pub fn classify(text: &str) -> KeyTextKind {
    let text = text.trim();
    let looks_private = text.contains("PRIVATE KEY-----") || text.contains(OPENSSH_MARKER);
    let looks_public =
        text.starts_with("ssh-") || text.starts_with("ecdsa-") || text.starts_with("sk-");

    if looks_private || !looks_public {
        KeyTextKind::Private
    } else {
        KeyTextKind::Public
    }
}

/// Report the cipher protecting a private key and whether a passphrase is needed
///
/// For OpenSSH containers the declared cipher name is read from the binary
/// header. For PEM and PKCS#8 this is a substring heuristic only; the
/// authoritative answer is whether the decrypt attempt succeeds.
///
/// # Errors
/// `MalformedContainer` if an OpenSSH payload lacks the magic preamble, or
/// its cipher name field is empty or overruns the buffer.
pub fn detect_cipher(format: KeyFormat, text: &str) -> Result<CipherDetection> {
    let text = text.trim();
    let detection = match format {
        KeyFormat::OpenSsh => detect_openssh_cipher(text)?,
        KeyFormat::Pem | KeyFormat::Pkcs8 => detect_pem_cipher(text),
    };

    tracing::debug!(
        %format,
        cipher = %detection.cipher,
        passphrase_required = detection.passphrase_required,
        "detected private key cipher"
    );
    Ok(detection)
}

fn detect_openssh_cipher(text: &str) -> Result<CipherDetection> {
    let name = read_openssh_cipher_name(text)?;

    if name == CipherKind::None.name() {
        return Ok(CipherDetection {
            declared_name: Some(name),
            ..CipherDetection::unencrypted()
        });
    }

    // Unknown cipher names still mean the key is encrypted
    let cipher = CipherProfile::by_name(&name)
        .map(|profile| profile.kind)
        .unwrap_or(CipherKind::None);

    Ok(CipherDetection {
        cipher,
        passphrase_required: true,
        declared_name: Some(name),
    })
}

/// Decode just enough of the container to read the cipher name field
fn read_openssh_cipher_name(text: &str) -> Result<String> {
    let payload = armor::unwrap(text)?;
    let mut input = &payload[..];

    let magic = wire::read_bytes(&mut input, AUTH_MAGIC.len())
        .map_err(|_| KeyCodecError::MalformedContainer("truncated before magic".into()))?;
    if magic != AUTH_MAGIC {
        return Err(KeyCodecError::MalformedContainer(
            "missing openssh-key-v1 magic".into(),
        ));
    }

    let name = wire::read_str(&mut input)?;
    if name.is_empty() {
        return Err(KeyCodecError::MalformedContainer("empty cipher name".into()));
    }
    Ok(name.to_string())
}

fn detect_pem_cipher(text: &str) -> CipherDetection {
    let encrypted = text.contains(PKCS8_ENCRYPTED_MARKER)
        || text.contains(LEGACY_ENCRYPTED_MARKER)
        || text.contains(LEGACY_DEK_MARKER);
    if !encrypted {
        return CipherDetection::unencrypted();
    }

    let cipher = if text.contains("AES-256-CTR") {
        CipherKind::Aes256Ctr
    } else if text.contains("ChaCha20") {
        CipherKind::ChaCha20Poly1305
    } else {
        CipherKind::None
    };

    CipherDetection {
        cipher,
        passphrase_required: true,
        declared_name: None,
    }
}
