//! Generate, import, convert and inspect SSH keys
//!
//! Each entry point takes all of its inputs as arguments and returns plain
//! values. Decrypted key material is held in a [`KeyHandle`] for the length
//! of one call.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use zeroize::Zeroizing;

use crate::crypto::{CipherKind, CipherProfile};
use crate::error::{KeyCodecError, Result};
use crate::format::{classify, container, detect_cipher, detect_format, ContainerHeader, KeyFormat, KeyTextKind};
use crate::keys::{self, pem, Fingerprints, KeyAlgorithm, KeyHandle, KeyType, PublicKeyInfo};

/// How a private key should be written out
#[derive(Debug)]
pub struct ExportOptions {
    pub format: KeyFormat,
    /// Empty or absent means unencrypted
    pub passphrase: Option<SecretString>,
    /// Only used for encrypted OpenSSH output
    pub cipher: CipherKind,
    /// Replaces the key's comment when set
    pub comment: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: KeyFormat::OpenSsh,
            passphrase: None,
            cipher: CipherKind::Aes256Ctr,
            comment: None,
        }
    }
}

impl ExportOptions {
    fn passphrase(&self) -> Option<&SecretString> {
        non_empty(self.passphrase.as_ref())
    }

    /// Passphrase-protected output exists only for the OpenSSH container
    fn validate(&self) -> Result<()> {
        if self.passphrase().is_some() && self.format != KeyFormat::OpenSsh {
            return Err(KeyCodecError::UnsupportedCombination(format!(
                "защита парольной фразой для формата {} не поддерживается",
                self.format
            )));
        }
        Ok(())
    }
}

/// A private key written out by [`generate`] or [`convert`]
#[derive(Serialize)]
pub struct ExportedKey {
    #[serde(skip_serializing)]
    pub private_key: Zeroizing<String>,
    pub format: KeyFormat,
    pub cipher: CipherKind,
    #[serde(flatten)]
    pub public: PublicKeyInfo,
}

/// Result of [`import`]
#[derive(Serialize)]
pub struct ImportReport {
    pub is_private_key: bool,
    pub passphrase_protected: bool,
    pub detected_format: Option<KeyFormat>,
    pub detected_cipher: CipherKind,
    #[serde(flatten)]
    pub public: PublicKeyInfo,
    /// The private key text as given, trimmed
    #[serde(skip_serializing)]
    pub private_key: Option<Zeroizing<String>>,
}

impl ImportReport {
    pub fn key_type(&self) -> KeyType {
        self.public.key_type
    }

    pub fn fingerprints(&self) -> &Fingerprints {
        &self.public.fingerprints
    }
}

/// Result of [`inspect`]; nothing here needs a passphrase
#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub is_private_key: bool,
    pub format: Option<KeyFormat>,
    pub cipher: CipherKind,
    pub cipher_name: Option<String>,
    pub passphrase_required: bool,
    pub kdf: Option<String>,
    pub kdf_rounds: Option<u32>,
    /// Present for OpenSSH containers and public-key lines
    pub public: Option<PublicKeyInfo>,
}

/// Generate a new key pair and write it out
pub fn generate(algorithm: KeyAlgorithm, rsa_bits: usize, options: &ExportOptions) -> Result<ExportedKey> {
    // Fail before spending time on key generation
    options.validate()?;

    let mut handle = KeyHandle::generate(algorithm, rsa_bits)?;
    let exported = export(&mut handle, options)?;

    tracing::info!(
        %algorithm,
        format = %exported.format,
        cipher = %exported.cipher,
        "key pair generated"
    );
    Ok(exported)
}

/// Detect, decrypt and describe a private key, or normalize a public key line
pub fn import(
    text: &str,
    passphrase: Option<&SecretString>,
    comment: Option<&str>,
) -> Result<ImportReport> {
    let text = text.trim();
    if text.is_empty() {
        return Err(KeyCodecError::InvalidInput("пустой ключ".into()));
    }

    if classify(text) == KeyTextKind::Public {
        let (key, line_comment) = keys::parse_public_line(text)?;
        let comment = comment
            .filter(|c| !c.trim().is_empty())
            .map(str::to_string)
            .or(line_comment)
            .unwrap_or_default();

        return Ok(ImportReport {
            is_private_key: false,
            passphrase_protected: false,
            detected_format: None,
            detected_cipher: CipherKind::None,
            public: PublicKeyInfo::describe(&key, &comment)?,
            private_key: None,
        });
    }

    let format = detect_format(text);
    let detection = detect_cipher(format, text)?;
    let mut handle = load_private_key(text, passphrase)?;
    if let Some(comment) = comment.filter(|c| !c.trim().is_empty()) {
        handle.set_comment(comment);
    }

    tracing::info!(
        %format,
        cipher = %detection.cipher,
        key_type = %handle.key_type()?,
        "private key imported"
    );

    Ok(ImportReport {
        is_private_key: true,
        passphrase_protected: detection.passphrase_required,
        detected_format: Some(format),
        detected_cipher: detection.cipher,
        public: handle.public_info()?,
        private_key: Some(Zeroizing::new(text.to_string())),
    })
}

/// Decrypt a private key in any supported format into a handle
///
/// # Errors
/// `PassphraseRequired` when the key is encrypted and no (or an empty)
/// passphrase was supplied; `DecryptionFailed` when the passphrase is wrong.
pub fn load_private_key(text: &str, passphrase: Option<&SecretString>) -> Result<KeyHandle> {
    let text = text.trim();
    let passphrase = non_empty(passphrase);

    let format = detect_format(text);
    let detection = detect_cipher(format, text)?;
    if detection.passphrase_required && passphrase.is_none() {
        return Err(KeyCodecError::PassphraseRequired);
    }

    match format {
        KeyFormat::OpenSsh => {
            let native = detection
                .declared_name
                .as_deref()
                .and_then(CipherProfile::by_name)
                .is_some();

            if native {
                let decoded = container::decode(text, passphrase)?;
                KeyHandle::from_keypair(decoded.keypair, &decoded.comment)
            } else {
                tracing::debug!(
                    cipher = detection.declared_name.as_deref().unwrap_or(""),
                    "cipher not handled natively, delegating to ssh-key"
                );
                keys::decrypt_openssh(text, passphrase.map(|p| p.expose_secret().as_bytes()))
            }
        }
        KeyFormat::Pem | KeyFormat::Pkcs8 => {
            KeyHandle::from_private_key(pem::import(format, text, passphrase)?)
        }
    }
}

/// Decrypt with the current passphrase and write out under new options
pub fn convert(
    text: &str,
    current_passphrase: Option<&SecretString>,
    options: &ExportOptions,
) -> Result<ExportedKey> {
    options.validate()?;

    let mut handle = load_private_key(text, current_passphrase)?;
    let exported = export(&mut handle, options)?;

    tracing::info!(
        format = %exported.format,
        cipher = %exported.cipher,
        "key converted"
    );
    Ok(exported)
}

/// Report format, cipher, KDF and (for OpenSSH) the public key without decrypting
pub fn inspect(text: &str) -> Result<InspectReport> {
    let text = text.trim();
    if text.is_empty() {
        return Err(KeyCodecError::InvalidInput("пустой ключ".into()));
    }

    if classify(text) == KeyTextKind::Public {
        let (key, comment) = keys::parse_public_line(text)?;
        return Ok(InspectReport {
            is_private_key: false,
            format: None,
            cipher: CipherKind::None,
            cipher_name: None,
            passphrase_required: false,
            kdf: None,
            kdf_rounds: None,
            public: Some(PublicKeyInfo::describe(&key, comment.as_deref().unwrap_or(""))?),
        });
    }

    let format = detect_format(text);
    let detection = detect_cipher(format, text)?;
    let mut report = InspectReport {
        is_private_key: true,
        format: Some(format),
        cipher: detection.cipher,
        cipher_name: detection.declared_name,
        passphrase_required: detection.passphrase_required,
        kdf: None,
        kdf_rounds: None,
        public: None,
    };

    if format == KeyFormat::OpenSsh {
        let header = ContainerHeader::parse(text)?;
        report.kdf_rounds = header.kdf.as_ref().map(|kdf| kdf.rounds);
        report.kdf = Some(header.kdf_name.clone());
        report.public = Some(PublicKeyInfo::describe(&header.public_key()?, "")?);
    }

    Ok(report)
}

/// Copy `text` into a caller buffer as a NUL-terminated string
///
/// Returns the number of text bytes written, excluding the terminator.
pub fn copy_to_buffer(text: &str, buffer: &mut [u8]) -> Result<usize> {
    let needed = text.len() + 1;
    if buffer.len() < needed {
        return Err(KeyCodecError::BufferTooSmall {
            needed,
            available: buffer.len(),
        });
    }

    buffer[..text.len()].copy_from_slice(text.as_bytes());
    buffer[text.len()] = 0;
    Ok(text.len())
}

fn export(handle: &mut KeyHandle, options: &ExportOptions) -> Result<ExportedKey> {
    if let Some(comment) = options.comment.as_deref() {
        handle.set_comment(comment);
    }

    let passphrase = options.passphrase();
    let (private_key, cipher) = match (options.format, passphrase) {
        (KeyFormat::OpenSsh, Some(passphrase)) => {
            let cipher = options.cipher.for_encryption();
            let private_blob = handle.private_key_blob()?;
            let public_blob = handle.public_key_blob()?;
            let armored = container::encode(
                &private_blob,
                &public_blob,
                Some(passphrase),
                cipher,
                Some(handle.comment()),
            )?;
            (armored, cipher)
        }
        (KeyFormat::OpenSsh, None) => (handle.to_openssh()?, CipherKind::None),
        (KeyFormat::Pem, None) => (pem::export_pem(handle.keypair())?, CipherKind::None),
        (KeyFormat::Pkcs8, None) => (pem::export_pkcs8(handle.keypair())?, CipherKind::None),
        (format, Some(_)) => {
            return Err(KeyCodecError::UnsupportedCombination(format!(
                "защита парольной фразой для формата {} не поддерживается",
                format
            )))
        }
    };

    Ok(ExportedKey {
        private_key,
        format: options.format,
        cipher,
        public: handle.public_info()?,
    })
}

fn non_empty(passphrase: Option<&SecretString>) -> Option<&SecretString> {
    passphrase.filter(|p| !p.expose_secret().is_empty())
}
