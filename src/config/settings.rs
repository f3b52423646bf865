//! Persisted defaults for the command-line tool

use serde::{Deserialize, Serialize};

use crate::crypto::CipherKind;
use crate::format::KeyFormat;
use crate::keys::{KeyAlgorithm, RSA_DEFAULT_BITS};

/// Defaults applied when a command-line flag is not given
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub default_algorithm: KeyAlgorithm,
    /// RSA modulus size for `generate --algorithm rsa`
    pub rsa_bits: usize,
    pub default_format: KeyFormat,
    /// Cipher for passphrase-protected OpenSSH output
    pub default_cipher: CipherKind,
    pub default_comment: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_algorithm: KeyAlgorithm::Ed25519,
            rsa_bits: RSA_DEFAULT_BITS,
            default_format: KeyFormat::OpenSsh,
            default_cipher: CipherKind::Aes256Ctr,
            default_comment: String::new(),
        }
    }
}

impl Settings {
    /// Comment to use when none was given on the command line
    pub fn comment_or_default(&self, comment: Option<String>) -> Option<String> {
        comment.or_else(|| {
            (!self.default_comment.is_empty()).then(|| self.default_comment.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.rsa_bits, 3072);
        assert_eq!(settings.default_format, KeyFormat::OpenSsh);
        assert_eq!(settings.default_cipher, CipherKind::Aes256Ctr);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "default_cipher": "chacha20-poly1305", "rsa_bits": 4096 }"#)
                .unwrap();
        assert_eq!(settings.default_cipher, CipherKind::ChaCha20Poly1305);
        assert_eq!(settings.rsa_bits, 4096);
        assert_eq!(settings.default_algorithm, KeyAlgorithm::Ed25519);
    }

    #[test]
    fn test_json_names() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(json["default_algorithm"], "ed25519");
        assert_eq!(json["default_format"], "openssh");
        assert_eq!(json["default_cipher"], "aes256-ctr");
    }

    #[test]
    fn test_comment_or_default() {
        let mut settings = Settings::default();
        assert_eq!(settings.comment_or_default(None), None);

        settings.default_comment = "me@laptop".into();
        assert_eq!(settings.comment_or_default(None).as_deref(), Some("me@laptop"));
        assert_eq!(
            settings.comment_or_default(Some("ci".into())).as_deref(),
            Some("ci")
        );
    }
}
