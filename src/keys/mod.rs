//! SSH key pairs: generation, public key export and fingerprints
//!
//! Key material lives in an [`ssh_key::PrivateKey`] wrapped by [`KeyHandle`],
//! which owns it for the duration of one operation and wipes it on drop.

pub mod pem;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::ValueEnum;
use md5::{Digest, Md5};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use ssh_encoding::Decode;
use ssh_key::private::{EcdsaKeypair, Ed25519Keypair, KeypairData, RsaKeypair};
use ssh_key::public::KeyData;
use ssh_key::{Algorithm, EcdsaCurve, HashAlg, LineEnding, Mpint, PrivateKey};
use zeroize::Zeroizing;

use crate::crypto::SecureBytes;
use crate::error::{KeyCodecError, Result};
use crate::format::container;

/// Smallest RSA modulus accepted for generation
pub const RSA_MIN_BITS: usize = 2048;

/// Largest RSA modulus accepted for generation
pub const RSA_MAX_BITS: usize = 16384;

/// RSA modulus used when none is requested
pub const RSA_DEFAULT_BITS: usize = 3072;

/// Algorithm of a key to generate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum KeyAlgorithm {
    Rsa,
    Ed25519,
    EcdsaP256,
    EcdsaP384,
    EcdsaP521,
}

impl std::fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            KeyAlgorithm::Rsa => "rsa",
            KeyAlgorithm::Ed25519 => "ed25519",
            KeyAlgorithm::EcdsaP256 => "ecdsa-p256",
            KeyAlgorithm::EcdsaP384 => "ecdsa-p384",
            KeyAlgorithm::EcdsaP521 => "ecdsa-p521",
        })
    }
}

/// Family of an existing key, as reported by import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Rsa,
    Ed25519,
    Ecdsa,
    Dsa,
}

impl KeyType {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyType::Rsa => "rsa",
            KeyType::Ed25519 => "ed25519",
            KeyType::Ecdsa => "ecdsa",
            KeyType::Dsa => "dsa",
        }
    }
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fingerprints {
    /// `SHA256:` followed by unpadded base64
    pub sha256: String,
    /// `MD5:` followed by colon separated hex pairs
    pub md5: String,
}

/// Everything derivable from a public key alone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicKeyInfo {
    pub key_type: KeyType,
    pub bit_length: usize,
    /// Authorized-keys line: `type base64 [comment]`
    pub public_key: String,
    pub fingerprints: Fingerprints,
}

impl PublicKeyInfo {
    pub fn describe(key: &KeyData, comment: &str) -> Result<Self> {
        Ok(Self {
            key_type: key_type_of(key)?,
            bit_length: bit_length_of(key)?,
            public_key: authorized_key_line(key, comment)?,
            fingerprints: fingerprints_of(key)?,
        })
    }
}

/// Opaque owner of a decrypted or freshly generated private key
///
/// Not `Clone`: each pipeline operation holds exactly one copy of the key
/// material, released when the handle goes out of scope.
pub struct KeyHandle {
    key: PrivateKey,
}

impl KeyHandle {
    /// Generate a new key pair. `rsa_bits` is ignored for non-RSA algorithms.
    pub fn generate(algorithm: KeyAlgorithm, rsa_bits: usize) -> Result<Self> {
        let keypair = match algorithm {
            KeyAlgorithm::Rsa => {
                if !(RSA_MIN_BITS..=RSA_MAX_BITS).contains(&rsa_bits) {
                    return Err(KeyCodecError::InvalidInput(format!(
                        "размер ключа RSA должен быть от {} до {} бит",
                        RSA_MIN_BITS, RSA_MAX_BITS
                    )));
                }
                KeypairData::Rsa(
                    RsaKeypair::random(&mut OsRng, rsa_bits)
                        .map_err(|e| KeyCodecError::RandomSourceFailure(e.to_string()))?,
                )
            }
            KeyAlgorithm::Ed25519 => KeypairData::Ed25519(Ed25519Keypair::random(&mut OsRng)),
            KeyAlgorithm::EcdsaP256 => ecdsa_random(EcdsaCurve::NistP256)?,
            KeyAlgorithm::EcdsaP384 => ecdsa_random(EcdsaCurve::NistP384)?,
            KeyAlgorithm::EcdsaP521 => ecdsa_random(EcdsaCurve::NistP521)?,
        };

        tracing::debug!(%algorithm, "generated key pair");
        Self::from_keypair(keypair, "")
    }

    /// Wrap decoded key material together with its comment
    pub fn from_keypair(keypair: KeypairData, comment: &str) -> Result<Self> {
        let key = PrivateKey::new(keypair, comment)
            .map_err(|e| KeyCodecError::InvalidInput(format!("ключ: {}", e)))?;
        Self::from_private_key(key)
    }

    /// Wrap an already decrypted key
    pub fn from_private_key(key: PrivateKey) -> Result<Self> {
        if key.is_encrypted() {
            return Err(KeyCodecError::PassphraseRequired);
        }
        // Reject key families the report cannot describe
        key_type_of(key.public_key().key_data())?;
        Ok(Self { key })
    }

    pub fn keypair(&self) -> &KeypairData {
        self.key.key_data()
    }

    pub fn public_key_data(&self) -> &KeyData {
        self.key.public_key().key_data()
    }

    pub fn comment(&self) -> &str {
        self.key.comment()
    }

    pub fn set_comment(&mut self, comment: &str) {
        self.key.set_comment(comment);
    }

    pub fn algorithm(&self) -> Algorithm {
        self.key.algorithm()
    }

    pub fn key_type(&self) -> Result<KeyType> {
        key_type_of(self.public_key_data())
    }

    pub fn bit_length(&self) -> Result<usize> {
        bit_length_of(self.public_key_data())
    }

    /// Keypair blob as stored in the private section of a container
    pub fn private_key_blob(&self) -> Result<SecureBytes> {
        container::keypair_blob(self.keypair())
    }

    pub fn public_key_blob(&self) -> Result<Vec<u8>> {
        container::public_key_blob(self.public_key_data())
    }

    pub fn fingerprints(&self) -> Result<Fingerprints> {
        fingerprints_of(self.public_key_data())
    }

    /// Authorized-keys line carrying the key's own comment
    pub fn authorized_key(&self) -> Result<String> {
        authorized_key_line(self.public_key_data(), self.comment())
    }

    pub fn public_info(&self) -> Result<PublicKeyInfo> {
        PublicKeyInfo::describe(self.public_key_data(), self.comment())
    }

    /// Unencrypted `openssh-key-v1` text
    pub fn to_openssh(&self) -> Result<Zeroizing<String>> {
        self.key
            .to_openssh(LineEnding::LF)
            .map_err(|e| KeyCodecError::EncodingFailure(e.to_string()))
    }
}

impl std::fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyHandle")
            .field("algorithm", &self.key.algorithm().as_str())
            .field("comment", &self.key.comment())
            .finish_non_exhaustive()
    }
}

fn ecdsa_random(curve: EcdsaCurve) -> Result<KeypairData> {
    EcdsaKeypair::random(&mut OsRng, curve)
        .map(KeypairData::Ecdsa)
        .map_err(|e| KeyCodecError::RandomSourceFailure(e.to_string()))
}

/// Decrypt an OpenSSH key with a cipher the native codec does not handle
pub fn decrypt_openssh(text: &str, passphrase: Option<&[u8]>) -> Result<KeyHandle> {
    let key = PrivateKey::from_openssh(text).map_err(|err| match err {
        ssh_key::Error::AlgorithmUnknown | ssh_key::Error::AlgorithmUnsupported { .. } => {
            KeyCodecError::UnsupportedAlgorithm(err.to_string())
        }
        other => KeyCodecError::MalformedContainer(other.to_string()),
    })?;

    if !key.is_encrypted() {
        return KeyHandle::from_private_key(key);
    }

    let passphrase = passphrase.ok_or(KeyCodecError::PassphraseRequired)?;
    let cipher = key.cipher();
    let decrypted = key.decrypt(passphrase).map_err(|err| match err {
        ssh_key::Error::Crypto => KeyCodecError::DecryptionFailed,
        other => KeyCodecError::UnsupportedAlgorithm(format!("{}: {}", cipher.as_str(), other)),
    })?;

    KeyHandle::from_private_key(decrypted)
}

/// Parse an authorized-keys line into the key and its optional comment
///
/// Only `ssh-rsa`, `ssh-ed25519`, `ecdsa-sha2-nistp*` and `ssh-dss` keys are
/// accepted; the type token must match the type inside the blob.
pub fn parse_public_line(line: &str) -> Result<(KeyData, Option<String>)> {
    let mut tokens = line.split_whitespace();
    let (type_token, blob) = match (tokens.next(), tokens.next()) {
        (Some(t), Some(b)) => (t, b),
        _ => {
            return Err(KeyCodecError::InvalidInput(
                "ожидается строка вида «тип base64 [комментарий]»".into(),
            ))
        }
    };
    let comment = tokens.collect::<Vec<_>>().join(" ");

    let algorithm = Algorithm::new(type_token)
        .map_err(|_| KeyCodecError::UnsupportedAlgorithm(type_token.to_string()))?;

    let blob = STANDARD
        .decode(blob)
        .map_err(|e| KeyCodecError::InvalidInput(format!("base64: {}", e)))?;
    let key = KeyData::decode(&mut &blob[..])
        .map_err(|e| KeyCodecError::InvalidInput(format!("публичный ключ: {}", e)))?;

    if key.algorithm() != algorithm {
        return Err(KeyCodecError::InvalidInput(format!(
            "тип {} не совпадает с ключом {}",
            type_token,
            key.algorithm().as_str()
        )));
    }
    key_type_of(&key)?;

    Ok((key, (!comment.is_empty()).then_some(comment)))
}

pub fn key_type_of(key: &KeyData) -> Result<KeyType> {
    match key {
        KeyData::Rsa(_) => Ok(KeyType::Rsa),
        KeyData::Ed25519(_) => Ok(KeyType::Ed25519),
        KeyData::Ecdsa(_) => Ok(KeyType::Ecdsa),
        KeyData::Dsa(_) => Ok(KeyType::Dsa),
        other => Err(KeyCodecError::UnsupportedAlgorithm(
            other.algorithm().as_str().to_string(),
        )),
    }
}

/// Modulus size for RSA, prime size for DSA, curve size for ECDSA
pub fn bit_length_of(key: &KeyData) -> Result<usize> {
    match key {
        KeyData::Rsa(rsa) => Ok(mpint_bits(&rsa.n)),
        KeyData::Dsa(dsa) => Ok(mpint_bits(&dsa.p)),
        KeyData::Ed25519(_) => Ok(256),
        KeyData::Ecdsa(ecdsa) => Ok(match ecdsa.curve() {
            EcdsaCurve::NistP256 => 256,
            EcdsaCurve::NistP384 => 384,
            EcdsaCurve::NistP521 => 521,
        }),
        other => Err(KeyCodecError::UnsupportedAlgorithm(
            other.algorithm().as_str().to_string(),
        )),
    }
}

fn mpint_bits(value: &Mpint) -> usize {
    match value.as_positive_bytes() {
        Some([first, rest @ ..]) => rest.len() * 8 + (8 - first.leading_zeros() as usize),
        _ => 0,
    }
}

pub fn fingerprints_of(key: &KeyData) -> Result<Fingerprints> {
    let blob = container::public_key_blob(key)?;
    let digest = Md5::digest(&blob);
    let md5 = digest
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":");

    Ok(Fingerprints {
        sha256: key.fingerprint(HashAlg::Sha256).to_string(),
        md5: format!("MD5:{}", md5),
    })
}

/// `type base64 [comment]`, the comment omitted when empty
pub fn authorized_key_line(key: &KeyData, comment: &str) -> Result<String> {
    let blob = container::public_key_blob(key)?;
    let mut line = format!("{} {}", key.algorithm().as_str(), STANDARD.encode(blob));
    let comment = comment.trim();
    if !comment.is_empty() {
        line.push(' ');
        line.push_str(comment);
    }
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference key from the OpenSSH test vectors; comment user@example.com
    const ED25519_PUBLIC: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAILM+rvN+ot98qgEN796jTiQfZfG1KaT0PtFDJ/XFSqti user@example.com";

    // 1024-bit DSA key; generation is not supported so this is fixed
    const DSA_PUBLIC: &str = "ssh-dss AAAAB3NzaC1kc3MAAACBANbSy6JTsFAi14tAuL94ToRZrQbewZUzE7O4O08KPGLqe6gPa02zoyxXffQx46HQe5DU6CaZSerUzE6PioDYT95rFCA/RJRcTDkKfTAkxwYqOtZxQ0C+RkpNitlUWiLoGdrzGjxcV1cobPVAwpaEA17BPCQP3CdGHOHr8dO2OOYvAAAAFQDQe9bH4K3dEudqChBk3ifDMdp7uwAAAIAKChTP24432/oNNtucdACw0ODiNstbcCADnxa6OKb8njUmy2KUCjr4ESOinxoIkZS4lwBrI4cZWQz+5xNyCbpp/yAmSNbI8rkWZ0lNxhFX+D6rAZo9hPXR91yfKkjjShaC5lY3zjpdX1nSsgl5YERT7atxcyWX3I9uONsoxyq9GwAAAIEAr2lc1ev8xASFuP0mTiIKfmbu3DFM2gHPCACF0cBjIgZf/h+ArnnU1snQbv48KTyZRvg4XvuCK8DZ9VgMVPZRvs9yTSc3TR+ZguGuq9sVcNhzYHxdkSrA/DqlOSLpWcUSRLmKdXpHKPpvqi06d4sMcgdgR6w6ccKhU2Gm2C3AfZk= dsa@example.com";

    #[test]
    fn test_dsa_public_line() {
        let (key, comment) = parse_public_line(DSA_PUBLIC).unwrap();
        assert_eq!(comment.as_deref(), Some("dsa@example.com"));
        assert_eq!(key_type_of(&key).unwrap(), KeyType::Dsa);
        assert_eq!(bit_length_of(&key).unwrap(), 1024);

        let fingerprints = fingerprints_of(&key).unwrap();
        assert_eq!(
            fingerprints.sha256,
            "SHA256:akkFXwJ2h5fga2GSvwFZkwPfIsUyT56ADElkLcJU0j8"
        );
        assert_eq!(
            fingerprints.md5,
            "MD5:67:84:42:6d:41:bb:76:1e:ef:a0:20:cd:f1:30:52:34"
        );
        assert_eq!(authorized_key_line(&key, "dsa@example.com").unwrap(), DSA_PUBLIC);
    }

    #[test]
    fn test_generate_ed25519() {
        let handle = KeyHandle::generate(KeyAlgorithm::Ed25519, 0).unwrap();
        assert_eq!(handle.key_type().unwrap(), KeyType::Ed25519);
        assert_eq!(handle.bit_length().unwrap(), 256);
        assert!(handle.authorized_key().unwrap().starts_with("ssh-ed25519 AAAA"));
    }

    #[test]
    fn test_generate_ecdsa_bit_lengths() {
        for (algorithm, bits) in [
            (KeyAlgorithm::EcdsaP256, 256),
            (KeyAlgorithm::EcdsaP384, 384),
            (KeyAlgorithm::EcdsaP521, 521),
        ] {
            let handle = KeyHandle::generate(algorithm, 0).unwrap();
            assert_eq!(handle.key_type().unwrap(), KeyType::Ecdsa);
            assert_eq!(handle.bit_length().unwrap(), bits);
        }
    }

    #[test]
    fn test_generate_rsa_bounds() {
        let result = KeyHandle::generate(KeyAlgorithm::Rsa, 1024);
        assert!(matches!(result, Err(KeyCodecError::InvalidInput(_))));

        let result = KeyHandle::generate(KeyAlgorithm::Rsa, 32768);
        assert!(matches!(result, Err(KeyCodecError::InvalidInput(_))));
    }

    #[test]
    fn test_generate_rsa_2048() {
        let handle = KeyHandle::generate(KeyAlgorithm::Rsa, 2048).unwrap();
        assert_eq!(handle.key_type().unwrap(), KeyType::Rsa);
        assert_eq!(handle.bit_length().unwrap(), 2048);
        assert!(handle.authorized_key().unwrap().starts_with("ssh-rsa "));
    }

    #[test]
    fn test_parse_public_line() {
        let (key, comment) = parse_public_line(ED25519_PUBLIC).unwrap();
        assert_eq!(comment.as_deref(), Some("user@example.com"));
        assert_eq!(authorized_key_line(&key, "user@example.com").unwrap(), ED25519_PUBLIC);
        assert_eq!(bit_length_of(&key).unwrap(), 256);
    }

    #[test]
    fn test_parse_public_line_rejects_unknown_type() {
        let line = ED25519_PUBLIC.replacen("ssh-ed25519", "ssh-foo", 1);
        assert!(matches!(
            parse_public_line(&line),
            Err(KeyCodecError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_parse_public_line_type_mismatch() {
        let line = ED25519_PUBLIC.replacen("ssh-ed25519", "ssh-rsa", 1);
        assert!(matches!(
            parse_public_line(&line),
            Err(KeyCodecError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_parse_public_line_missing_blob() {
        assert!(matches!(
            parse_public_line("ssh-ed25519"),
            Err(KeyCodecError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_fingerprint_formats() {
        let (key, _) = parse_public_line(ED25519_PUBLIC).unwrap();
        let fingerprints = fingerprints_of(&key).unwrap();

        assert!(fingerprints.sha256.starts_with("SHA256:"));
        assert!(!fingerprints.sha256.ends_with('='));

        let md5 = fingerprints.md5.strip_prefix("MD5:").unwrap();
        let pairs: Vec<&str> = md5.split(':').collect();
        assert_eq!(pairs.len(), 16);
        assert!(pairs
            .iter()
            .all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())));
    }

    #[test]
    fn test_authorized_line_omits_empty_comment() {
        let (key, _) = parse_public_line(ED25519_PUBLIC).unwrap();
        let line = authorized_key_line(&key, "").unwrap();
        assert_eq!(line.split(' ').count(), 2);
    }

    #[test]
    fn test_set_comment() {
        let mut handle = KeyHandle::generate(KeyAlgorithm::Ed25519, 0).unwrap();
        handle.set_comment("deploy@ci");
        assert!(handle.authorized_key().unwrap().ends_with(" deploy@ci"));
    }
}
