//! PEM and PKCS#8 import and export
//!
//! RSA goes out as PKCS#1, ECDSA as SEC1 and Ed25519 as PKCS#8, since there
//! is no traditional PEM form for Ed25519. Passphrase-protected PEM or PKCS#8
//! output is not produced.

use ed25519_dalek::SigningKey;
use pkcs8::der::pem::PemLabel;
use pkcs8::{
    DecodePrivateKey, EncodePrivateKey, EncryptedPrivateKeyInfo, LineEnding, PrivateKeyInfo,
    SecretDocument,
};
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::RsaPrivateKey;
use secrecy::{ExposeSecret, SecretString};
use ssh_key::private::{EcdsaKeypair, Ed25519Keypair, KeypairData, RsaKeypair};
use ssh_key::PrivateKey;
use zeroize::Zeroizing;

use crate::error::{KeyCodecError, Result};
use crate::format::KeyFormat;

const PKCS1_LABEL: &str = "BEGIN RSA PRIVATE KEY";
const SEC1_LABEL: &str = "BEGIN EC PRIVATE KEY";
const DSA_LABEL: &str = "BEGIN DSA PRIVATE KEY";
const PKCS8_ENCRYPTED_LABEL: &str = "BEGIN ENCRYPTED PRIVATE KEY";
const LEGACY_ENCRYPTED_MARKER: &str = "Proc-Type: 4,ENCRYPTED";

/// Decode a PEM or PKCS#8 private key
pub fn import(format: KeyFormat, text: &str, passphrase: Option<&SecretString>) -> Result<PrivateKey> {
    match format {
        KeyFormat::Pkcs8 => import_pkcs8(text, passphrase),
        KeyFormat::Pem => import_pem(text, passphrase),
        KeyFormat::OpenSsh => Err(KeyCodecError::InvalidInput(
            "ключ OpenSSH не является PEM".into(),
        )),
    }
}

fn import_pkcs8(text: &str, passphrase: Option<&SecretString>) -> Result<PrivateKey> {
    let document = if text.contains(PKCS8_ENCRYPTED_LABEL) {
        let passphrase = passphrase.ok_or(KeyCodecError::PassphraseRequired)?;
        decrypt_pkcs8(text, passphrase)?
    } else {
        SecretDocument::from_pkcs8_pem(text)
            .map_err(|e| KeyCodecError::InvalidInput(format!("PKCS#8: {}", e)))?
    };

    into_private_key(keypair_from_pkcs8_der(document.as_bytes())?)
}

/// Decrypt a PBES2 `ENCRYPTED PRIVATE KEY` into its inner PKCS#8 document
///
/// Errors in the envelope are `InvalidInput`. Everything after the password
/// is applied is `DecryptionFailed`: a wrong password can pass the CBC
/// padding check and only fail in the DER parser.
fn decrypt_pkcs8(text: &str, passphrase: &SecretString) -> Result<SecretDocument> {
    let invalid = |e: pkcs8::der::Error| KeyCodecError::InvalidInput(format!("PKCS#8: {}", e));

    let (label, envelope) = SecretDocument::from_pem(text).map_err(invalid)?;
    EncryptedPrivateKeyInfo::validate_pem_label(label)
        .map_err(|e| KeyCodecError::InvalidInput(format!("PKCS#8: {}", e)))?;
    let info = EncryptedPrivateKeyInfo::try_from(envelope.as_bytes())
        .map_err(|e| KeyCodecError::InvalidInput(format!("PKCS#8: {}", e)))?;

    let document = info
        .decrypt(passphrase.expose_secret().as_bytes())
        .map_err(|_| KeyCodecError::DecryptionFailed)?;
    PrivateKeyInfo::try_from(document.as_bytes()).map_err(|_| KeyCodecError::DecryptionFailed)?;
    Ok(document)
}

/// Try each supported key family against a PKCS#8 document
fn keypair_from_pkcs8_der(der: &[u8]) -> Result<KeypairData> {
    if let Ok(signing_key) = SigningKey::from_pkcs8_der(der) {
        let seed = Zeroizing::new(signing_key.to_bytes());
        return Ok(KeypairData::Ed25519(Ed25519Keypair::from_seed(&seed)));
    }
    if let Ok(rsa) = RsaPrivateKey::from_pkcs8_der(der) {
        return rsa_keypair(rsa);
    }
    if let Ok(secret) = p256::SecretKey::from_pkcs8_der(der) {
        return Ok(ecdsa_p256(secret));
    }
    if let Ok(secret) = p384::SecretKey::from_pkcs8_der(der) {
        return Ok(ecdsa_p384(secret));
    }
    if let Ok(secret) = p521::SecretKey::from_pkcs8_der(der) {
        return Ok(ecdsa_p521(secret));
    }
    Err(KeyCodecError::UnsupportedAlgorithm(
        "алгоритм ключа PKCS#8 не поддерживается".into(),
    ))
}

fn import_pem(text: &str, passphrase: Option<&SecretString>) -> Result<PrivateKey> {
    if text.contains(LEGACY_ENCRYPTED_MARKER) {
        return Err(match passphrase {
            None => KeyCodecError::PassphraseRequired,
            Some(_) => KeyCodecError::UnsupportedAlgorithm(
                "зашифрованный PEM в формате OpenSSL не поддерживается".into(),
            ),
        });
    }

    let keypair = if text.contains(PKCS1_LABEL) {
        let rsa = RsaPrivateKey::from_pkcs1_pem(text)
            .map_err(|e| KeyCodecError::InvalidInput(format!("PKCS#1: {}", e)))?;
        rsa_keypair(rsa)?
    } else if text.contains(SEC1_LABEL) {
        ecdsa_from_sec1(text)?
    } else if text.contains(DSA_LABEL) {
        return Err(KeyCodecError::UnsupportedAlgorithm("DSA в формате PEM".into()));
    } else {
        return Err(KeyCodecError::InvalidInput(
            "не удалось распознать формат ключа".into(),
        ));
    };

    into_private_key(keypair)
}

fn into_private_key(keypair: KeypairData) -> Result<PrivateKey> {
    PrivateKey::new(keypair, "").map_err(|e| KeyCodecError::InvalidInput(e.to_string()))
}

fn ecdsa_from_sec1(text: &str) -> Result<KeypairData> {
    if let Ok(secret) = p256::SecretKey::from_sec1_pem(text) {
        return Ok(ecdsa_p256(secret));
    }
    if let Ok(secret) = p384::SecretKey::from_sec1_pem(text) {
        return Ok(ecdsa_p384(secret));
    }
    if let Ok(secret) = p521::SecretKey::from_sec1_pem(text) {
        return Ok(ecdsa_p521(secret));
    }
    Err(KeyCodecError::UnsupportedAlgorithm(
        "кривая EC не поддерживается".into(),
    ))
}

fn ecdsa_p256(secret: p256::SecretKey) -> KeypairData {
    let public = secret.public_key().into();
    KeypairData::Ecdsa(EcdsaKeypair::NistP256 {
        public,
        private: secret.into(),
    })
}

fn ecdsa_p384(secret: p384::SecretKey) -> KeypairData {
    let public = secret.public_key().into();
    KeypairData::Ecdsa(EcdsaKeypair::NistP384 {
        public,
        private: secret.into(),
    })
}

fn ecdsa_p521(secret: p521::SecretKey) -> KeypairData {
    let public = secret.public_key().into();
    KeypairData::Ecdsa(EcdsaKeypair::NistP521 {
        public,
        private: secret.into(),
    })
}

fn rsa_keypair(rsa: RsaPrivateKey) -> Result<KeypairData> {
    RsaKeypair::try_from(rsa)
        .map(KeypairData::Rsa)
        .map_err(|e| KeyCodecError::InvalidInput(format!("RSA: {}", e)))
}

/// Traditional PEM: PKCS#1 for RSA, SEC1 for ECDSA, PKCS#8 for Ed25519
pub fn export_pem(keypair: &KeypairData) -> Result<Zeroizing<String>> {
    match keypair {
        KeypairData::Rsa(rsa) => convert_rsa_keypair(rsa)?
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| KeyCodecError::EncodingFailure(e.to_string())),
        KeypairData::Ecdsa(ecdsa) => ecdsa_to_sec1(ecdsa),
        KeypairData::Ed25519(_) => export_pkcs8(keypair),
        _ => Err(unsupported_export(keypair)),
    }
}

/// Unencrypted PKCS#8
pub fn export_pkcs8(keypair: &KeypairData) -> Result<Zeroizing<String>> {
    let pem = match keypair {
        KeypairData::Rsa(rsa) => convert_rsa_keypair(rsa)?.to_pkcs8_pem(LineEnding::LF),
        KeypairData::Ed25519(ed25519) => {
            let signing_key: SigningKey = ed25519
                .try_into()
                .map_err(|e: ssh_key::Error| KeyCodecError::EncodingFailure(e.to_string()))?;
            signing_key.to_pkcs8_pem(LineEnding::LF)
        }
        KeypairData::Ecdsa(EcdsaKeypair::NistP256 { private, .. }) => {
            p256::SecretKey::from_slice(private.as_slice())
                .map_err(|e| KeyCodecError::EncodingFailure(e.to_string()))?
                .to_pkcs8_pem(LineEnding::LF)
        }
        KeypairData::Ecdsa(EcdsaKeypair::NistP384 { private, .. }) => {
            p384::SecretKey::from_slice(private.as_slice())
                .map_err(|e| KeyCodecError::EncodingFailure(e.to_string()))?
                .to_pkcs8_pem(LineEnding::LF)
        }
        KeypairData::Ecdsa(EcdsaKeypair::NistP521 { private, .. }) => {
            p521::SecretKey::from_slice(private.as_slice())
                .map_err(|e| KeyCodecError::EncodingFailure(e.to_string()))?
                .to_pkcs8_pem(LineEnding::LF)
        }
        _ => return Err(unsupported_export(keypair)),
    };
    pem.map_err(|e| KeyCodecError::EncodingFailure(e.to_string()))
}

fn ecdsa_to_sec1(keypair: &EcdsaKeypair) -> Result<Zeroizing<String>> {
    let pem = match keypair {
        EcdsaKeypair::NistP256 { private, .. } => p256::SecretKey::from_slice(private.as_slice())
            .map_err(|e| KeyCodecError::EncodingFailure(e.to_string()))?
            .to_sec1_pem(LineEnding::LF),
        EcdsaKeypair::NistP384 { private, .. } => p384::SecretKey::from_slice(private.as_slice())
            .map_err(|e| KeyCodecError::EncodingFailure(e.to_string()))?
            .to_sec1_pem(LineEnding::LF),
        EcdsaKeypair::NistP521 { private, .. } => p521::SecretKey::from_slice(private.as_slice())
            .map_err(|e| KeyCodecError::EncodingFailure(e.to_string()))?
            .to_sec1_pem(LineEnding::LF),
    };
    pem.map_err(|e| KeyCodecError::EncodingFailure(e.to_string()))
}

// Going through RsaPrivateKey::from_components recomputes the CRT values
// that RsaKeypair does not carry.
fn convert_rsa_keypair(keypair: &RsaKeypair) -> Result<RsaPrivateKey> {
    let component = |value: &ssh_key::Mpint| {
        rsa::BigUint::try_from(value).map_err(|e| KeyCodecError::EncodingFailure(e.to_string()))
    };
    RsaPrivateKey::from_components(
        component(&keypair.public.n)?,
        component(&keypair.public.e)?,
        component(&keypair.private.d)?,
        vec![component(&keypair.private.p)?, component(&keypair.private.q)?],
    )
    .map_err(|e| KeyCodecError::EncodingFailure(e.to_string()))
}

fn unsupported_export(keypair: &KeypairData) -> KeyCodecError {
    let name = keypair
        .algorithm()
        .map(|a| a.as_str().to_string())
        .unwrap_or_else(|_| "unknown".into());
    KeyCodecError::UnsupportedAlgorithm(format!("экспорт {} в PEM/PKCS#8", name))
}
