//! Private key material held by the file token.

use std::fmt;
use std::io::Write;

use pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;

use crate::error::{TokenError, TokenResult};
use crate::token::KeyType;

/// Smallest and largest RSA modulus the file token generates.
pub const RSA_BITS_RANGE: std::ops::RangeInclusive<u32> = 1024..=8192;

pub(crate) enum KeyMaterial {
    Rsa(Box<RsaPrivateKey>),
    P256(p256::SecretKey),
    P384(p384::SecretKey),
    P521(p521::SecretKey),
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rsa(_) => "Rsa",
            Self::P256(_) => "P256",
            Self::P384(_) => "P384",
            Self::P521(_) => "P521",
        };
        f.debug_tuple(name).field(&"..").finish()
    }
}

impl KeyMaterial {
    /// Generate fresh key material.
    pub(crate) fn generate(token: &str, key_type: KeyType, bits: u32) -> TokenResult<Self> {
        match (key_type, bits) {
            (KeyType::Rsa, bits) if RSA_BITS_RANGE.contains(&bits) => {
                let key = RsaPrivateKey::new(&mut OsRng, bits as usize)
                    .map_err(|e| TokenError::backend(token, format!("RSA generation failed: {e}")))?;
                Ok(Self::Rsa(Box::new(key)))
            }
            (KeyType::Ecdsa, 256) => Ok(Self::P256(p256::SecretKey::random(&mut OsRng))),
            (KeyType::Ecdsa, 384) => Ok(Self::P384(p384::SecretKey::random(&mut OsRng))),
            (KeyType::Ecdsa, 521) => Ok(Self::P521(p521::SecretKey::random(&mut OsRng))),
            (key_type, bits) => Err(TokenError::UnsupportedKeySize { key_type, bits }),
        }
    }

    /// Parse a PKCS#8 PEM private key of any supported kind.
    pub(crate) fn from_pem(pem: &str) -> Option<Self> {
        if let Ok(key) = RsaPrivateKey::from_pkcs8_pem(pem) {
            return Some(Self::Rsa(Box::new(key)));
        }
        if let Ok(key) = p256::SecretKey::from_pkcs8_pem(pem) {
            return Some(Self::P256(key));
        }
        if let Ok(key) = p384::SecretKey::from_pkcs8_pem(pem) {
            return Some(Self::P384(key));
        }
        if let Ok(key) = p521::SecretKey::from_pkcs8_pem(pem) {
            return Some(Self::P521(key));
        }
        None
    }

    pub(crate) fn key_type(&self) -> KeyType {
        match self {
            Self::Rsa(_) => KeyType::Rsa,
            Self::P256(_) | Self::P384(_) | Self::P521(_) => KeyType::Ecdsa,
        }
    }

    /// Write the private key as PKCS#8 PEM.
    pub(crate) fn write_pkcs8_pem(&self, token: &str, out: &mut impl Write) -> TokenResult<()> {
        let pem = match self {
            Self::Rsa(key) => key.to_pkcs8_pem(LineEnding::LF),
            Self::P256(key) => key.to_pkcs8_pem(LineEnding::LF),
            Self::P384(key) => key.to_pkcs8_pem(LineEnding::LF),
            Self::P521(key) => key.to_pkcs8_pem(LineEnding::LF),
        }
        .map_err(|e| TokenError::backend(token, format!("failed to encode private key: {e}")))?;
        out.write_all(pem.as_bytes())
            .map_err(|e| TokenError::backend(token, format!("failed to write private key: {e}")))
    }

    /// Public key as SPKI DER.
    pub(crate) fn public_key_der(&self, token: &str) -> TokenResult<Vec<u8>> {
        let doc = match self {
            Self::Rsa(key) => key.to_public_key().to_public_key_der(),
            Self::P256(key) => key.public_key().to_public_key_der(),
            Self::P384(key) => key.public_key().to_public_key_der(),
            Self::P521(key) => key.public_key().to_public_key_der(),
        }
        .map_err(|e| TokenError::backend(token, format!("failed to encode public key: {e}")))?;
        Ok(doc.as_bytes().to_vec())
    }

    /// Public key as SPKI PEM.
    pub(crate) fn public_key_pem(&self, token: &str) -> TokenResult<String> {
        match self {
            Self::Rsa(key) => key.to_public_key().to_public_key_pem(LineEnding::LF),
            Self::P256(key) => key.public_key().to_public_key_pem(LineEnding::LF),
            Self::P384(key) => key.public_key().to_public_key_pem(LineEnding::LF),
            Self::P521(key) => key.public_key().to_public_key_pem(LineEnding::LF),
        }
        .map_err(|e| TokenError::backend(token, format!("failed to encode public key: {e}")))
    }
}
