//! Token and key capabilities shared by every backend.

use std::fmt;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::error::TokenResult;

/// Length of key identifiers derived from public keys.
pub const KEY_ID_LEN: usize = 20;

/// Key algorithm family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    Rsa,
    Ecdsa,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rsa => write!(f, "RSA"),
            Self::Ecdsa => write!(f, "ECDSA"),
        }
    }
}

/// Handle to key material inside a token.
///
/// A key is only usable while the token that produced it is open.
pub trait Key: Send + Sync + fmt::Debug {
    /// Raw key identifier.
    fn id(&self) -> &[u8];

    /// Label attached to the key material.
    fn label(&self) -> &str;

    fn key_type(&self) -> KeyType;

    /// Public half as SPKI PEM.
    fn public_key_pem(&self) -> TokenResult<String>;
}

/// Open session over a token backend.
pub trait Token: Send + Sync + fmt::Debug {
    /// Configured token name.
    fn name(&self) -> &str;

    /// Fetch a key by its configured key name.
    ///
    /// Returns [`TokenError::KeyNotFound`](crate::TokenError::KeyNotFound) when the
    /// token holds no matching key; any other error is a backend failure.
    fn get_key(&self, key_name: &str) -> TokenResult<Box<dyn Key>>;

    /// Generate a new key for the configured key name.
    fn generate(&self, key_name: &str, key_type: KeyType, bits: u32) -> TokenResult<Box<dyn Key>>;

    /// Release the session.
    fn close(&self) -> TokenResult<()>;
}

/// Shared token handle as held by the registry.
pub type SharedToken = Arc<dyn Token>;

/// Render a raw key identifier as colon-separated hex, e.g. `01:ab:3f`.
pub fn format_key_id(key_id: &[u8]) -> String {
    key_id
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

/// Parse a key identifier written as hex, with or without colons.
pub fn parse_key_id(text: &str) -> Option<Vec<u8>> {
    let compact: String = text.chars().filter(|c| *c != ':').collect();
    hex::decode(compact).ok()
}

/// Derive a key identifier from SPKI DER bytes.
pub fn compute_key_id(spki_der: &[u8]) -> Vec<u8> {
    let hash = Sha256::digest(spki_der);
    hash.as_slice()[..KEY_ID_LEN].to_vec()
}
