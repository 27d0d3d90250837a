//! Key configuration resolution from command-line selections.

use chrono::Utc;

use crate::config::{ConfigStore, KeyConfig};
use crate::error::{TokenError, TokenResult};
use crate::token::KeyType;

/// What the caller asked for: a configured key, or a token and label for a
/// new one, plus generation sizes used when the key does not exist yet.
///
/// Empty strings count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySelection {
    /// Name of a configured key.
    pub key_name: Option<String>,

    /// Token override.
    pub token: Option<String>,

    /// Label override.
    pub label: Option<String>,

    /// RSA modulus size to generate, 0 for none.
    pub rsa_bits: u32,

    /// ECDSA curve size to generate, 0 for none.
    pub ecdsa_bits: u32,
}

impl KeySelection {
    /// Select a configured key.
    pub fn key(name: impl Into<String>) -> Self {
        Self {
            key_name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Select a key by label in a token, without a configured key name.
    pub fn token_label(token: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            label: Some(label.into()),
            ..Default::default()
        }
    }

    /// Override the token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Override the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Generate an RSA key of `bits` if needed.
    pub fn generate_rsa(mut self, bits: u32) -> Self {
        self.rsa_bits = bits;
        self
    }

    /// Generate an ECDSA key of `bits` if needed.
    pub fn generate_ecdsa(mut self, bits: u32) -> Self {
        self.ecdsa_bits = bits;
        self
    }

    /// Algorithm and size to generate with. RSA wins when both are set.
    pub fn generation_params(&self) -> Option<(KeyType, u32)> {
        if self.rsa_bits != 0 {
            Some((KeyType::Rsa, self.rsa_bits))
        } else if self.ecdsa_bits != 0 {
            Some((KeyType::Ecdsa, self.ecdsa_bits))
        } else {
            None
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Name for a key created without a configured name.
pub fn synthetic_key_name() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("new-key-{nanos}")
}

/// Resolve `selection` into a key record and store it back into `config`.
///
/// - a key name must exist in the configuration
/// - without a key name, both token and label are required and a new record is
///   created under a synthetic name
/// - a token override must name a configured token
/// - a label override clears any stored key id
pub fn resolve_key_config(config: &ConfigStore, selection: &KeySelection) -> TokenResult<KeyConfig> {
    config.init()?;

    let token = non_empty(&selection.token);
    let label = non_empty(&selection.label);

    let mut key = match non_empty(&selection.key_name) {
        Some(name) => config.get_key(name)?,
        None => {
            if token.is_none() || label.is_none() {
                return Err(TokenError::MissingParameter {
                    message: "either --key, or --token and --label, must be set".into(),
                });
            }
            config.new_key(&synthetic_key_name())?
        }
    };

    if let Some(token) = token {
        let token_config = config.get_token(token)?;
        key.set_token(&token_config);
    }
    if let Some(label) = label {
        key.set_label(label);
    }

    config.put_key(key.clone())?;
    Ok(key)
}
