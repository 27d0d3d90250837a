//! Select-or-generate key provisioning.
//!
//! [`Provisioner::select_or_generate`] reuses a key when the token already holds
//! it and generates one otherwise, so running the same provisioning command
//! twice generates once and reuses afterwards.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{ConfigStore, KeyConfig};
use crate::error::{TokenError, TokenResult};
use crate::registry::TokenRegistry;
use crate::resolve::{resolve_key_config, KeySelection};
use crate::token::{Key, SharedToken};

/// Whether the returned key was found or created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Existing,
    Generated,
}

impl fmt::Display for ProvisionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Existing => write!(f, "existing"),
            Self::Generated => write!(f, "generated"),
        }
    }
}

/// Result of [`Provisioner::select_or_generate`].
#[derive(Debug)]
pub struct Provisioned {
    pub key: Box<dyn Key>,
    pub key_config: KeyConfig,
    pub outcome: ProvisionOutcome,
}

/// Configuration plus the session registry for one command execution.
#[derive(Debug)]
pub struct Provisioner {
    config: Arc<ConfigStore>,
    registry: TokenRegistry,
}

impl Provisioner {
    pub fn new(config: Arc<ConfigStore>, registry: TokenRegistry) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    pub fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    /// Resolve a selection into a key record. See [`resolve_key_config`].
    pub fn resolve_key_config(&self, selection: &KeySelection) -> TokenResult<KeyConfig> {
        resolve_key_config(&self.config, selection)
    }

    /// Open a token by name through the registry.
    pub fn open_token(&self, token_name: &str) -> TokenResult<SharedToken> {
        self.registry.open(&self.config, token_name)
    }

    fn open_owning_token(&self, key: &KeyConfig) -> TokenResult<SharedToken> {
        if key.token.is_empty() {
            return Err(TokenError::Config {
                message: format!("key \"{}\" has no token configured", key.name),
            });
        }
        self.open_token(&key.token)
    }

    /// Return the selected key, generating it when the token does not hold it.
    ///
    /// Only [`TokenError::KeyNotFound`] leads to generation; every other lookup
    /// failure is returned as is.
    pub fn select_or_generate(&self, selection: &KeySelection) -> TokenResult<Provisioned> {
        let key_config = self.resolve_key_config(selection)?;
        let token = self.open_owning_token(&key_config)?;

        match token.get_key(&key_config.name) {
            Ok(key) => {
                info!(
                    key = %key_config.name,
                    token = %key_config.token,
                    "using existing key in token"
                );
                return Ok(Provisioned {
                    key,
                    key_config,
                    outcome: ProvisionOutcome::Existing,
                });
            }
            Err(e) if e.is_key_not_found() => {}
            Err(e) => return Err(e),
        }

        let (key_type, bits) = selection
            .generation_params()
            .ok_or(TokenError::NoGenerationParameters)?;
        info!(
            key = %key_config.name,
            token = %key_config.token,
            %key_type,
            bits,
            "generating a new key in token"
        );
        let key = token.generate(&key_config.name, key_type, bits)?;

        Ok(Provisioned {
            key,
            key_config,
            outcome: ProvisionOutcome::Generated,
        })
    }

    /// Open the token that owns the configured key `key_name`.
    pub fn open_token_by_key(&self, key_name: &str) -> TokenResult<SharedToken> {
        if key_name.is_empty() {
            return Err(TokenError::MissingParameter {
                message: "--key is a required parameter".into(),
            });
        }
        self.config.init()?;
        let key_config = self.config.get_key(key_name)?;
        self.open_owning_token(&key_config)
    }

    /// Fetch the configured key `key_name`.
    ///
    /// When the token cannot produce the key its session is evicted from the
    /// registry and closed before the error is returned.
    pub fn open_key(&self, key_name: &str) -> TokenResult<Box<dyn Key>> {
        let token = self.open_token_by_key(key_name)?;
        match token.get_key(key_name) {
            Ok(key) => Ok(key),
            Err(e) => {
                self.registry.evict(token.name());
                if let Err(close_err) = token.close() {
                    warn!(token = token.name(), error = %close_err, "failed to close token");
                }
                Err(e)
            }
        }
    }
}
