//! Token sessions and select-or-generate key provisioning.
//!
//! This crate resolves named key and token configuration to token backends,
//! keeps one open session per token name, and either returns an existing key
//! or generates one on demand:
//!
//! - YAML configuration loaded lazily ([`ConfigStore`])
//! - backend dispatch by token type tag ([`Backends`])
//! - cached token sessions ([`TokenRegistry`])
//! - select-or-generate and lookup by key name ([`Provisioner`])
//! - a software file token ([`filetoken`])
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use keysmith_core::{
//!     format_key_id, Backends, ConfigStore, KeySelection, PromptMode, Provisioner, TokenRegistry,
//! };
//!
//! # fn example() -> keysmith_core::TokenResult<()> {
//! let config = Arc::new(ConfigStore::from_path("/etc/keysmith/keysmith.yaml"));
//! let registry = TokenRegistry::new(Backends::builtin(), PromptMode::Interactive.prompt());
//! let provisioner = Provisioner::new(config, registry);
//!
//! let selection = KeySelection::key("release").generate_ecdsa(256);
//! let provisioned = provisioner.select_or_generate(&selection)?;
//! println!("{}", format_key_id(provisioned.key.id()));
//! # Ok(())
//! # }
//! ```
//!
//! # Token types
//!
//! | `type` | Backend |
//! |--------|---------|
//! | `file` | [`filetoken::FileBackend`] |
//! | `pkcs11` or empty | registered by the embedding program via [`Backends::register`] |

pub mod backend;
pub mod config;
pub mod error;
pub mod filetoken;
pub mod prompt;
pub mod provision;
pub mod registry;
pub mod resolve;
pub mod token;

// Re-export main types
pub use backend::{Backends, TokenBackend, FILE_TOKEN_TYPE, PKCS11_TOKEN_TYPE};
pub use config::{Config, ConfigStore, KeyConfig, TokenConfig};
pub use error::{TokenError, TokenResult};
pub use prompt::{InteractivePrompt, PasswordGetter, PromptMode};
pub use provision::{ProvisionOutcome, Provisioned, Provisioner};
pub use registry::TokenRegistry;
pub use resolve::KeySelection;
pub use token::{format_key_id, Key, KeyType, SharedToken, Token};
