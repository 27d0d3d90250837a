//! Error types for token sessions and key provisioning.

use std::path::PathBuf;

use crate::token::KeyType;

/// Token and provisioning errors.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Key name is not present in the configuration.
    #[error("key \"{name}\" not found in configuration")]
    UnknownKey { name: String },

    /// Token name is not present in the configuration.
    #[error("token \"{name}\" not found in configuration")]
    UnknownToken { name: String },

    /// A required parameter, or parameter combination, is missing.
    #[error("{message}")]
    MissingParameter { message: String },

    /// Configuration file could not be read or parsed.
    #[error("failed to load configuration from {}: {message}", path.display())]
    ConfigLoad { path: PathBuf, message: String },

    /// Configuration is present but invalid.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Declared token type is not recognized.
    #[error("unknown token type {token_type}")]
    UnknownTokenType { token_type: String },

    /// Token type is recognized but no backend is registered for it.
    #[error("no backend for token type {token_type} is available in this build")]
    BackendUnavailable { token_type: String },

    /// Key does not exist in the token.
    #[error("key \"{key}\" not found in token \"{token}\"")]
    KeyNotFound { token: String, key: String },

    /// Key is absent and no generation parameters were given.
    #[error("no matching key exists, specify --generate-rsa or --generate-ecdsa to generate one")]
    NoGenerationParameters,

    /// Backend cannot generate a key of this size.
    #[error("unsupported {key_type} key size: {bits}")]
    UnsupportedKeySize { key_type: KeyType, bits: u32 },

    /// Generation would overwrite an existing key.
    #[error("key \"{key}\" already exists in token \"{token}\"")]
    KeyExists { token: String, key: String },

    /// Token session was already closed.
    #[error("token \"{token}\" is closed")]
    TokenClosed { token: String },

    /// Token needs a PIN and no prompt is available.
    #[error("token \"{token}\" requires a PIN but none was configured and prompting is disabled")]
    PinRequired { token: String },

    /// PIN was rejected.
    #[error("incorrect PIN for token \"{token}\"")]
    PinIncorrect { token: String },

    /// User aborted the login prompt.
    #[error("login to token \"{token}\" cancelled")]
    LoginCancelled { token: String },

    /// Prompt could not read from the terminal.
    #[error("password prompt failed: {message}")]
    Prompt { message: String },

    /// Opaque backend failure.
    #[error("token \"{token}\": {message}")]
    Backend { token: String, message: String },

    /// I/O error.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TokenError {
    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            // Configuration / parameter issues
            Self::UnknownKey { .. }
            | Self::UnknownToken { .. }
            | Self::MissingParameter { .. }
            | Self::ConfigLoad { .. }
            | Self::Config { .. } => 2,

            // Backend selection
            Self::UnknownTokenType { .. } | Self::BackendUnavailable { .. } => 3,

            // Key lookup / generation
            Self::KeyNotFound { .. }
            | Self::NoGenerationParameters
            | Self::UnsupportedKeySize { .. }
            | Self::KeyExists { .. } => 4,

            // Credentials
            Self::PinRequired { .. }
            | Self::PinIncorrect { .. }
            | Self::LoginCancelled { .. }
            | Self::Prompt { .. } => 5,

            // Backend operation
            Self::TokenClosed { .. } | Self::Backend { .. } | Self::Io { .. } => 6,
        }
    }

    /// Whether this is the "key absent" condition that allows generation.
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn backend(token: &str, message: impl std::fmt::Display) -> Self {
        Self::Backend {
            token: token.to_string(),
            message: message.to_string(),
        }
    }
}

/// Result type for token operations.
pub type TokenResult<T> = Result<T, TokenError>;
