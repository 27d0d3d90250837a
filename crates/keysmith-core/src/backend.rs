//! Backend dispatch by declared token type.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::{ConfigStore, TokenConfig};
use crate::error::{TokenError, TokenResult};
use crate::filetoken::FileBackend;
use crate::prompt::PasswordGetter;
use crate::token::SharedToken;

/// Type tag of the hardware-module (PKCS#11) backend.
pub const PKCS11_TOKEN_TYPE: &str = "pkcs11";

/// Type tag of the software file backend.
pub const FILE_TOKEN_TYPE: &str = "file";

/// Tags this crate understands, whether or not a backend is registered.
pub const KNOWN_TOKEN_TYPES: &[&str] = &[PKCS11_TOKEN_TYPE, FILE_TOKEN_TYPE];

/// Opens sessions on one kind of token.
pub trait TokenBackend: Send + Sync {
    /// Open `token_name`. Backends receive the whole store so they can resolve
    /// key records by name later.
    fn open(
        &self,
        config: &Arc<ConfigStore>,
        token_name: &str,
        prompt: Option<&dyn PasswordGetter>,
    ) -> TokenResult<SharedToken>;
}

/// Type tag to backend table.
#[derive(Clone, Default)]
pub struct Backends {
    backends: HashMap<String, Arc<dyn TokenBackend>>,
}

impl fmt::Debug for Backends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.backends.keys().collect();
        tags.sort();
        f.debug_struct("Backends").field("types", &tags).finish()
    }
}

impl Backends {
    /// Table with no backends.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Backends shipped with this crate.
    pub fn builtin() -> Self {
        Self::empty().with(FILE_TOKEN_TYPE, FileBackend)
    }

    /// Register a backend for `token_type`, replacing any previous one.
    pub fn register(&mut self, token_type: impl Into<String>, backend: impl TokenBackend + 'static) {
        self.backends.insert(token_type.into(), Arc::new(backend));
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, token_type: impl Into<String>, backend: impl TokenBackend + 'static) -> Self {
        self.register(token_type, backend);
        self
    }

    /// Pick the backend for a token's declared type.
    pub fn select(&self, token: &TokenConfig) -> TokenResult<&Arc<dyn TokenBackend>> {
        let token_type = token.effective_type();
        if let Some(backend) = self.backends.get(token_type) {
            return Ok(backend);
        }
        if KNOWN_TOKEN_TYPES.contains(&token_type) {
            Err(TokenError::BackendUnavailable {
                token_type: token_type.to_string(),
            })
        } else {
            Err(TokenError::UnknownTokenType {
                token_type: token.token_type.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unreachable;

    impl TokenBackend for Unreachable {
        fn open(
            &self,
            _config: &Arc<ConfigStore>,
            token_name: &str,
            _prompt: Option<&dyn PasswordGetter>,
        ) -> TokenResult<SharedToken> {
            Err(TokenError::backend(token_name, "not implemented"))
        }
    }

    fn token(token_type: &str) -> TokenConfig {
        TokenConfig {
            name: "t".into(),
            token_type: token_type.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_type_selects_pkcs11() {
        let backends = Backends::empty().with(PKCS11_TOKEN_TYPE, Unreachable);
        assert!(backends.select(&token("")).is_ok());
        assert!(backends.select(&token("pkcs11")).is_ok());
    }

    #[test]
    fn test_known_but_unregistered_type() {
        let err = Backends::builtin()
            .select(&token(""))
            .err()
            .expect("pkcs11 should be unavailable");
        assert!(matches!(err, TokenError::BackendUnavailable { token_type } if token_type == "pkcs11"));
    }

    #[test]
    fn test_unknown_type_is_named() {
        let err = Backends::builtin()
            .select(&token("quantum"))
            .err()
            .expect("quantum should be rejected");
        assert!(err.to_string().contains("quantum"));
        assert!(matches!(err, TokenError::UnknownTokenType { .. }));
    }

    #[test]
    fn test_builtin_has_file_backend() {
        assert!(Backends::builtin().select(&token("file")).is_ok());
    }
}
