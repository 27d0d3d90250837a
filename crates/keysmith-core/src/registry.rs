//! Registry of open token sessions.
//!
//! A token name is opened at most once per registry. Every caller that asks for
//! the same name gets the same [`SharedToken`], so keys generated through one
//! handle are visible through all of them. The registry closes its sessions on
//! [`close_all`](TokenRegistry::close_all) or when dropped.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::backend::Backends;
use crate::config::ConfigStore;
use crate::error::TokenResult;
use crate::prompt::PasswordGetter;
use crate::token::SharedToken;

/// Token name -> open session.
pub struct TokenRegistry {
    backends: Backends,
    prompt: Option<Arc<dyn PasswordGetter>>,
    tokens: Mutex<HashMap<String, SharedToken>>,
}

impl fmt::Debug for TokenRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut open: Vec<String> = self.lock().keys().cloned().collect();
        open.sort();
        f.debug_struct("TokenRegistry")
            .field("backends", &self.backends)
            .field("interactive", &self.prompt.is_some())
            .field("open", &open)
            .finish()
    }
}

impl TokenRegistry {
    /// Create an empty registry. `prompt` is handed to backends that need a
    /// credential; `None` means unattended.
    pub fn new(backends: Backends, prompt: Option<Arc<dyn PasswordGetter>>) -> Self {
        Self {
            backends,
            prompt,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SharedToken>> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open `token_name`, or return the session opened earlier.
    ///
    /// Nothing is cached when resolution or the backend open fails.
    pub fn open(&self, config: &Arc<ConfigStore>, token_name: &str) -> TokenResult<SharedToken> {
        // Held across the backend open so concurrent callers cannot open twice.
        let mut tokens = self.lock();
        if let Some(token) = tokens.get(token_name) {
            debug!(token = token_name, "reusing open token");
            return Ok(Arc::clone(token));
        }

        config.init()?;
        let token_config = config.get_token(token_name)?;
        let backend = self.backends.select(&token_config)?;

        debug!(
            token = token_name,
            token_type = token_config.effective_type(),
            "opening token"
        );
        let token = backend.open(config, token_name, self.prompt.as_deref())?;
        tokens.insert(token_name.to_string(), Arc::clone(&token));
        Ok(token)
    }

    /// Whether a session for `token_name` is cached.
    pub fn is_open(&self, token_name: &str) -> bool {
        self.lock().contains_key(token_name)
    }

    /// Number of cached sessions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop the cached session for `token_name` without closing it.
    pub fn evict(&self, token_name: &str) -> Option<SharedToken> {
        self.lock().remove(token_name)
    }

    /// Close and forget every session. Returns the first close error; later
    /// ones are logged.
    pub fn close_all(&self) -> TokenResult<()> {
        let drained: Vec<_> = self.lock().drain().collect();
        close_tokens(drained)
    }
}

fn close_tokens(tokens: Vec<(String, SharedToken)>) -> TokenResult<()> {
    let mut first_error = None;
    for (name, token) in tokens {
        if let Err(e) = token.close() {
            warn!(token = %name, error = %e, "failed to close token");
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

impl Drop for TokenRegistry {
    fn drop(&mut self) {
        let tokens = self
            .tokens
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if tokens.is_empty() {
            return;
        }
        let drained: Vec<_> = tokens.drain().collect();
        let _ = close_tokens(drained);
    }
}
