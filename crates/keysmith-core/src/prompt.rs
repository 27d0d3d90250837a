//! Credential prompting for token login.
//!
//! The prompt strategy is picked by the caller before any token is opened:
//!
//! - [`PromptMode::Interactive`]: ask on the terminal ([`InteractivePrompt`])
//! - [`PromptMode::Unattended`]: never ask; tokens that need a PIN must have one
//!   configured

use std::sync::Arc;

use tracing::warn;

use crate::error::{TokenError, TokenResult};

/// Number of times a user may re-enter a rejected PIN.
pub const MAX_LOGIN_ATTEMPTS: u32 = 3;

/// Source of secrets for token login.
pub trait PasswordGetter: Send + Sync {
    /// Ask for a secret. `None` means the user gave up (empty input).
    fn get_passwd(&self, prompt: &str) -> TokenResult<Option<String>>;
}

/// Terminal prompt that hides input.
#[derive(Debug, Default, Clone, Copy)]
pub struct InteractivePrompt;

impl PasswordGetter for InteractivePrompt {
    fn get_passwd(&self, prompt: &str) -> TokenResult<Option<String>> {
        let value = dialoguer::Password::new()
            .with_prompt(prompt.trim_end_matches(|c| c == ':' || c == ' '))
            .allow_empty_password(true)
            .interact()
            .map_err(|e| TokenError::Prompt {
                message: e.to_string(),
            })?;
        if value.is_empty() {
            Ok(None)
        } else {
            Ok(Some(value))
        }
    }
}

/// Execution mode deciding whether credentials may be prompted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptMode {
    /// A user is attached to the terminal.
    #[default]
    Interactive,

    /// Running as a server or in batch mode.
    Unattended,
}

impl PromptMode {
    /// Build the prompt for this mode.
    pub fn prompt(self) -> Option<Arc<dyn PasswordGetter>> {
        match self {
            Self::Interactive => Some(Arc::new(InteractivePrompt)),
            Self::Unattended => None,
        }
    }
}

/// Log in to `token_name`.
///
/// A configured PIN is tried exactly once. Without one the prompt is asked up to
/// [`MAX_LOGIN_ATTEMPTS`] times; empty input cancels. `check` returns `Ok(false)`
/// for a rejected PIN and `Err` for any other failure, which aborts the login.
pub fn login<F>(
    token_name: &str,
    configured_pin: Option<&str>,
    prompt: Option<&dyn PasswordGetter>,
    mut check: F,
) -> TokenResult<()>
where
    F: FnMut(&str) -> TokenResult<bool>,
{
    if let Some(pin) = configured_pin {
        return if check(pin)? {
            Ok(())
        } else {
            Err(TokenError::PinIncorrect {
                token: token_name.to_string(),
            })
        };
    }

    let prompt = prompt.ok_or_else(|| TokenError::PinRequired {
        token: token_name.to_string(),
    })?;
    let text = format!("PIN for token {token_name}: ");

    for attempt in 1..=MAX_LOGIN_ATTEMPTS {
        let Some(pin) = prompt.get_passwd(&text)? else {
            return Err(TokenError::LoginCancelled {
                token: token_name.to_string(),
            });
        };
        if check(&pin)? {
            return Ok(());
        }
        warn!(token = token_name, attempt, "incorrect PIN");
    }

    Err(TokenError::PinIncorrect {
        token: token_name.to_string(),
    })
}
