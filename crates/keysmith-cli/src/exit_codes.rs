//! Process exit codes for the keysmith CLI.
//!
//! Token and provisioning failures exit with [`TokenError::exit_code`]:
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | success |
//! | 1 | failure outside the token layer (e.g. writing an output file) |
//! | 2 | configuration or missing parameter |
//! | 3 | unknown or unavailable token type |
//! | 4 | key missing, not generatable, or already present |
//! | 5 | PIN required, rejected, or login cancelled |
//! | 6 | backend operation failed |

use keysmith_core::TokenError;

pub const SUCCESS: i32 = 0;
pub const COMMAND_FAILED: i32 = 1;

/// Exit code for an error returned from a command.
pub fn for_error(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<TokenError>())
        .map_or(COMMAND_FAILED, TokenError::exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_token_error_code_survives_context() {
        let err: anyhow::Result<()> = Err(TokenError::NoGenerationParameters).context("token generate");
        assert_eq!(for_error(&err.unwrap_err()), 4);
    }

    #[test]
    fn test_other_errors_are_command_failures() {
        let err = anyhow::anyhow!("disk full");
        assert_eq!(for_error(&err), COMMAND_FAILED);
    }
}
