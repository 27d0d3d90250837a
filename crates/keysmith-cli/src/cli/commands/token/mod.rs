//! `keysmith token` commands.
//!
//! Every command builds one [`Provisioner`] over the configured file; sessions
//! it opens are closed when it is dropped at the end of the command.

pub mod generate;
pub mod info;
pub mod pubkey;

use std::sync::Arc;

use clap::Subcommand;
use keysmith_core::{Backends, Config, ConfigStore, PromptMode, Provisioner, TokenRegistry};
use tracing::debug;

use crate::cli::args::GlobalArgs;

#[derive(Subcommand, Debug)]
pub enum TokenCmd {
    /// Use the selected key, generating it if the token does not hold it
    Generate(generate::GenerateArgs),

    /// Print the public key of a configured key
    Pubkey(pubkey::PubkeyArgs),

    /// Show where a configured key lives
    Info(info::InfoArgs),
}

pub fn cmd_token(cmd: TokenCmd, global: &GlobalArgs) -> anyhow::Result<i32> {
    let provisioner = provisioner(global);
    match cmd {
        TokenCmd::Generate(args) => generate::run(args, &provisioner),
        TokenCmd::Pubkey(args) => pubkey::run(args, &provisioner),
        TokenCmd::Info(args) => info::run(args, &provisioner),
    }
}

fn provisioner(global: &GlobalArgs) -> Provisioner {
    let path = global.config.clone().unwrap_or_else(Config::default_path);
    let mode = if global.batch {
        PromptMode::Unattended
    } else {
        PromptMode::Interactive
    };
    debug!(config = %path.display(), ?mode, "using configuration");

    let registry = TokenRegistry::new(Backends::builtin(), mode.prompt());
    Provisioner::new(Arc::new(ConfigStore::from_path(path)), registry)
}
