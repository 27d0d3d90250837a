use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

pub mod token;
pub use token::*;

#[derive(Parser, Debug)]
#[command(
    name = "keysmith",
    version,
    about = "Select or generate signing keys held in security tokens"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Token and key configuration file [default: <config dir>/keysmith/keysmith.yaml]
    #[arg(long, short = 'c', global = true, env = "KEYSMITH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Never prompt for PINs; tokens that need one must have it configured
    #[arg(
        long,
        global = true,
        env = "KEYSMITH_BATCH",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub batch: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Key provisioning in security tokens
    Token(TokenArgs),
    Version,
}

#[derive(Parser, Debug)]
pub struct TokenArgs {
    #[command(subcommand)]
    pub cmd: super::commands::token::TokenCmd,
}
