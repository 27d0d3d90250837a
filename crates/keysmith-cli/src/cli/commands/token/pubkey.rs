//! `keysmith token pubkey` - print or save the public half of a key.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use keysmith_core::Provisioner;

use crate::cli::args::KeyArgs;
use crate::exit_codes::SUCCESS;

#[derive(Args, Debug)]
pub struct PubkeyArgs {
    #[command(flatten)]
    pub key: KeyArgs,

    /// Write the PEM to this file instead of stdout
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

pub fn run(args: PubkeyArgs, provisioner: &Provisioner) -> anyhow::Result<i32> {
    let key = provisioner.open_key(args.key.key_name())?;
    let pem = key.public_key_pem()?;

    match args.out {
        Some(path) => fs::write(&path, &pem)
            .with_context(|| format!("failed to write public key: {}", path.display()))?,
        None => print!("{pem}"),
    }

    Ok(SUCCESS)
}
