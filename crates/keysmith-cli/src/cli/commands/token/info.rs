//! `keysmith token info` - show the token, label, type and id of a key.

use clap::Args;
use keysmith_core::{format_key_id, Provisioner};

use crate::cli::args::KeyArgs;
use crate::exit_codes::SUCCESS;

#[derive(Args, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub key: KeyArgs,
}

pub fn run(args: InfoArgs, provisioner: &Provisioner) -> anyhow::Result<i32> {
    let key_name = args.key.key_name();
    let key = provisioner.open_key(key_name)?;
    let key_config = provisioner.config().get_key(key_name)?;

    println!("token:  {}", key_config.token);
    println!("label:  {}", key.label());
    println!("type:   {}", key.key_type());
    println!("key_id: {}", format_key_id(key.id()));

    Ok(SUCCESS)
}
