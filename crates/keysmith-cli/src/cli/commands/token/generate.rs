//! `keysmith token generate` - select an existing key or generate one.

use clap::Args;
use keysmith_core::{format_key_id, KeySelection, Provisioner};

use crate::cli::args::SelectOrGenerateArgs;
use crate::exit_codes::SUCCESS;

#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub select: SelectOrGenerateArgs,
}

pub fn run(args: GenerateArgs, provisioner: &Provisioner) -> anyhow::Result<i32> {
    let selection = KeySelection::from(args.select);
    let provisioned = provisioner.select_or_generate(&selection)?;
    let key = &provisioned.key;

    println!("token:  {}", provisioned.key_config.token);
    println!("key:    {}", provisioned.key_config.name);
    println!("label:  {}", key.label());
    println!("type:   {}", key.key_type());
    println!("key_id: {}", format_key_id(key.id()));
    println!("status: {}", provisioned.outcome);

    Ok(SUCCESS)
}
