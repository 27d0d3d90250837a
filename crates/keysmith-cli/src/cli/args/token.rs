use keysmith_core::KeySelection;

/// Flags selecting a key, and the sizes used to generate it when absent.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct SelectOrGenerateArgs {
    /// Name of a configured key
    #[arg(long, short = 'k')]
    pub key: Option<String>,

    /// Token to use, overriding the key's configured token
    #[arg(long, short = 't')]
    pub token: Option<String>,

    /// Key label to use, overriding the configured label
    #[arg(long, short = 'l')]
    pub label: Option<String>,

    /// Generate an RSA key of this many bits if no matching key exists
    #[arg(long, value_name = "BITS", default_value_t = 0)]
    pub generate_rsa: u32,

    /// Generate an ECDSA key on a curve of this many bits if no matching key exists
    #[arg(long, value_name = "BITS", default_value_t = 0)]
    pub generate_ecdsa: u32,
}

impl From<SelectOrGenerateArgs> for KeySelection {
    fn from(args: SelectOrGenerateArgs) -> Self {
        KeySelection {
            key_name: args.key,
            token: args.token,
            label: args.label,
            rsa_bits: args.generate_rsa,
            ecdsa_bits: args.generate_ecdsa,
        }
    }
}

/// Flag naming a configured key.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct KeyArgs {
    /// Name of a configured key
    #[arg(long, short = 'k')]
    pub key: Option<String>,
}

impl KeyArgs {
    /// Key name, empty when not given.
    pub fn key_name(&self) -> &str {
        self.key.as_deref().unwrap_or_default()
    }
}
