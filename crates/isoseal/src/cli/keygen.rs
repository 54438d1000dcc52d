use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use isoseal_sign::{KeyringBackend, fingerprint};

use super::Verdict;

#[derive(Args, Clone, Debug)]
pub struct KeygenArg {
    /// Name the key is stored and looked up under.
    pub identity: String,

    #[arg(long, value_name = "DIR", help = "Keyring directory (created if missing)")]
    pub keyring: PathBuf,
}

pub fn run(arg: KeygenArg) -> Result<Verdict> {
    let seed: [u8; 32] = rand::random();
    let key = KeyringBackend::generate_key(&arg.keyring, &arg.identity, seed)
        .with_context(|| format!("Failed to create key for '{}'", arg.identity))?;

    println!("identity:    {}", arg.identity);
    println!("fingerprint: {}", fingerprint(&key));
    println!("public key:  {}", arg.keyring.join(format!("{}.pub", arg.identity)).display());
    Ok(Verdict::Success)
}
