use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::{digest, keygen, sign, verify};

#[derive(Clone, Debug, Parser)]
#[command(name = "isoseal", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct App {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of the discovered one.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    #[command(alias = "s", name = "sign", about = "Hash, sign and bundle an image")]
    Sign(sign::SignArg),
    #[command(alias = "v", name = "verify", about = "Check an image against its detached signature")]
    Verify(verify::VerifyArg),
    #[command(alias = "d", name = "digest", about = "Print checksums without signing")]
    Digest(digest::DigestArg),
    #[command(name = "keygen", about = "Create a key pair in a keyring directory")]
    Keygen(keygen::KeygenArg),
}
