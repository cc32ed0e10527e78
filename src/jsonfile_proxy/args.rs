use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "jfp")]
#[command(about = "Inspect and maintain JSON data files written by jsonfile-proxy", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output (debug logging on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Path to the data file
    #[arg(required_unless_present = "config")]
    pub path: Option<PathBuf>,

    /// Encryption key (overrides the one from --config)
    #[arg(short, long)]
    pub key: Option<String>,

    /// JSON config file with `directory` and optional `encryptionKey`
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show file format, size and lock state
    #[command(alias = "st")]
    Status {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Decode the file and print its data
    #[command(alias = "cat")]
    Show {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Rewrite a plain file in encrypted form (needs a key)
    Encrypt {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Rewrite an encrypted file as plain JSON (needs a key)
    Decrypt {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Remove a stale lock file
    Unlock {
        #[command(flatten)]
        target: TargetArgs,
    },
}
