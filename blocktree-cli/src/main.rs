//! blocktree - build and query block Merkle trees over files.

mod commands;
mod config;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "blocktree", version, about = "Block Merkle tree tool", long_about = None)]
struct Cli {
    /// Config file (default: ~/.blocktree/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `blocktree_merkle=trace`
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that builds a tree.
#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// File to read
    file: PathBuf,

    /// Bytes per leaf block
    #[arg(short, long)]
    block_size: Option<u64>,

    /// Hash algorithm (sha256, blake2b, blake3)
    #[arg(short, long)]
    algorithm: Option<String>,

    /// Read the file from its end
    #[arg(short, long)]
    reverse: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a tree and print its root
    Build {
        #[command(flatten)]
        args: BuildArgs,

        /// Print the whole tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Find the blocks or internal nodes that produced a checksum
    Lookup {
        #[command(flatten)]
        args: BuildArgs,

        /// Hex checksums to look up
        #[arg(required = true)]
        checksums: Vec<String>,
    },

    /// List leaf blocks with their checksums
    Leaves {
        #[command(flatten)]
        args: BuildArgs,
    },

    /// Build a tree and check it for consistency
    Verify {
        #[command(flatten)]
        args: BuildArgs,
    },

    /// Stream a file back to front
    Reverse {
        /// File to read
        file: PathBuf,

        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Restore original byte order after reading backwards
        #[arg(long)]
        forward: bool,
    },
}

fn init_tracing(cli_level: Option<&str>, config: &Config) {
    let filter = match cli_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(config.log_level.as_deref().unwrap_or("info"))
        }),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    init_tracing(cli.log_level.as_deref(), &config);

    match cli.command {
        Commands::Reverse { file, output, forward } => {
            commands::reverse::handle(&file, output.as_deref(), forward)
        }
        command => commands::tree::handle(command, &config),
    }
}
