//! Tree command handlers

use anyhow::{bail, Context, Result};
use blocktree_merkle::{MerkleTree, NodeView, TreeConfig};
use colored::Colorize;
use serde::Serialize;
use std::fs::File;
use tracing::debug;

use crate::config::Config;
use crate::{BuildArgs, Commands};

/// JSON output of `build --json`
#[derive(Serialize)]
struct TreeReport<'a> {
    file: String,
    algorithm: &'a str,
    block_size: u64,
    reverse: bool,
    bytes: u64,
    leaves: usize,
    nodes: usize,
    root: Option<NodeView>,
}

pub fn handle(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Build { args, json } => {
            let (tree, settings) = open_tree(&args, config)?;

            if json {
                let report = TreeReport {
                    file: args.file.display().to_string(),
                    algorithm: tree.algorithm(),
                    block_size: settings.block_size,
                    reverse: settings.reverse,
                    bytes: tree.byte_len(),
                    leaves: tree.leaf_count(),
                    nodes: tree.len(),
                    root: tree.to_view(),
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }

            println!("{} Built tree for {}", "✓".green().bold(), args.file.display().to_string().cyan());
            println!("  Algorithm:  {}", tree.algorithm().cyan());
            println!("  Block size: {}", settings.block_size.to_string().cyan());
            println!("  Direction:  {}", direction(&settings).cyan());
            println!("  Bytes:      {}", tree.byte_len().to_string().cyan());
            println!("  Leaves:     {}", tree.leaf_count().to_string().cyan());
            println!("  Nodes:      {}", tree.len().to_string().cyan());
            match tree.root_checksum() {
                Some(root) => println!("  Root:       {}", root.green()),
                None => println!("  Root:       {}", "<empty>".dimmed()),
            }
            Ok(())
        }

        Commands::Lookup { args, checksums } => {
            let (tree, _) = open_tree(&args, config)?;

            let mut missing = 0;
            for checksum in &checksums {
                let checksum = checksum.trim().to_ascii_lowercase();
                let matches = tree.lookup(&checksum)?;
                if matches.is_empty() {
                    missing += 1;
                    println!("{} {} no match", "✗".red().bold(), checksum.dimmed());
                    continue;
                }

                println!("{} {} {} match(es)", "✓".green().bold(), checksum.cyan(), matches.len());
                for node in matches {
                    let kind = if node.is_leaf() { "leaf" } else { "internal" };
                    println!("  [{}, {})  {}", node.start(), node.end(), kind.dimmed());
                }
            }

            debug!(queried = checksums.len(), missing, "Lookup finished");
            Ok(())
        }

        Commands::Leaves { args } => {
            let (tree, _) = open_tree(&args, config)?;
            for (i, leaf) in tree.leaves().enumerate() {
                println!(
                    "{:>6}  [{:>10}, {:>10})  {}",
                    i,
                    leaf.start(),
                    leaf.end(),
                    leaf.checksum()
                );
            }
            Ok(())
        }

        Commands::Verify { args } => {
            let (mut tree, _) = open_tree(&args, config)?;
            match tree.verify() {
                Ok(()) => {
                    println!(
                        "{} {} nodes consistent",
                        "✓".green().bold(),
                        tree.len().to_string().cyan()
                    );
                    Ok(())
                }
                Err(e) => {
                    println!("{} Verification failed: {}", "✗".red().bold(), e.to_string().red());
                    bail!("tree for {} is inconsistent", args.file.display())
                }
            }
        }

        Commands::Reverse { .. } => bail!("reverse is not a tree command"),
    }
}

fn direction(settings: &TreeConfig) -> &'static str {
    if settings.reverse {
        "reverse"
    } else {
        "forward"
    }
}

fn open_tree(args: &BuildArgs, config: &Config) -> Result<(MerkleTree, TreeConfig)> {
    let settings = config.resolve(args)?;
    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;

    debug!(
        file = %args.file.display(),
        block_size = settings.block_size,
        algorithm = %settings.algorithm,
        reverse = settings.reverse,
        "Building tree"
    );

    let tree = MerkleTree::build_with_config(Some(file), &settings)
        .with_context(|| format!("Failed to build tree for {}", args.file.display()))?;
    Ok((tree, settings))
}
