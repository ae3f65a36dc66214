//! CLI configuration
//!
//! Precedence, highest first: command-line flags, `BLOCKTREE_*` environment
//! variables, the TOML config file, built-in defaults.

use anyhow::{Context, Result};
use blocktree_merkle::TreeConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::BuildArgs;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default log filter when neither `--log-level` nor `RUST_LOG` is set
    pub log_level: Option<String>,

    pub tree: TreeConfig,
}

impl Config {
    /// `~/.blocktree/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".blocktree").join("config.toml"))
    }

    /// Load the config file and apply environment overrides.
    ///
    /// An explicit `path` must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.with_env()
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    fn with_env(mut self) -> Result<Self> {
        self.tree = self
            .tree
            .with_env()
            .context("Invalid BLOCKTREE_* environment variable")?;
        Ok(self)
    }

    /// Tree settings for one command, with flags applied on top.
    pub fn resolve(&self, args: &BuildArgs) -> Result<TreeConfig> {
        let mut tree = self.tree.clone();
        if let Some(block_size) = args.block_size {
            tree.block_size = block_size;
        }
        if let Some(algorithm) = &args.algorithm {
            tree.algorithm = algorithm.parse()?;
        }
        if args.reverse {
            tree.reverse = true;
        }
        tree.validate()?;
        Ok(tree)
    }
}
