//! Build configuration.

use serde::{Deserialize, Serialize};

use crate::hash::HashAlgorithm;
use crate::{MerkleError, MerkleResult, DEFAULT_BLOCK_SIZE};

/// How a tree is built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Bytes per leaf block.
    pub block_size: u64,

    /// Checksum primitive.
    pub algorithm: HashAlgorithm,

    /// Read the source from its end through a reverse seek reader.
    pub reverse: bool,
}

impl TreeConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// - `BLOCKTREE_BLOCK_SIZE`
    /// - `BLOCKTREE_ALGORITHM`
    /// - `BLOCKTREE_REVERSE`
    pub fn from_env() -> MerkleResult<Self> {
        Self::default().with_env()
    }

    /// Apply environment overrides on top of `self`.
    pub fn with_env(mut self) -> MerkleResult<Self> {
        if let Ok(value) = std::env::var("BLOCKTREE_BLOCK_SIZE") {
            self.block_size = value.trim().parse().map_err(|e| {
                MerkleError::InvalidConfig(format!("BLOCKTREE_BLOCK_SIZE={}: {}", value, e))
            })?;
        }

        if let Ok(value) = std::env::var("BLOCKTREE_ALGORITHM") {
            self.algorithm = value.parse()?;
        }

        if let Ok(value) = std::env::var("BLOCKTREE_REVERSE") {
            self.reverse = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                other => {
                    return Err(MerkleError::InvalidConfig(format!(
                        "BLOCKTREE_REVERSE={}",
                        other
                    )))
                }
            };
        }

        Ok(self)
    }

    /// Validate configuration
    pub fn validate(&self) -> MerkleResult<()> {
        if self.block_size == 0 {
            return Err(MerkleError::InvalidBlockSize(self.block_size));
        }
        Ok(())
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            algorithm: HashAlgorithm::default(),
            reverse: false,
        }
    }
}
