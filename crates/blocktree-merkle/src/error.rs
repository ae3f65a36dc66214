//! Error types for tree construction, lookup and consistency checks.

use thiserror::Error;

/// Errors produced by the block Merkle tree.
#[derive(Debug, Error)]
pub enum MerkleError {
    #[error("nil source passed in")]
    NilSource,

    #[error("tree not yet indexed")]
    NotIndexed,

    #[error("empty checksum on node covering [{start}, {end})")]
    EmptyChecksum { start: u64, end: u64 },

    #[error("invalid block size: {0}")]
    InvalidBlockSize(u64),

    #[error("checksum mismatch on node covering [{start}, {end}): expected {expected}, got {actual}")]
    ChecksumMismatch {
        start: u64,
        end: u64,
        expected: String,
        actual: String,
    },

    #[error("invalid byte range [{start}, {end})")]
    InvalidRange { start: u64, end: u64 },

    #[error("unknown hash algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown node id: {0}")]
    UnknownNode(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type MerkleResult<T> = Result<T, MerkleError>;
