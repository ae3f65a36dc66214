//! # blocktree-merkle
//!
//! Binary Merkle trees over fixed-size blocks of a byte stream.
//!
//! - [`MerkleTree`]: built once from a byte source, then indexed by checksum so
//!   any block or internal node that produced a digest can be found again.
//! - [`ReverseSeekReader`]: feeds a tree from a seekable source walked from its
//!   end, in power-of-two chunks.
//!
//! ## Construction
//!
//! The source is cut into `block_size` blocks, each hashed into a leaf. Levels
//! are then paired left to right; a parent's checksum is the hash of its two
//! children's hex checksums concatenated. An odd node at the end of a level is
//! carried up unchanged. Once one node remains it becomes the root, and a single
//! pre-order walk builds the checksum index.
//!
//! The hash primitive is pluggable through [`ChecksumHasher`]; SHA-256 and BLAKE3
//! are provided.

pub mod config;
pub mod error;
pub mod hash;
pub mod index;
pub mod level;
pub mod node;
pub mod reverse;
pub mod tree;

pub use config::TreeConfig;
pub use error::{MerkleError, MerkleResult};
pub use hash::{checksum_of, Blake2b256, BoxedHasher, ChecksumHasher, HashAlgorithm};
pub use index::{ChecksumIndex, PreOrder};
pub use level::LevelBuilder;
pub use node::{Node, NodeId, NodeView};
pub use reverse::{floor_pow2, ReverseSeekReader};
pub use tree::{merklefy, reverse_merklefy, MerkleTree};

/// Default number of bytes per leaf block.
pub const DEFAULT_BLOCK_SIZE: u64 = 4096;
