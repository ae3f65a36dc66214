//! Checksum primitives for merkle trees.
//!
//! A tree is built with a single [`ChecksumHasher`] that is reset before every
//! block and every internal node, so no two computations share hash state.
//! Digests are rendered as lowercase hex; that text is both the index key and
//! the input to parent checksums.

use blake2::digest::consts::U32;
use blake2::Blake2b;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io;
use std::str::FromStr;

use crate::{MerkleError, MerkleResult};

/// A reusable hashing primitive with reset-and-reuse semantics.
pub trait ChecksumHasher {
    /// Discard any accumulated state.
    fn reset(&mut self);

    /// Accumulate `data`.
    fn update(&mut self, data: &[u8]);

    /// Finalize to a digest and reset, leaving the hasher ready for reuse.
    fn finalize_reset(&mut self) -> Vec<u8>;

    /// Short algorithm name, e.g. `sha256`.
    fn algorithm(&self) -> &'static str;
}

/// BLAKE2b truncated to a 32 byte digest.
pub type Blake2b256 = Blake2b<U32>;

macro_rules! impl_digest_hasher {
    ($ty:ty, $name:literal) => {
        impl ChecksumHasher for $ty {
            fn reset(&mut self) {
                Digest::reset(self);
            }

            fn update(&mut self, data: &[u8]) {
                Digest::update(self, data);
            }

            fn finalize_reset(&mut self) -> Vec<u8> {
                Digest::finalize_reset(self).to_vec()
            }

            fn algorithm(&self) -> &'static str {
                $name
            }
        }
    };
}

impl_digest_hasher!(Sha256, "sha256");
impl_digest_hasher!(Blake2b256, "blake2b");

impl ChecksumHasher for blake3::Hasher {
    fn reset(&mut self) {
        blake3::Hasher::reset(self);
    }

    fn update(&mut self, data: &[u8]) {
        blake3::Hasher::update(self, data);
    }

    fn finalize_reset(&mut self) -> Vec<u8> {
        let digest = self.finalize().as_bytes().to_vec();
        blake3::Hasher::reset(self);
        digest
    }

    fn algorithm(&self) -> &'static str {
        "blake3"
    }
}

impl<H: ChecksumHasher + ?Sized> ChecksumHasher for Box<H> {
    fn reset(&mut self) {
        (**self).reset();
    }

    fn update(&mut self, data: &[u8]) {
        (**self).update(data);
    }

    fn finalize_reset(&mut self) -> Vec<u8> {
        (**self).finalize_reset()
    }

    fn algorithm(&self) -> &'static str {
        (**self).algorithm()
    }
}

/// Boxed hasher as stored by a tree.
pub type BoxedHasher = Box<dyn ChecksumHasher + Send + Sync>;

/// Supported checksum algorithms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Blake2b,
    Blake3,
}

impl HashAlgorithm {
    /// Create a fresh hasher for this algorithm.
    pub fn hasher(&self) -> BoxedHasher {
        match self {
            HashAlgorithm::Sha256 => Box::new(Sha256::new()),
            HashAlgorithm::Blake2b => Box::new(Blake2b256::new()),
            HashAlgorithm::Blake3 => Box::new(blake3::Hasher::new()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Blake2b => "blake2b",
            HashAlgorithm::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = MerkleError;

    fn from_str(s: &str) -> MerkleResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            "blake2b" | "blake2b256" | "blake2b-256" => Ok(HashAlgorithm::Blake2b),
            "blake3" => Ok(HashAlgorithm::Blake3),
            other => Err(MerkleError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Adapts a [`ChecksumHasher`] to [`io::Write`] so blocks can be streamed in
/// with `io::copy`.
pub(crate) struct HashWriter<'a, H: ChecksumHasher + ?Sized>(pub(crate) &'a mut H);

impl<H: ChecksumHasher + ?Sized> io::Write for HashWriter<'_, H> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Finalize the hasher and render the digest as lowercase hex.
pub fn finalize_hex<H: ChecksumHasher + ?Sized>(hasher: &mut H) -> String {
    hex::encode(hasher.finalize_reset())
}

/// Checksum `data` from a clean hasher state.
pub fn checksum_of<H: ChecksumHasher + ?Sized>(hasher: &mut H, data: &[u8]) -> String {
    hasher.reset();
    hasher.update(data);
    finalize_hex(hasher)
}

/// Checksum of an internal node: hash of the two child checksums concatenated
/// as text.
pub fn checksum_pair<H: ChecksumHasher + ?Sized>(hasher: &mut H, left: &str, right: &str) -> String {
    hasher.reset();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    finalize_hex(hasher)
}
