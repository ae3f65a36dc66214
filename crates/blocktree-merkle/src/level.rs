//! Bottom-up level construction.
//!
//! Leaves are produced one per block read from the source. Each level is then
//! paired left to right, `(0, 1)`, `(2, 3)`, ..., into parents whose checksum is
//! the hash of the two child checksums concatenated as hex text. An odd node out
//! is carried into the next level as-is. Levels are reduced in a loop rather
//! than by recursion.

use std::io::{self, Read};
use tracing::debug;

use crate::error::MerkleResult;
use crate::hash::{checksum_pair, finalize_hex, ChecksumHasher, HashWriter};
use crate::node::{Node, NodeId};

/// Builds the node arena for one tree.
pub struct LevelBuilder<'h, H: ChecksumHasher + ?Sized> {
    hasher: &'h mut H,
    nodes: Vec<Node>,
}

impl<'h, H: ChecksumHasher + ?Sized> LevelBuilder<'h, H> {
    pub fn new(hasher: &'h mut H) -> Self {
        Self {
            hasher,
            nodes: Vec::new(),
        }
    }

    /// Add a leaf with a precomputed checksum.
    pub fn push_leaf(&mut self, checksum: String, start: u64, end: u64) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::leaf(id, checksum, start, end));
        id
    }

    /// Read `source` in blocks of `block_size` bytes, adding one leaf per
    /// non-empty block. Returns the leaves in stream order.
    ///
    /// A short block means the source is exhausted and ends the scan; it is
    /// still emitted as a leaf.
    pub fn read_leaves<R: Read>(&mut self, mut source: R, block_size: u64) -> MerkleResult<Vec<NodeId>> {
        let mut leaves = Vec::new();
        let mut offset = 0u64;

        loop {
            self.hasher.reset();
            let mut block = (&mut source).take(block_size);
            let n = io::copy(&mut block, &mut HashWriter(&mut *self.hasher))?;
            if n == 0 {
                break;
            }

            let checksum = finalize_hex(&mut *self.hasher);
            leaves.push(self.push_leaf(checksum, offset, offset + n));
            offset += n;

            if n < block_size {
                break;
            }
        }

        debug!(leaves = leaves.len(), bytes = offset, "Read leaf level");
        Ok(leaves)
    }

    /// Pair one level into the next.
    pub fn pair_level(&mut self, level: &[NodeId]) -> Vec<NodeId> {
        let mut parents = Vec::with_capacity(level.len() / 2 + 1);

        for pair in level.chunks(2) {
            if let [left, right] = *pair {
                let checksum = checksum_pair(
                    &mut *self.hasher,
                    &self.nodes[left.0].checksum,
                    &self.nodes[right.0].checksum,
                );
                let id = NodeId(self.nodes.len());
                let parent = Node::internal(id, checksum, &self.nodes[left.0], &self.nodes[right.0]);
                self.nodes.push(parent);
                self.nodes[left.0].parent = Some(id);
                self.nodes[right.0].parent = Some(id);
                parents.push(id);
            } else {
                // Odd node out moves up unchanged.
                parents.extend_from_slice(pair);
            }
        }

        parents
    }

    /// Reduce `level` until a single node remains and return it.
    ///
    /// An empty level has no root. A single node is its own root.
    pub fn reduce(&mut self, mut level: Vec<NodeId>) -> Option<NodeId> {
        let mut height = 0usize;
        while level.len() > 1 {
            level = self.pair_level(&level);
            height += 1;
            debug!(level = height, width = level.len(), "Reduced level");
        }
        level.first().copied()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Hand over the arena.
    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::checksum_of;
    use sha2::{Digest, Sha256};
    use std::io::Cursor;

    #[test]
    fn test_leaves_cover_stream() {
        let mut hasher = Sha256::new();
        let mut builder = LevelBuilder::new(&mut hasher);
        let data = vec![7u8; 25];

        let leaves = builder.read_leaves(Cursor::new(&data), 10).unwrap();
        let ranges: Vec<_> = leaves
            .iter()
            .map(|id| builder.node(*id).unwrap().range())
            .collect();
        assert_eq!(ranges, vec![0..10, 10..20, 20..25]);
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_leaf() {
        let mut hasher = Sha256::new();
        let mut builder = LevelBuilder::new(&mut hasher);
        let leaves = builder.read_leaves(Cursor::new(vec![1u8; 30]), 10).unwrap();
        assert_eq!(leaves.len(), 3);
        assert_eq!(builder.node(leaves[2]).unwrap().end(), 30);
    }

    #[test]
    fn test_odd_node_carried_forward() {
        let mut hasher = Sha256::new();
        let mut builder = LevelBuilder::new(&mut hasher);
        let ids: Vec<_> = (0..3u64)
            .map(|i| builder.push_leaf(format!("{:02x}", i), i * 4, i * 4 + 4))
            .collect();

        let next = builder.pair_level(&ids);
        assert_eq!(next.len(), 2);
        assert_eq!(next[1], ids[2]);
        assert_eq!(builder.node(ids[2]).unwrap().parent(), None);

        let parent = builder.node(next[0]).unwrap();
        assert_eq!(parent.left_child(), Some(ids[0]));
        assert_eq!(parent.right_child(), Some(ids[1]));
        assert_eq!(parent.range(), 0..8);
        assert_eq!(builder.node(ids[0]).unwrap().parent(), Some(next[0]));
    }

    #[test]
    fn test_parent_checksum_from_child_text() {
        let mut hasher = Sha256::new();
        let mut builder = LevelBuilder::new(&mut hasher);
        let a = builder.push_leaf("aa".to_string(), 0, 1);
        let b = builder.push_leaf("bb".to_string(), 1, 2);
        let root = builder.reduce(vec![a, b]).unwrap();
        let checksum = builder.node(root).unwrap().checksum().to_string();
        drop(builder);

        assert_eq!(checksum, checksum_of(&mut hasher, b"aabb"));
    }

    #[test]
    fn test_reduce_single_and_empty() {
        let mut hasher = Sha256::new();
        let mut builder = LevelBuilder::new(&mut hasher);
        assert_eq!(builder.reduce(Vec::new()), None);

        let only = builder.push_leaf("ff".to_string(), 0, 1);
        assert_eq!(builder.reduce(vec![only]), Some(only));
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn test_five_leaves_shape() {
        let mut hasher = Sha256::new();
        let mut builder = LevelBuilder::new(&mut hasher);
        let ids: Vec<_> = (0..5u64)
            .map(|i| builder.push_leaf(format!("{:02x}", i), i, i + 1))
            .collect();

        // 5 -> 3 -> 2 -> 1, creating 2 + 1 + 1 internal nodes.
        let root = builder.reduce(ids.clone()).unwrap();
        assert_eq!(builder.len(), 9);

        let root = builder.node(root).unwrap();
        assert_eq!(root.range(), 0..5);
        assert_eq!(root.right_child(), Some(ids[4]));
    }
}
