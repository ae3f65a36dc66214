//! Block Merkle tree.
//!
//! A tree is built once from a whole byte stream and is read-only afterwards.
//! Building splits the stream into `block_size` blocks, hashes each into a leaf,
//! pairs levels up to a single root and finally indexes every node by checksum.
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//! use blocktree_merkle::{merklefy, HashAlgorithm};
//!
//! let data = b"aaaaaaaaaabbbbbbbbbbaaaaaaaaaa".to_vec();
//! let tree = merklefy(Some(Cursor::new(data)), HashAlgorithm::Sha256.hasher(), 10).unwrap();
//!
//! let first = tree.leaves().next().unwrap();
//! let matches = tree.lookup(first.checksum()).unwrap();
//! let ranges: Vec<_> = matches.iter().map(|n| n.range()).collect();
//! assert_eq!(ranges, vec![0..10, 20..30]);
//! ```

use std::fmt;
use std::io::{Read, Seek};
use tracing::{info, warn};

use crate::config::TreeConfig;
use crate::error::{MerkleError, MerkleResult};
use crate::hash::{checksum_pair, BoxedHasher, ChecksumHasher, HashAlgorithm};
use crate::index::{ChecksumIndex, PreOrder};
use crate::level::LevelBuilder;
use crate::node::{Node, NodeId, NodeView};
use crate::reverse::ReverseSeekReader;

/// Binary Merkle tree over the blocks of a byte stream.
///
/// `MerkleTree` is `Send + Sync`; a built tree can be shared behind an `Arc`
/// and queried from many threads. Building and replacing the hasher need
/// `&mut self`.
pub struct MerkleTree {
    hasher: BoxedHasher,
    nodes: Vec<Node>,
    root: Option<NodeId>,
    /// `None` until a build succeeds.
    index: Option<ChecksumIndex>,
    block_size: u64,
    leaf_count: usize,
}

/// Output of a successful build, installed into the tree in one step.
struct Built {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    index: ChecksumIndex,
    leaf_count: usize,
}

impl MerkleTree {
    /// Create an empty, unindexed tree using `hasher` for future builds.
    pub fn new<H>(hasher: H) -> Self
    where
        H: ChecksumHasher + Send + Sync + 'static,
    {
        Self {
            hasher: Box::new(hasher),
            nodes: Vec::new(),
            root: None,
            index: None,
            block_size: 0,
            leaf_count: 0,
        }
    }

    pub fn with_algorithm(algorithm: HashAlgorithm) -> Self {
        Self::from_boxed(algorithm.hasher())
    }

    fn from_boxed(hasher: BoxedHasher) -> Self {
        Self {
            hasher,
            nodes: Vec::new(),
            root: None,
            index: None,
            block_size: 0,
            leaf_count: 0,
        }
    }

    /// Build a tree from `source` as described by `config`.
    pub fn build_with_config<S: Read + Seek>(source: Option<S>, config: &TreeConfig) -> MerkleResult<Self> {
        config.validate()?;
        let mut tree = Self::with_algorithm(config.algorithm);
        if config.reverse {
            tree.reverse_merklefy(source, config.block_size)?;
        } else {
            tree.merklefy(source, config.block_size)?;
        }
        Ok(tree)
    }

    /// Replace the hash primitive used by later builds and checks.
    pub fn set_hasher<H>(&mut self, hasher: H)
    where
        H: ChecksumHasher + Send + Sync + 'static,
    {
        self.hasher = Box::new(hasher);
    }

    /// Name of the current hash primitive.
    pub fn algorithm(&self) -> &'static str {
        self.hasher.algorithm()
    }

    /// (Re)build the tree from a forward-readable source.
    ///
    /// On failure the previous tree, if any, is left untouched.
    pub fn merklefy<R: Read>(&mut self, source: Option<R>, block_size: u64) -> MerkleResult<()> {
        let source = source.ok_or(MerkleError::NilSource)?;
        if block_size == 0 {
            return Err(MerkleError::InvalidBlockSize(block_size));
        }

        match Self::construct(&mut *self.hasher, source, block_size) {
            Ok(built) => {
                self.install(built, block_size);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, block_size, "Tree build failed");
                Err(e)
            }
        }
    }

    /// (Re)build the tree from a seekable source read back to front through a
    /// [`ReverseSeekReader`]. Offsets refer to positions in the reversed
    /// stream.
    pub fn reverse_merklefy<S: Read + Seek>(&mut self, source: Option<S>, block_size: u64) -> MerkleResult<()> {
        let source = source.ok_or(MerkleError::NilSource)?;
        let reader = ReverseSeekReader::new(source)?;
        self.merklefy(Some(reader), block_size)
    }

    fn construct<R: Read, H: ChecksumHasher + ?Sized>(
        hasher: &mut H,
        source: R,
        block_size: u64,
    ) -> MerkleResult<Built> {
        let mut builder = LevelBuilder::new(hasher);
        let leaves = builder.read_leaves(source, block_size)?;
        let leaf_count = leaves.len();
        let root = builder.reduce(leaves);
        let nodes = builder.into_nodes();
        let index = ChecksumIndex::build(&nodes, root);
        Ok(Built {
            nodes,
            root,
            index,
            leaf_count,
        })
    }

    fn install(&mut self, built: Built, block_size: u64) {
        self.nodes = built.nodes;
        self.root = built.root;
        self.index = Some(built.index);
        self.block_size = block_size;
        self.leaf_count = built.leaf_count;

        info!(
            leaves = self.leaf_count,
            nodes = self.nodes.len(),
            bytes = self.byte_len(),
            block_size,
            root = self.root_checksum().unwrap_or("<empty>"),
            "Tree built"
        );
    }

    /// All nodes, leaves or internal, whose checksum equals `checksum`, in
    /// pre-order discovery order.
    pub fn lookup(&self, checksum: &str) -> MerkleResult<Vec<&Node>> {
        let index = self.index.as_ref().ok_or(MerkleError::NotIndexed)?;
        Ok(index
            .get(checksum)
            .iter()
            .filter_map(|id| self.nodes.get(id.0))
            .collect())
    }

    /// Visit every node, each before its children.
    pub fn traverse<F: FnMut(&Node)>(&self, mut visit: F) {
        for node in self.iter() {
            visit(node);
        }
    }

    /// Pre-order iterator over the tree.
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder::new(&self.nodes, self.root)
    }

    /// Leaves, left to right.
    pub fn leaves(&self) -> impl Iterator<Item = &Node> {
        self.iter().filter(|n| n.is_leaf())
    }

    pub fn root(&self) -> Option<&Node> {
        self.root.and_then(|id| self.nodes.get(id.0))
    }

    pub fn root_checksum(&self) -> Option<&str> {
        self.root().map(Node::checksum)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn parent(&self, node: &Node) -> Option<&Node> {
        node.parent.and_then(|id| self.nodes.get(id.0))
    }

    /// Left and right children of an internal node.
    pub fn children(&self, node: &Node) -> Option<(&Node, &Node)> {
        let left = self.nodes.get(node.left?.0)?;
        let right = self.nodes.get(node.right?.0)?;
        Some((left, right))
    }

    /// Walk parent links from `id` up to the root, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = &Node> {
        let first = self.node(id).and_then(|n| self.parent(n));
        std::iter::successors(first, move |n: &&Node| self.parent(n))
    }

    /// Checksum index; `None` until a build succeeds.
    pub fn index(&self) -> Option<&ChecksumIndex> {
        self.index.as_ref()
    }

    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of leaves, recorded when the tree was built.
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Total bytes covered by the tree.
    pub fn byte_len(&self) -> u64 {
        self.root().map_or(0, Node::end)
    }

    /// Block size of the last successful build.
    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Attach opaque data to a node. The payload never affects checksums.
    pub fn set_payload(&mut self, id: NodeId, data: serde_json::Value) -> MerkleResult<()> {
        let node = self
            .nodes
            .get_mut(id.0)
            .ok_or(MerkleError::UnknownNode(id.0))?;
        node.data = Some(data);
        Ok(())
    }

    /// Check the whole tree for consistency: non-empty checksums, contiguous
    /// leaf ranges starting at 0, internal ranges spanning their children and
    /// internal checksums that recompute from the children.
    pub fn verify(&mut self) -> MerkleResult<()> {
        if self.index.is_none() {
            return Err(MerkleError::NotIndexed);
        }

        if let Some(node) = self.iter().find(|n| n.checksum.is_empty()) {
            return Err(MerkleError::EmptyChecksum {
                start: node.start,
                end: node.end,
            });
        }

        let mut next_leaf_start = 0u64;
        for node in PreOrder::new(&self.nodes, self.root) {
            let invalid = MerkleError::InvalidRange {
                start: node.start,
                end: node.end,
            };
            if node.start >= node.end {
                return Err(invalid);
            }

            match (node.left, node.right) {
                (None, None) => {
                    if node.start != next_leaf_start {
                        return Err(invalid);
                    }
                    next_leaf_start = node.end;
                }
                (Some(left), Some(right)) => {
                    let (left, right) = match (self.nodes.get(left.0), self.nodes.get(right.0)) {
                        (Some(l), Some(r)) => (l, r),
                        _ => return Err(invalid),
                    };
                    if left.start != node.start || right.end != node.end || left.end != right.start {
                        return Err(invalid);
                    }
                    let expected = checksum_pair(&mut *self.hasher, &left.checksum, &right.checksum);
                    if expected != node.checksum {
                        return Err(MerkleError::ChecksumMismatch {
                            start: node.start,
                            end: node.end,
                            expected,
                            actual: node.checksum.clone(),
                        });
                    }
                }
                _ => return Err(invalid),
            }
        }
        Ok(())
    }

    /// Nested rendering of the whole tree for serialization.
    pub fn to_view(&self) -> Option<NodeView> {
        self.root.map(|id| self.view_of(id))
    }

    fn view_of(&self, id: NodeId) -> NodeView {
        let node = &self.nodes[id.0];
        NodeView {
            checksum: node.checksum.clone(),
            start: node.start,
            end: node.end,
            data: node.data.clone(),
            left_child: node.left.map(|l| Box::new(self.view_of(l))),
            right_child: node.right.map(|r| Box::new(self.view_of(r))),
        }
    }
}

impl fmt::Debug for MerkleTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerkleTree")
            .field("algorithm", &self.algorithm())
            .field("root", &self.root_checksum())
            .field("nodes", &self.nodes.len())
            .field("indexed", &self.is_indexed())
            .field("block_size", &self.block_size)
            .finish()
    }
}

/// Build a tree from a forward-readable source.
pub fn merklefy<R, H>(source: Option<R>, hasher: H, block_size: u64) -> MerkleResult<MerkleTree>
where
    R: Read,
    H: ChecksumHasher + Send + Sync + 'static,
{
    let mut tree = MerkleTree::new(hasher);
    tree.merklefy(source, block_size)?;
    Ok(tree)
}

/// Build a tree from a seekable source read from its end.
pub fn reverse_merklefy<S, H>(source: Option<S>, hasher: H, block_size: u64) -> MerkleResult<MerkleTree>
where
    S: Read + Seek,
    H: ChecksumHasher + Send + Sync + 'static,
{
    let mut tree = MerkleTree::new(hasher);
    tree.reverse_merklefy(source, block_size)?;
    Ok(tree)
}
