//! Tree vertices.
//!
//! Nodes live in an arena owned by [`crate::MerkleTree`]; links between them are
//! [`NodeId`]s. Ownership runs strictly from the root down, the `parent` link is
//! a lookup relation only.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a node in its tree's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A vertex of the block Merkle tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) checksum: String,
    pub(crate) start: u64,
    pub(crate) end: u64,
    pub(crate) parent: Option<NodeId>,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
    /// Opaque caller data. Never hashed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) data: Option<serde_json::Value>,
}

impl Node {
    pub(crate) fn leaf(id: NodeId, checksum: String, start: u64, end: u64) -> Self {
        Self {
            id,
            checksum,
            start,
            end,
            parent: None,
            left: None,
            right: None,
            data: None,
        }
    }

    /// Internal node spanning `left.start..right.end`.
    pub(crate) fn internal(id: NodeId, checksum: String, left: &Node, right: &Node) -> Self {
        Self {
            id,
            checksum,
            start: left.start,
            end: right.end,
            parent: None,
            left: Some(left.id),
            right: Some(right.id),
            data: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Hex digest of this node.
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// First byte offset covered by this node.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// One past the last byte offset covered by this node.
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Byte range covered, as `start..end`.
    pub fn range(&self) -> std::ops::Range<u64> {
        self.start..self.end
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn left_child(&self) -> Option<NodeId> {
        self.left
    }

    pub fn right_child(&self) -> Option<NodeId> {
        self.right
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn data(&self) -> Option<&serde_json::Value> {
        self.data.as_ref()
    }
}

/// Nested, self-contained rendering of a subtree for serialization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeView {
    pub checksum: String,
    pub start: u64,
    pub end: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_child: Option<Box<NodeView>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_child: Option<Box<NodeView>>,
}

impl NodeView {
    /// Number of nodes in this subtree.
    pub fn count(&self) -> usize {
        1 + self.left_child.as_ref().map_or(0, |n| n.count())
            + self.right_child.as_ref().map_or(0, |n| n.count())
    }
}
