//! Pre-order traversal and the checksum index built from it.

use std::collections::HashMap;

use crate::node::{Node, NodeId};

/// Iterative pre-order walk: node, then left subtree, then right subtree.
pub struct PreOrder<'a> {
    nodes: &'a [Node],
    stack: Vec<NodeId>,
}

impl<'a> PreOrder<'a> {
    pub(crate) fn new(nodes: &'a [Node], root: Option<NodeId>) -> Self {
        Self {
            nodes,
            stack: root.into_iter().collect(),
        }
    }
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.nodes.get(id.0)?;
        if let Some(right) = node.right {
            self.stack.push(right);
        }
        if let Some(left) = node.left {
            self.stack.push(left);
        }
        Some(node)
    }
}

/// Checksum to every node carrying it, in pre-order discovery order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChecksumIndex {
    entries: HashMap<String, Vec<NodeId>>,
}

impl ChecksumIndex {
    /// Index every node reachable from `root`.
    pub(crate) fn build(nodes: &[Node], root: Option<NodeId>) -> Self {
        let mut entries: HashMap<String, Vec<NodeId>> = HashMap::new();
        for node in PreOrder::new(nodes, root) {
            entries.entry(node.checksum.clone()).or_default().push(node.id);
        }
        Self { entries }
    }

    /// Nodes with `checksum`; empty when there is no match.
    pub fn get(&self, checksum: &str) -> &[NodeId] {
        self.entries.get(checksum).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, checksum: &str) -> bool {
        self.entries.contains_key(checksum)
    }

    /// Number of distinct checksums.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of indexed nodes, counting duplicates.
    pub fn node_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[NodeId])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}
