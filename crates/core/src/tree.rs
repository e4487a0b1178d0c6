//! Huffman tree construction.
//!
//! The tree is an owned recursive sum type: every internal node owns exactly
//! two boxed children, so the strict-binary shape holds by construction.
//!
//! # Building
//!
//! 1. One leaf per byte value with a non-zero count goes into a [`MinHeap`].
//! 2. While more than one entry remains, the two lightest are extracted and
//!    merged under a new internal node (first extracted on the left).
//! 3. The last entry is the root.
//!
//! Equal weights are ordered by a sequence number: leaves use their byte value,
//! merged nodes continue from 256 in creation order. Builds are therefore
//! reproducible for a given frequency table.
//!
//! A single distinct symbol never merges, and a lone leaf cannot act as a
//! decoding root. That case gets a synthesized root with the real symbol on the
//! left and a zero-weight placeholder leaf on the right.

use std::cmp::Ordering;

use tracing::debug;

use crate::error::{HuffmanError, Result};
use crate::frequency::FrequencyTable;
use crate::heap::MinHeap;

/// Deepest tree a 256-symbol alphabet can produce.
pub const MAX_DEPTH: usize = 255;

/// A node of the Huffman tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// One original byte value
    Leaf { byte: u8, weight: u64 },
    /// Synthetic node, weight is the sum of its children
    Internal {
        weight: u64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    /// Create a leaf.
    pub fn leaf(byte: u8, weight: u64) -> Self {
        Node::Leaf { byte, weight }
    }

    /// Join two subtrees under a new internal node.
    pub fn merge(left: Node, right: Node) -> Self {
        Node::Internal {
            weight: left.weight().saturating_add(right.weight()),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Weight of the subtree. Trees read back from an artifact carry zero weights.
    pub fn weight(&self) -> u64 {
        match self {
            Node::Leaf { weight, .. } | Node::Internal { weight, .. } => *weight,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Number of leaves below (and including) this node.
    pub fn leaf_count(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Internal { left, right, .. } => left.leaf_count() + right.leaf_count(),
        }
    }

    /// Length of the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Internal { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

/// A decoding-capable Huffman tree: the root is always internal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTree {
    root: Node,
}

impl HuffmanTree {
    /// Wrap a root node, rejecting a lone leaf.
    pub(crate) fn from_root(root: Node) -> Option<Self> {
        if root.is_leaf() {
            None
        } else {
            Some(Self { root })
        }
    }

    /// Build the tree for a frequency table.
    ///
    /// # Errors
    /// `HuffmanError::EmptyFrequencyTable` if every count is zero.
    pub fn from_frequencies(freqs: &FrequencyTable) -> Result<Self> {
        let leaves: Vec<HeapEntry> = freqs
            .symbols()
            .map(|(byte, count)| HeapEntry {
                weight: count,
                order: byte as u32,
                node: Node::leaf(byte, count),
            })
            .collect();

        let mut heap = MinHeap::build(leaves);
        let mut next_order = 256u32;

        if heap.len() == 1 {
            if let Some(only) = heap.extract_min() {
                let placeholder = match &only.node {
                    Node::Leaf { byte, .. } => byte.wrapping_add(1),
                    Node::Internal { .. } => 0,
                };
                debug!(placeholder, "single symbol input, synthesizing two-leaf tree");
                heap.insert(HeapEntry {
                    weight: only.weight,
                    order: next_order,
                    node: Node::merge(only.node, Node::leaf(placeholder, 0)),
                });
            }
        }

        while heap.len() > 1 {
            let (Some(left), Some(right)) = (heap.extract_min(), heap.extract_min()) else {
                break;
            };
            let node = Node::merge(left.node, right.node);
            heap.insert(HeapEntry {
                weight: node.weight(),
                order: next_order,
                node,
            });
            next_order += 1;
        }

        let root = heap
            .extract_min()
            .ok_or(HuffmanError::EmptyFrequencyTable)?
            .node;

        debug!(
            leaves = root.leaf_count(),
            depth = root.depth(),
            "built huffman tree"
        );

        Ok(Self { root })
    }

    /// Build the tree for an in-memory buffer.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_frequencies(&FrequencyTable::from_bytes(data))
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Number of leaves (distinct symbols, or 2 for a single-symbol input).
    pub fn leaf_count(&self) -> usize {
        self.root.leaf_count()
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    /// Leaf byte values in left-to-right order.
    pub fn leaves(&self) -> Vec<u8> {
        fn walk(node: &Node, out: &mut Vec<u8>) {
            match node {
                Node::Leaf { byte, .. } => out.push(*byte),
                Node::Internal { left, right, .. } => {
                    walk(left, out);
                    walk(right, out);
                }
            }
        }
        let mut out = Vec::with_capacity(self.leaf_count());
        walk(&self.root, &mut out);
        out
    }
}

/// Heap entry: a subtree keyed by `(weight, order)`.
#[derive(Debug)]
struct HeapEntry {
    weight: u64,
    order: u32,
    node: Node,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.weight == other.weight && self.order == other.order
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .cmp(&other.weight)
            .then(self.order.cmp(&other.order))
    }
}
