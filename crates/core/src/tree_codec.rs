//! Tree header serialization.
//!
//! The tree is written in pre-order with one tag byte per node:
//!
//! ```text
//! 0x00              internal node, then left subtree, then right subtree
//! 0x01 <value>      leaf holding byte <value>
//! 0x02              empty tree (whole header of an empty-input artifact)
//! ```
//!
//! Leaves carry their value in a separate byte, so any byte value (including
//! the internal tag) can sit in a leaf. The header has no length prefix: it
//! ends once the recursive read completes. A tree with `n` leaves takes
//! `3n - 1` bytes.
//!
//! Recursion depth is bounded by [`MAX_DEPTH`]; deeper input is rejected
//! rather than walked.

use std::io::{self, Read, Write};

use crate::error::{Result, TreeError};
use crate::tree::{HuffmanTree, Node, MAX_DEPTH};

/// Tag for an internal node.
pub const TAG_INTERNAL: u8 = 0x00;
/// Tag for a leaf; one value byte follows.
pub const TAG_LEAF: u8 = 0x01;
/// Tag for an empty tree.
pub const TAG_EMPTY: u8 = 0x02;

/// Serialized size of a tree with `leaves` leaves.
pub fn encoded_len(leaves: usize) -> usize {
    if leaves == 0 {
        1
    } else {
        3 * leaves - 1
    }
}

/// Serialize a tree, or the empty-tree marker for `None`.
pub fn serialize(tree: Option<&HuffmanTree>) -> Vec<u8> {
    let mut out = Vec::new();
    match tree {
        Some(tree) => {
            out.reserve(encoded_len(tree.leaf_count()));
            write_node(tree.root(), &mut out);
        }
        None => out.push(TAG_EMPTY),
    }
    out
}

/// Write the serialized tree to `writer`, returning the byte count.
pub fn write_tree<W: Write>(tree: Option<&HuffmanTree>, writer: &mut W) -> Result<usize> {
    let bytes = serialize(tree);
    writer.write_all(&bytes)?;
    Ok(bytes.len())
}

fn write_node(node: &Node, out: &mut Vec<u8>) {
    match node {
        Node::Leaf { byte, .. } => {
            out.push(TAG_LEAF);
            out.push(*byte);
        }
        Node::Internal { left, right, .. } => {
            out.push(TAG_INTERNAL);
            write_node(left, out);
            write_node(right, out);
        }
    }
}

/// Read one tree header from `reader`, consuming exactly its bytes.
///
/// Returns `None` for the empty-tree marker.
///
/// # Errors
/// - `TreeError::UnexpectedEof` if the source ends inside the header
/// - `TreeError::InvalidTag` for an unknown or misplaced tag
/// - `TreeError::Degenerate` if the root is a leaf
/// - `TreeError::TooDeep` if nesting exceeds [`MAX_DEPTH`]
/// - `Error::Io` for other read failures
pub fn read_tree<R: Read>(reader: &mut R) -> Result<Option<HuffmanTree>> {
    let mut source = TagReader {
        inner: reader,
        position: 0,
    };

    let first = source.next_byte()?;
    let root = match first {
        TAG_EMPTY => return Ok(None),
        TAG_LEAF => {
            source.next_byte()?;
            return Err(TreeError::Degenerate.into());
        }
        TAG_INTERNAL => read_internal(&mut source, 0)?,
        tag => {
            return Err(TreeError::InvalidTag { tag, position: 0 }.into());
        }
    };

    Ok(HuffmanTree::from_root(root))
}

/// Deserialize a tree from the start of `bytes`.
///
/// Returns the tree and the number of header bytes consumed.
pub fn deserialize(bytes: &[u8]) -> Result<(Option<HuffmanTree>, usize)> {
    let mut cursor = io::Cursor::new(bytes);
    let tree = read_tree(&mut cursor)?;
    Ok((tree, cursor.position() as usize))
}

fn read_internal<R: Read>(source: &mut TagReader<'_, R>, depth: usize) -> Result<Node> {
    if depth >= MAX_DEPTH {
        return Err(TreeError::TooDeep { max: MAX_DEPTH }.into());
    }
    let left = read_node(source, depth + 1)?;
    let right = read_node(source, depth + 1)?;
    Ok(Node::merge(left, right))
}

fn read_node<R: Read>(source: &mut TagReader<'_, R>, depth: usize) -> Result<Node> {
    let position = source.position;
    match source.next_byte()? {
        TAG_INTERNAL => read_internal(source, depth),
        TAG_LEAF => Ok(Node::leaf(source.next_byte()?, 0)),
        tag => Err(TreeError::InvalidTag { tag, position }.into()),
    }
}

/// Byte-at-a-time reader that tracks its offset for error reporting.
struct TagReader<'a, R> {
    inner: &'a mut R,
    position: u64,
}

impl<R: Read> TagReader<'_, R> {
    fn next_byte(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        match self.inner.read_exact(&mut byte) {
            Ok(()) => {
                self.position += 1;
                Ok(byte[0])
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(TreeError::UnexpectedEof {
                position: self.position,
            }
            .into()),
            Err(e) => Err(e.into()),
        }
    }
}
