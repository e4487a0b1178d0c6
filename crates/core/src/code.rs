//! Code table derivation.
//!
//! A depth-first walk of the tree assigns `0` to every left edge and `1` to
//! every right edge. The path to a leaf is that leaf's code. Codes are
//! prefix-free because only leaves receive one.

use std::fmt;

use crate::tree::{HuffmanTree, Node, MAX_DEPTH};

const CODE_BYTES: usize = (MAX_DEPTH + 7) / 8;

/// A variable-length bit code, stored MSB-first.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code {
    bits: [u8; CODE_BYTES],
    len: u16,
}

impl Code {
    /// The empty code.
    pub const fn empty() -> Self {
        Self {
            bits: [0; CODE_BYTES],
            len: 0,
        }
    }

    /// Copy of this code with one more bit appended.
    ///
    /// Codes never exceed `MAX_DEPTH` bits; a push beyond that is ignored.
    pub fn with_bit(mut self, bit: bool) -> Self {
        let i = self.len as usize;
        if i >= MAX_DEPTH {
            return self;
        }
        if bit {
            self.bits[i / 8] |= 1 << (7 - i % 8);
        }
        self.len += 1;
        self
    }

    /// Number of bits.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bit at position `i` (0 = first bit emitted).
    pub fn bit(&self, i: usize) -> bool {
        i < self.len() && self.bits[i / 8] & (1 << (7 - i % 8)) != 0
    }

    /// Iterate the bits in emission order.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len()).map(move |i| self.bit(i))
    }

    /// Packed bytes covering the code; the last byte's unused low bits are zero.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits[..(self.len() + 7) / 8]
    }

    /// True if `self` is a prefix of `other` (including equality).
    pub fn is_prefix_of(&self, other: &Code) -> bool {
        self.len <= other.len && (0..self.len()).all(|i| self.bit(i) == other.bit(i))
    }
}

impl Default for Code {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.iter() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl fmt::Debug for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Code({})", self)
    }
}

/// Byte value to code mapping, populated for the tree's leaves only.
#[derive(Debug, Clone)]
pub struct CodeTable {
    codes: [Option<Code>; 256],
}

impl CodeTable {
    /// Table with no codes, the result for empty input.
    pub fn empty() -> Self {
        Self { codes: [None; 256] }
    }

    /// Derive the codes of every leaf in `tree`.
    pub fn from_tree(tree: &HuffmanTree) -> Self {
        let mut table = Self::empty();
        table.assign(tree.root(), Code::empty());
        table
    }

    fn assign(&mut self, node: &Node, prefix: Code) {
        match node {
            Node::Leaf { byte, .. } => self.codes[*byte as usize] = Some(prefix),
            Node::Internal { left, right, .. } => {
                self.assign(left, prefix.with_bit(false));
                self.assign(right, prefix.with_bit(true));
            }
        }
    }

    /// Code for `byte`, if it appeared in the input.
    pub fn get(&self, byte: u8) -> Option<&Code> {
        self.codes[byte as usize].as_ref()
    }

    /// Number of populated entries.
    pub fn len(&self) -> usize {
        self.codes.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.iter().all(|c| c.is_none())
    }

    /// Iterate `(byte, code)` over populated entries in byte order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &Code)> + '_ {
        self.codes
            .iter()
            .enumerate()
            .filter_map(|(b, c)| c.as_ref().map(|c| (b as u8, c)))
    }

    /// Length of the longest code.
    pub fn max_len(&self) -> usize {
        self.iter().map(|(_, c)| c.len()).max().unwrap_or(0)
    }
}

impl Default for CodeTable {
    fn default() -> Self {
        Self::empty()
    }
}
