//! Huffman compression and decompression in the raw layout.
//!
//! # Raw Layout
//!
//! ```text
//! +---------------------+
//! | tree header         |  pre-order tagged tree (see tree_codec), no length prefix
//! +---------------------+
//! | payload             |  codes packed MSB-first, last byte zero-padded
//! +---------------------+
//! ```
//!
//! # Known Limitation
//!
//! The raw layout does not record how many bits of the final byte are real.
//! The decoder walks every bit it is given, so the 1-7 pad bits can resolve to
//! leaves and append spurious bytes to the output. Inputs whose encoded length
//! is a multiple of 8 bits decode exactly. The framed layout (see `framing`)
//! records the tail bit count and has no such gap.

use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Seek, Write};
use std::ptr;

use tracing::debug;

use crate::bitio::{BitPacker, BitReader, PackSummary, INPUT_BUFFER_SIZE, OUTPUT_BUFFER_SIZE};
use crate::code::CodeTable;
use crate::error::{BitIoError, HuffmanError, Result};
use crate::frequency::FrequencyTable;
use crate::tree::{HuffmanTree, Node};
use crate::tree_codec;

/// Outcome of a compression run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressStats {
    /// Bytes read from the source
    pub input_bytes: u64,
    /// Byte values with a non-zero count
    pub distinct_symbols: usize,
    /// Size of the serialized tree header
    pub tree_bytes: usize,
    /// Packed payload details
    pub payload: PackSummary,
}

impl CompressStats {
    /// Size of the whole artifact.
    pub fn output_bytes(&self) -> u64 {
        self.tree_bytes as u64 + self.payload.bytes_written
    }
}

/// Outcome of a decompression run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecompressStats {
    /// Size of the tree header
    pub tree_bytes: usize,
    /// Payload bits walked through the tree
    pub payload_bits: u64,
    /// Bytes written to the sink
    pub output_bytes: u64,
}

/// Compress an in-memory buffer into a raw artifact.
///
/// Empty input produces the single empty-tree byte and no payload.
pub fn compress(input: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    compress_stream(&mut io::Cursor::new(input), &mut output)?;
    Ok(output)
}

/// Compress `input` into `output` in the raw layout.
///
/// The source is read twice: once to count frequencies, then (after a rewind)
/// to pack codes. Nothing is written to `output` until counting succeeded.
///
/// # Errors
/// - `Error::Io` if the source can't be read or the sink written
/// - `HuffmanError::MissingCode` if the source changed between the two passes
pub fn compress_stream<R, W>(input: &mut R, mut output: W) -> Result<CompressStats>
where
    R: Read + Seek,
    W: Write,
{
    let freqs = FrequencyTable::from_reader(&mut *input)?;
    input.rewind()?;

    if freqs.is_empty() {
        let tree_bytes = tree_codec::write_tree(None, &mut output)?;
        output.flush()?;
        debug!("empty input, wrote empty tree");
        return Ok(CompressStats {
            input_bytes: 0,
            distinct_symbols: 0,
            tree_bytes,
            payload: PackSummary {
                bytes_written: 0,
                tail_bits: 0,
            },
        });
    }

    let tree = HuffmanTree::from_frequencies(&freqs)?;
    let table = CodeTable::from_tree(&tree);
    let tree_bytes = tree_codec::write_tree(Some(&tree), &mut output)?;

    let mut packer = BitPacker::new(output);
    let mut buffer = [0u8; INPUT_BUFFER_SIZE];
    loop {
        match input.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => pack_bytes(&buffer[..n], &table, &mut packer)?,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    let (_, payload) = packer.finish()?;

    let stats = CompressStats {
        input_bytes: freqs.total(),
        distinct_symbols: freqs.distinct(),
        tree_bytes,
        payload,
    };
    debug!(
        input_bytes = stats.input_bytes,
        symbols = stats.distinct_symbols,
        tree_bytes,
        payload_bytes = payload.bytes_written,
        tail_bits = payload.tail_bits,
        "compressed"
    );
    Ok(stats)
}

/// Append the code of every byte in `data` to `packer`.
///
/// # Errors
/// `HuffmanError::MissingCode` if a byte has no code in `table`.
pub fn pack_bytes<W: Write>(
    data: &[u8],
    table: &CodeTable,
    packer: &mut BitPacker<W>,
) -> Result<()> {
    for &byte in data {
        let code = table.get(byte).ok_or(HuffmanError::MissingCode { byte })?;
        packer.write_code(code)?;
    }
    Ok(())
}

/// Decompress a raw artifact held in memory.
///
/// # Errors
/// `Error::Tree` if the header is malformed; see [`decompress_stream`].
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    decompress_stream(bytes, &mut output)?;
    Ok(output)
}

/// Decompress a raw artifact from `input` into `output`.
///
/// The tree is parsed completely before any output is written, so a malformed
/// header leaves the sink untouched. Every payload bit is decoded, including
/// padding (see the module docs).
///
/// # Errors
/// - `Error::Tree` if the header is truncated, invalid or degenerate
/// - `HuffmanError::UnexpectedPayload` if bytes follow an empty tree
/// - `Error::Io` on read or write failure
pub fn decompress_stream<R: Read, W: Write>(input: R, output: W) -> Result<DecompressStats> {
    let mut input = BufReader::with_capacity(INPUT_BUFFER_SIZE, input);
    let (tree, tree_bytes) = {
        let mut counted = CountingReader::new(&mut input);
        let tree = tree_codec::read_tree(&mut counted)?;
        (tree, counted.count as usize)
    };

    let Some(tree) = tree else {
        let extra = io::copy(&mut input, &mut io::sink())?;
        if extra > 0 {
            return Err(HuffmanError::UnexpectedPayload { bytes: extra }.into());
        }
        return Ok(DecompressStats {
            tree_bytes,
            payload_bits: 0,
            output_bytes: 0,
        });
    };

    let mut reader = BitReader::new(input);
    let output_bytes = unpack(&tree, &mut reader, output, None)?;

    let stats = DecompressStats {
        tree_bytes,
        payload_bits: reader.position(),
        output_bytes,
    };
    debug!(
        tree_bytes,
        payload_bits = stats.payload_bits,
        output_bytes,
        "decompressed"
    );
    Ok(stats)
}

/// Decode bits from `reader` by walking `tree`, writing symbols to `output`.
///
/// With `bit_limit = None` every bit of the source is decoded and a walk left
/// unfinished at the end is dropped. With `Some(n)` exactly `n` bits are
/// decoded and the last one must complete a code.
///
/// Returns the number of bytes written.
///
/// # Errors
/// - `BitIoError::UnexpectedEof` if the source has fewer than `n` bits
/// - `HuffmanError::IncompleteCode` if bit `n` ends inside a code
pub fn unpack<R: Read, W: Write>(
    tree: &HuffmanTree,
    reader: &mut BitReader<R>,
    output: W,
    bit_limit: Option<u64>,
) -> Result<u64> {
    let mut unpacker = BitUnpacker::new(tree);
    let mut writer = BufWriter::with_capacity(OUTPUT_BUFFER_SIZE, output);
    let mut written = 0u64;
    let mut bits = 0u64;

    loop {
        if bit_limit.is_some_and(|limit| bits >= limit) {
            break;
        }
        let bit = match reader.next_bit()? {
            Some(bit) => bit,
            None if bit_limit.is_some() => return Err(BitIoError::UnexpectedEof.into()),
            None => break,
        };
        bits += 1;

        if let Some(byte) = unpacker.push_bit(bit) {
            writer.write_all(&[byte])?;
            written += 1;
        }
    }

    if bit_limit.is_some() && !unpacker.at_boundary() {
        return Err(HuffmanError::IncompleteCode { bits }.into());
    }

    writer.flush()?;
    Ok(written)
}

/// Tree walker for decompression.
///
/// Each bit moves one edge down (`0` left, `1` right). Reaching a leaf yields
/// its byte and returns the walk to the root.
#[derive(Debug, Clone)]
pub struct BitUnpacker<'t> {
    root: &'t Node,
    current: &'t Node,
}

impl<'t> BitUnpacker<'t> {
    pub fn new(tree: &'t HuffmanTree) -> Self {
        Self {
            root: tree.root(),
            current: tree.root(),
        }
    }

    /// Follow one edge; returns the decoded byte when a leaf is reached.
    pub fn push_bit(&mut self, bit: bool) -> Option<u8> {
        if let Node::Internal { left, right, .. } = self.current {
            self.current = if bit { right } else { left };
        }

        if let Node::Leaf { byte, .. } = self.current {
            self.current = self.root;
            return Some(*byte);
        }

        None
    }

    /// Feed all 8 bits of a byte, MSB first, appending decoded symbols to `out`.
    pub fn push_byte(&mut self, byte: u8, out: &mut Vec<u8>) {
        for shift in (0..8).rev() {
            if let Some(symbol) = self.push_bit((byte >> shift) & 1 == 1) {
                out.push(symbol);
            }
        }
    }

    /// True when the walk sits at the root, between codes.
    pub fn at_boundary(&self) -> bool {
        ptr::eq(self.current, self.root)
    }
}

/// Read adapter that counts bytes pulled through it.
struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R> CountingReader<R> {
    fn new(inner: R) -> Self {
        Self { inner, count: 0 }
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}
