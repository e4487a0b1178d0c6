//! Framed artifact serialization and parsing.
//!
//! The framed layout wraps a tree header and payload with enough metadata to
//! decode exactly: the number of valid bits in the final payload byte, the
//! original length, and a CRC.
//!
//! # Frame Format (version 1)
//!
//! ```text
//! +------------------+
//! | Magic (4 bytes)  |  0x4F 0x41 0x54 0x53 ("OATS")
//! +------------------+
//! | version (1)      |  0x01
//! +------------------+
//! | tail_bits (1)    |  valid bits in last payload byte (1-8), 0 if no payload
//! +------------------+
//! | tree_len (2)     |  u16 length of tree header
//! +------------------+
//! | raw_len (8)      |  u64 original uncompressed size
//! +------------------+
//! | payload_len (8)  |  u64 packed payload length
//! +------------------+
//! | crc32 (4)        |  u32 checksum of everything
//! +------------------+
//! | tree header      |  tagged pre-order tree (tree_len bytes)
//! | (variable)       |
//! +------------------+
//! | payload          |  packed codes (payload_len bytes)
//! | (variable)       |
//! +------------------+
//! ```
//!
//! All integers are little-endian.
//!
//! # CRC Coverage
//!
//! The CRC32 covers:
//! - version, tail_bits, tree_len, raw_len, payload_len
//! - tree header
//! - payload
//!
//! # Detection
//!
//! A raw artifact starts with a tree tag (0x00-0x02), never with 'O', so
//! [`decompress_any`] can tell the layouts apart from the first byte.

use tracing::debug;

use crate::bitio::{BitPacker, BitReader, PackSummary};
use crate::code::CodeTable;
use crate::error::{FramingError, Result, TreeError};
use crate::frequency::FrequencyTable;
use crate::huffman::{self, pack_bytes, CompressStats};
use crate::tree::HuffmanTree;
use crate::tree_codec;

/// Magic number for framed artifacts: "OATS"
pub const MAGIC: [u8; 4] = [0x4F, 0x41, 0x54, 0x53];

/// Frame format version written by this build
pub const VERSION: u8 = 1;

/// Size of the frame header in bytes
pub const HEADER_SIZE: usize = 28;

/// A parsed frame with its tree decoded.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Original uncompressed data length
    pub raw_len: u64,

    /// Valid bits in the last payload byte
    pub tail_bits: u8,

    /// Decoding tree, `None` for an empty input
    pub tree: Option<HuffmanTree>,

    /// Size of the serialized tree header
    pub tree_len: u16,

    /// Packed payload
    pub payload: Vec<u8>,

    /// CRC32 checksum (for validation)
    pub crc32: u32,
}

impl Frame {
    /// Number of payload bits that carry data.
    pub fn payload_bits(&self) -> u64 {
        PackSummary {
            bytes_written: self.payload.len() as u64,
            tail_bits: self.tail_bits,
        }
        .bit_len()
    }
}

/// Serialize a frame from its parts.
///
/// # Errors
/// `FramingError::TreeTooLarge` if the tree header exceeds the u16 length field.
pub fn serialize_frame(
    raw_len: u64,
    tree_header: &[u8],
    payload: &[u8],
    tail_bits: u8,
) -> Result<Vec<u8>> {
    let tree_len: u16 = tree_header
        .len()
        .try_into()
        .map_err(|_| FramingError::TreeTooLarge(tree_header.len()))?;
    let payload_len = payload.len() as u64;

    let crc32 = compute_crc(tail_bits, tree_len, raw_len, payload_len, tree_header, payload);

    let mut frame = Vec::with_capacity(HEADER_SIZE + tree_header.len() + payload.len());

    // Write header
    frame.extend_from_slice(&MAGIC);
    frame.push(VERSION);
    frame.push(tail_bits);
    frame.extend_from_slice(&tree_len.to_le_bytes());
    frame.extend_from_slice(&raw_len.to_le_bytes());
    frame.extend_from_slice(&payload_len.to_le_bytes());
    frame.extend_from_slice(&crc32.to_le_bytes());

    // Write tree and payload
    frame.extend_from_slice(tree_header);
    frame.extend_from_slice(payload);

    Ok(frame)
}

/// Parse a framed artifact.
///
/// # Errors
/// - `FramingError::FrameTooShort` if the buffer can't hold the header
/// - `FramingError::InvalidMagic` if magic number doesn't match
/// - `FramingError::UnsupportedVersion` for any version but 1
/// - `FramingError::LengthMismatch` if the size disagrees with the header
/// - `FramingError::InvalidTailBits` if tail_bits is inconsistent with the payload
/// - `Error::Crc` if CRC validation fails
/// - `Error::Tree` if the tree header is malformed or has trailing bytes
pub fn parse_frame(bytes: &[u8]) -> Result<Frame> {
    if bytes.len() < HEADER_SIZE {
        return Err(FramingError::FrameTooShort {
            required: HEADER_SIZE,
            actual: bytes.len(),
        }
        .into());
    }

    let magic = read_array::<4>(bytes, 0);
    if magic != MAGIC {
        return Err(FramingError::InvalidMagic {
            expected: MAGIC,
            actual: magic,
        }
        .into());
    }

    let version = bytes[4];
    if version != VERSION {
        return Err(FramingError::UnsupportedVersion(version).into());
    }

    let tail_bits = bytes[5];
    let tree_len = u16::from_le_bytes(read_array(bytes, 6));
    let raw_len = u64::from_le_bytes(read_array(bytes, 8));
    let payload_len = u64::from_le_bytes(read_array(bytes, 16));
    let crc32 = u32::from_le_bytes(read_array(bytes, 24));

    // payload_len is untrusted; an overflowing sum can never match the buffer
    let expected_size = (HEADER_SIZE as u64 + tree_len as u64)
        .checked_add(payload_len)
        .unwrap_or(u64::MAX);
    if bytes.len() as u64 != expected_size {
        return Err(FramingError::LengthMismatch {
            expected: expected_size,
            actual: bytes.len() as u64,
        }
        .into());
    }

    let tail_ok = if payload_len == 0 {
        tail_bits == 0
    } else {
        (1..=8).contains(&tail_bits)
    };
    if !tail_ok {
        return Err(FramingError::InvalidTailBits {
            tail_bits,
            payload_len,
        }
        .into());
    }

    let tree_start = HEADER_SIZE;
    let tree_end = tree_start + tree_len as usize;
    let tree_header = &bytes[tree_start..tree_end];
    let payload = &bytes[tree_end..];

    let computed_crc = compute_crc(tail_bits, tree_len, raw_len, payload_len, tree_header, payload);
    if computed_crc != crc32 {
        return Err(crate::error::Error::Crc {
            expected: crc32,
            actual: computed_crc,
        });
    }

    let (tree, consumed) = tree_codec::deserialize(tree_header)?;
    if consumed != tree_header.len() {
        return Err(TreeError::InvalidTag {
            tag: tree_header[consumed],
            position: consumed as u64,
        }
        .into());
    }

    Ok(Frame {
        raw_len,
        tail_bits,
        tree,
        tree_len,
        payload: payload.to_vec(),
        crc32,
    })
}

/// Compute CRC32 over the protected fields.
fn compute_crc(
    tail_bits: u8,
    tree_len: u16,
    raw_len: u64,
    payload_len: u64,
    tree_header: &[u8],
    payload: &[u8],
) -> u32 {
    let mut hasher = crc32fast::Hasher::new();

    // Hash header fields
    hasher.update(&[VERSION, tail_bits]);
    hasher.update(&tree_len.to_le_bytes());
    hasher.update(&raw_len.to_le_bytes());
    hasher.update(&payload_len.to_le_bytes());

    // Hash tree and payload
    hasher.update(tree_header);
    hasher.update(payload);

    hasher.finalize()
}

fn read_array<const N: usize>(bytes: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[offset..offset + N]);
    out
}

/// Compress raw data into a framed artifact.
///
/// Returns the frame and the run statistics (sizes exclude the frame header).
pub fn compress_framed(raw_data: &[u8]) -> Result<(Vec<u8>, CompressStats)> {
    let freqs = FrequencyTable::from_bytes(raw_data);

    let tree = if freqs.is_empty() {
        None
    } else {
        Some(HuffmanTree::from_frequencies(&freqs)?)
    };
    let tree_header = tree_codec::serialize(tree.as_ref());

    let (payload, summary) = match &tree {
        Some(tree) => {
            let table = CodeTable::from_tree(tree);
            let mut packer = BitPacker::new(Vec::with_capacity(raw_data.len() / 2));
            pack_bytes(raw_data, &table, &mut packer)?;
            packer.finish()?
        }
        None => (
            Vec::new(),
            PackSummary {
                bytes_written: 0,
                tail_bits: 0,
            },
        ),
    };

    let frame = serialize_frame(
        raw_data.len() as u64,
        &tree_header,
        &payload,
        summary.tail_bits,
    )?;

    let stats = CompressStats {
        input_bytes: freqs.total(),
        distinct_symbols: freqs.distinct(),
        tree_bytes: tree_header.len(),
        payload: summary,
    };
    debug!(
        raw_len = raw_data.len(),
        frame_len = frame.len(),
        tail_bits = summary.tail_bits,
        "framed"
    );

    Ok((frame, stats))
}

/// Decompress a parsed frame.
///
/// Decodes exactly the recorded number of bits, so no padding reaches the output.
///
/// # Errors
/// - `HuffmanError::UnexpectedPayload` if an empty tree carries payload
/// - `HuffmanError::IncompleteCode` if the last valid bit ends inside a code
/// - `HuffmanError::LengthMismatch` if the output size differs from `raw_len`
pub fn decompress_frame(frame: &Frame) -> Result<Vec<u8>> {
    let Some(tree) = &frame.tree else {
        if !frame.payload.is_empty() {
            return Err(crate::error::HuffmanError::UnexpectedPayload {
                bytes: frame.payload.len() as u64,
            }
            .into());
        }
        return check_len(Vec::new(), frame.raw_len);
    };

    // At most one output byte per payload bit
    let mut output = Vec::with_capacity(frame.raw_len.min(frame.payload_bits()) as usize);
    let mut reader = BitReader::new(&frame.payload[..]);
    huffman::unpack(tree, &mut reader, &mut output, Some(frame.payload_bits()))?;

    check_len(output, frame.raw_len)
}

fn check_len(output: Vec<u8>, expected: u64) -> Result<Vec<u8>> {
    if output.len() as u64 != expected {
        return Err(crate::error::HuffmanError::LengthMismatch {
            expected,
            actual: output.len() as u64,
        }
        .into());
    }
    Ok(output)
}

/// Parse and decompress a framed artifact in one step.
pub fn decompress_framed(bytes: &[u8]) -> Result<Vec<u8>> {
    decompress_frame(&parse_frame(bytes)?)
}

/// True if `bytes` starts like a framed artifact.
pub fn is_framed(bytes: &[u8]) -> bool {
    bytes.first() == Some(&MAGIC[0])
}

/// Decompress either layout, choosing by the first byte.
pub fn decompress_any(bytes: &[u8]) -> Result<Vec<u8>> {
    if is_framed(bytes) {
        decompress_framed(bytes)
    } else {
        huffman::decompress(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, HuffmanError};

    fn frame_of(data: &[u8]) -> Vec<u8> {
        compress_framed(data).unwrap().0
    }

    #[test]
    fn test_serialize_parse_round_trip() {
        let raw_data = b"hello world! this is a test.";
        let frame_bytes = frame_of(raw_data);

        let frame = parse_frame(&frame_bytes).unwrap();
        assert_eq!(frame.raw_len, raw_data.len() as u64);
        assert!(frame.tree.is_some());

        let decompressed = decompress_frame(&frame).unwrap();
        assert_eq!(decompressed, raw_data);
    }

    #[test]
    fn test_aaab_exact() {
        let frame_bytes = frame_of(b"aaab");
        let frame = parse_frame(&frame_bytes).unwrap();
        assert_eq!(frame.tail_bits, 4);
        assert_eq!(frame.payload, vec![0b1110_0000]);
        assert_eq!(decompress_frame(&frame).unwrap(), b"aaab");
    }

    #[test]
    fn test_invalid_magic() {
        let mut frame_bytes = vec![0xFF, 0xFF, 0xFF, 0xFF]; // Wrong magic
        frame_bytes.extend_from_slice(&[0u8; 24]); // Rest of header

        let result = parse_frame(&frame_bytes);
        assert!(matches!(
            result,
            Err(Error::Framing(FramingError::InvalidMagic { .. }))
        ));
    }

    #[test]
    fn test_frame_too_short() {
        let frame_bytes = vec![0u8; 10]; // Less than HEADER_SIZE
        let result = parse_frame(&frame_bytes);
        assert!(matches!(
            result,
            Err(Error::Framing(FramingError::FrameTooShort { .. }))
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let mut frame_bytes = frame_of(b"versioned");
        frame_bytes[4] = 2;
        let result = parse_frame(&frame_bytes);
        assert!(matches!(
            result,
            Err(Error::Framing(FramingError::UnsupportedVersion(2)))
        ));
    }

    #[test]
    fn test_truncated_frame() {
        let frame_bytes = frame_of(b"some data to cut short");
        let result = parse_frame(&frame_bytes[..frame_bytes.len() - 1]);
        assert!(matches!(
            result,
            Err(Error::Framing(FramingError::LengthMismatch { .. }))
        ));
    }

    #[test]
    fn test_crc_mismatch() {
        let mut frame_bytes = frame_of(b"test data");

        // Corrupt a byte in the payload (near the end)
        let len = frame_bytes.len();
        frame_bytes[len - 1] ^= 0x01;

        let result = parse_frame(&frame_bytes);
        assert!(matches!(result, Err(Error::Crc { .. })));
    }

    #[test]
    fn test_invalid_tail_bits() {
        let mut frame_bytes = frame_of(b"abc");
        frame_bytes[5] = 9;
        let result = parse_frame(&frame_bytes);
        assert!(matches!(
            result,
            Err(Error::Framing(FramingError::InvalidTailBits { tail_bits: 9, .. }))
        ));
    }

    #[test]
    fn test_empty_data() {
        let frame_bytes = frame_of(b"");
        assert_eq!(frame_bytes.len(), HEADER_SIZE + 1);

        let frame = parse_frame(&frame_bytes).unwrap();
        assert!(frame.tree.is_none());
        assert_eq!(frame.tail_bits, 0);
        assert!(decompress_frame(&frame).unwrap().is_empty());
    }

    #[test]
    fn test_single_byte() {
        let frame_bytes = frame_of(b"A");
        let frame = parse_frame(&frame_bytes).unwrap();
        assert_eq!(frame.tail_bits, 1);
        assert_eq!(decompress_frame(&frame).unwrap(), b"A");
    }

    #[test]
    fn test_large_data() {
        let raw_data = vec![b'X'; 65536]; // 64 KiB of same byte

        let frame_bytes = frame_of(&raw_data);

        // One bit per byte
        assert!(frame_bytes.len() < raw_data.len() / 7);

        let decompressed = decompress_framed(&frame_bytes).unwrap();
        assert_eq!(decompressed, raw_data);
    }

    #[test]
    fn test_raw_len_mismatch() {
        let tree = HuffmanTree::from_bytes(b"ab").unwrap();
        let header = tree_codec::serialize(Some(&tree));
        // 2 valid bits decode to 2 bytes, header claims 3
        let frame_bytes = serialize_frame(3, &header, &[0b0100_0000], 2).unwrap();
        let result = decompress_framed(&frame_bytes);
        assert!(matches!(
            result,
            Err(Error::Huffman(HuffmanError::LengthMismatch { expected: 3, actual: 2 }))
        ));
    }

    #[test]
    fn test_tree_with_trailing_bytes() {
        let tree = HuffmanTree::from_bytes(b"ab").unwrap();
        let mut header = tree_codec::serialize(Some(&tree));
        header.push(0x01);
        let frame_bytes = serialize_frame(0, &header, &[], 0).unwrap();
        let result = parse_frame(&frame_bytes);
        assert!(matches!(result, Err(Error::Tree(TreeError::InvalidTag { .. }))));
    }

    fn header_with(tail_bits: u8, tree_len: u16, raw_len: u64, payload_len: u64) -> Vec<u8> {
        let mut bytes = MAGIC.to_vec();
        bytes.push(VERSION);
        bytes.push(tail_bits);
        bytes.extend_from_slice(&tree_len.to_le_bytes());
        bytes.extend_from_slice(&raw_len.to_le_bytes());
        bytes.extend_from_slice(&payload_len.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes
    }

    #[test]
    fn test_huge_payload_len_rejected() {
        // 28 + 1 + u64::MAX overflows
        let frame_bytes = header_with(8, 1, 4, u64::MAX);
        assert_eq!(frame_bytes.len(), HEADER_SIZE);
        assert!(matches!(
            parse_frame(&frame_bytes),
            Err(Error::Framing(FramingError::LengthMismatch {
                expected: u64::MAX,
                actual: 28
            }))
        ));
        assert!(decompress_any(&frame_bytes).is_err());

        let frame_bytes = header_with(8, u16::MAX, 4, u64::MAX - 100);
        assert!(matches!(
            parse_frame(&frame_bytes),
            Err(Error::Framing(FramingError::LengthMismatch { .. }))
        ));
    }

    #[test]
    fn test_huge_raw_len_does_not_reserve() {
        let tree = HuffmanTree::from_bytes(b"ab").unwrap();
        let header = tree_codec::serialize(Some(&tree));
        let frame_bytes = serialize_frame(u64::MAX, &header, &[0b0100_0000], 2).unwrap();

        let frame = parse_frame(&frame_bytes).unwrap();
        assert!(matches!(
            decompress_frame(&frame),
            Err(Error::Huffman(HuffmanError::LengthMismatch { actual: 2, .. }))
        ));
    }

    #[test]
    fn test_decompress_any_dispatch() {
        let data = b"either layout works";
        assert_eq!(decompress_any(&frame_of(data)).unwrap(), data);

        let raw = huffman::compress(b"abcdabcd").unwrap();
        assert!(!is_framed(&raw));
        assert_eq!(decompress_any(&raw).unwrap(), b"abcdabcd");
    }
}
