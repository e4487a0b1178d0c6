//! Error types for the oats codec.
//!
//! All operations return structured errors rather than panicking.
//! Callers decide whether to abort, clean up partial output, or report.

use thiserror::Error;

/// Top-level error type for all operations in the codec.
///
/// Each variant corresponds to a specific failure domain:
/// - Bit I/O: reading/writing bits from/to byte streams
/// - Tree: parsing the serialized Huffman tree header
/// - Huffman: codec construction or encode/decode failures
/// - Framing: framed container serialization/parsing
/// - Mask: key validation for the XOR transform
/// - CRC: data corruption detected
/// - I/O: reading the source or writing the sink
#[derive(Debug, Error)]
pub enum Error {
    /// Bit I/O operation failed (e.g., reading past end of stream)
    #[error("bit I/O error: {0}")]
    BitIo(#[from] BitIoError),

    /// Serialized tree could not be turned into a usable decoding tree
    #[error("malformed tree: {0}")]
    Tree(#[from] TreeError),

    /// Huffman codec error (e.g., missing code, decode failure)
    #[error("huffman codec error: {0}")]
    Huffman(#[from] HuffmanError),

    /// Framed container error (e.g., invalid header, length mismatch)
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    /// Key mask error (e.g., empty key)
    #[error("mask error: {0}")]
    Mask(#[from] MaskError),

    /// CRC validation failed, indicating data corruption
    #[error("CRC mismatch: expected {expected:#010x}, got {actual:#010x}")]
    Crc { expected: u32, actual: u32 },

    /// Source unreadable or sink unwritable
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bit-level I/O errors.
#[derive(Debug, Error)]
pub enum BitIoError {
    /// Attempted to read past the end of the stream
    #[error("unexpected end of bit stream")]
    UnexpectedEof,

    /// Invalid bit count (e.g., more than 64 bits at once)
    #[error("invalid bit count: {0}")]
    InvalidBitCount(usize),
}

/// Tree header errors.
///
/// Every variant means the artifact is corrupted or was not produced by this
/// codec. Decompression aborts without producing output.
#[derive(Debug, Error)]
pub enum TreeError {
    /// Byte source ran out before the tree was complete
    #[error("tree header truncated at byte {position}")]
    UnexpectedEof { position: u64 },

    /// Unknown node tag
    #[error("invalid node tag {tag:#04x} at byte {position}")]
    InvalidTag { tag: u8, position: u64 },

    /// Root is a single leaf, no bit can select a path
    #[error("degenerate tree: root has no children")]
    Degenerate,

    /// Nesting exceeds what a 256-symbol alphabet can produce
    #[error("tree deeper than {max} levels")]
    TooDeep { max: usize },
}

/// Huffman codec errors.
#[derive(Debug, Error)]
pub enum HuffmanError {
    /// No symbols with non-zero frequency (cannot build a tree)
    #[error("empty frequency table: cannot build tree")]
    EmptyFrequencyTable,

    /// A byte has no entry in the code table; frequency table and tree are out of sync
    #[error("byte {byte:#04x} has no code: code table out of sync with input")]
    MissingCode { byte: u8 },

    /// Decoded length doesn't match expected length
    #[error("decoded length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: u64, actual: u64 },

    /// Bit stream ended in the middle of a code
    #[error("payload ends inside a code after {bits} bits")]
    IncompleteCode { bits: u64 },

    /// Payload bytes follow an empty-tree header
    #[error("{bytes} payload bytes follow an empty tree")]
    UnexpectedPayload { bytes: u64 },
}

/// Framed container errors.
#[derive(Debug, Error)]
pub enum FramingError {
    /// Invalid magic number in header
    #[error("invalid magic number: expected {expected:?}, got {actual:?}")]
    InvalidMagic { expected: [u8; 4], actual: [u8; 4] },

    /// Format version this build cannot read
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u8),

    /// Frame is too short to contain a valid header
    #[error("frame too short: need at least {required} bytes, got {actual}")]
    FrameTooShort { required: usize, actual: usize },

    /// Frame length doesn't match header specification
    #[error("frame length mismatch: header says {expected}, got {actual}")]
    LengthMismatch { expected: u64, actual: u64 },

    /// Tail bit count inconsistent with the payload length
    #[error("invalid tail bit count {tail_bits} for {payload_len} payload bytes")]
    InvalidTailBits { tail_bits: u8, payload_len: u64 },

    /// Tree header longer than the u16 length field allows
    #[error("tree header of {0} bytes does not fit the frame")]
    TreeTooLarge(usize),
}

/// Key mask errors.
#[derive(Debug, Error)]
pub enum MaskError {
    /// Key has no bytes
    #[error("key can't be empty")]
    EmptyKey,

    /// Key longer than the accepted maximum
    #[error("key of {len} bytes exceeds maximum {max}")]
    KeyTooLong { len: usize, max: usize },
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
