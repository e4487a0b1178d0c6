//! oats-core: Huffman compression with a reversible key mask
//!
//! This library provides the core components for a file tool that:
//! - Builds a Huffman code from byte frequencies with deterministic tie-breaking
//! - Packs codes behind a self-describing tree header
//! - Wraps artifacts in a checksummed frame that decodes exactly
//! - Applies a key-derived single-bit XOR mask that undoes itself
//!
//! # Architecture
//!
//! The system is designed around clear module boundaries:
//! - `frequency`: Byte occurrence counts
//! - `heap`: Array-backed binary min-heap
//! - `tree`: Huffman tree construction
//! - `code`: Per-symbol bit codes
//! - `tree_codec`: Tagged pre-order tree header
//! - `bitio`: Low-level bit packing and reading
//! - `huffman`: Raw-layout compression and decompression
//! - `framing`: Framed layout (version 1)
//! - `mask`: Key mask transform
//! - `metrics`: Observable run behavior
//!
//! # Design Principles
//!
//! - **No panics**: All errors are structured and recoverable
//! - **Deterministic**: Identical input always yields identical output
//! - **Bounded buffers**: Streaming stages work in 1 KiB chunks
//!
//! # Example
//!
//! ```
//! use oats_core::{compress_framed, decompress_any};
//!
//! let (artifact, stats) = compress_framed(b"aaab").unwrap();
//! assert_eq!(stats.distinct_symbols, 2);
//! assert_eq!(decompress_any(&artifact).unwrap(), b"aaab");
//! ```

pub mod bitio;
pub mod code;
pub mod error;
pub mod framing;
pub mod frequency;
pub mod heap;
pub mod huffman;
pub mod mask;
pub mod metrics;
pub mod tree;
pub mod tree_codec;

// Re-export commonly used types
pub use code::{Code, CodeTable};
pub use error::{Error, Result};
pub use framing::{compress_framed, decompress_any, decompress_framed, is_framed, parse_frame};
pub use frequency::FrequencyTable;
pub use huffman::{compress, compress_stream, decompress, decompress_stream, CompressStats, DecompressStats};
pub use mask::KeyMask;
pub use metrics::Metrics;
pub use tree::HuffmanTree;
