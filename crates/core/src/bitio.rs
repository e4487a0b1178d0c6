//! Bit-level I/O over byte sinks and sources.
//!
//! [`BitPacker`] turns Huffman codes into bytes for a writer; [`BitReader`]
//! hands out the bits of a reader one at a time. Both work MSB-first.
//!
//! # Padding Rules
//! - BitPacker: shifts a final partial byte left and pads it with zero bits
//! - BitReader: returns padding bits like any other (caller tracks the valid count)
//!
//! # Example
//! ```
//! use oats_core::bitio::{BitPacker, BitReader};
//!
//! let mut packer = BitPacker::new(Vec::<u8>::new());
//! packer.write_bits(0b101, 3).unwrap();  // Write 3 bits: 1, 0, 1
//! packer.write_bits(0b11, 2).unwrap();   // Write 2 bits: 1, 1
//! // Total: 10111 -> padded to 10111000
//!
//! let (bytes, summary) = packer.finish().unwrap();
//! assert_eq!(bytes, vec![0b1011_1000]);
//! assert_eq!(summary.tail_bits, 5);
//!
//! let mut reader = BitReader::new(&bytes[..]);
//! assert_eq!(reader.read_bits(3).unwrap(), 0b101);
//! assert_eq!(reader.read_bits(2).unwrap(), 0b11);
//! ```

use std::io::{ErrorKind, Read, Write};

use crate::code::Code;
use crate::error::{BitIoError, Result};

/// Bytes collected before a write to the sink.
pub const OUTPUT_BUFFER_SIZE: usize = 1024;

/// Bytes pulled from the source per read.
pub const INPUT_BUFFER_SIZE: usize = 1024;

/// What a finished [`BitPacker`] produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackSummary {
    /// Bytes written to the sink, including the padded final byte
    pub bytes_written: u64,
    /// Valid bits in the final byte (1-8), or 0 if nothing was written
    pub tail_bits: u8,
}

impl PackSummary {
    /// Number of meaningful bits in the packed output.
    pub fn bit_len(&self) -> u64 {
        if self.bytes_written == 0 {
            0
        } else {
            (self.bytes_written - 1) * 8 + self.tail_bits as u64
        }
    }
}

/// Packs bits MSB-first and writes them to a sink in batches.
///
/// # Invariants
/// - `bit_count` is always < 8 between calls
/// - `buffer` is flushed to the sink whenever it reaches its capacity
#[derive(Debug)]
pub struct BitPacker<W: Write> {
    sink: W,
    /// Completed bytes not yet handed to the sink
    buffer: Vec<u8>,
    capacity: usize,
    /// Accumulator for the current partial byte (LSB-aligned)
    bit_buffer: u8,
    /// Number of bits in bit_buffer (0-7)
    bit_count: u8,
    /// Bytes already written to the sink
    flushed: u64,
}

impl<W: Write> BitPacker<W> {
    /// Create a packer with the default batching capacity.
    pub fn new(sink: W) -> Self {
        Self::with_capacity(sink, OUTPUT_BUFFER_SIZE)
    }

    /// Create a packer that writes to `sink` every `capacity` bytes.
    pub fn with_capacity(sink: W, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            sink,
            buffer: Vec::with_capacity(capacity),
            capacity,
            bit_buffer: 0,
            bit_count: 0,
            flushed: 0,
        }
    }

    /// Append a single bit.
    pub fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.bit_buffer = (self.bit_buffer << 1) | bit as u8;
        self.bit_count += 1;

        if self.bit_count == 8 {
            let byte = self.bit_buffer;
            self.bit_buffer = 0;
            self.bit_count = 0;
            self.push_byte(byte)?;
        }

        Ok(())
    }

    /// Append the low `count` bits of `value`, most significant first.
    ///
    /// # Errors
    /// Returns `BitIoError::InvalidBitCount` if count > 64.
    pub fn write_bits(&mut self, value: u64, count: usize) -> Result<()> {
        if count > 64 {
            return Err(BitIoError::InvalidBitCount(count).into());
        }

        for shift in (0..count).rev() {
            self.write_bit((value >> shift) & 1 == 1)?;
        }

        Ok(())
    }

    /// Append every bit of a Huffman code.
    pub fn write_code(&mut self, code: &Code) -> Result<()> {
        let full = code.len() / 8;
        let bytes = code.as_bytes();

        for &byte in &bytes[..full] {
            if self.bit_count == 0 {
                self.push_byte(byte)?;
            } else {
                self.write_bits(byte as u64, 8)?;
            }
        }

        let rest = code.len() % 8;
        if rest > 0 {
            self.write_bits((bytes[full] >> (8 - rest)) as u64, rest)?;
        }

        Ok(())
    }

    /// Number of bits accepted so far.
    pub fn bit_len(&self) -> u64 {
        (self.flushed + self.buffer.len() as u64) * 8 + self.bit_count as u64
    }

    /// Pad the partial byte, flush everything and return the sink.
    pub fn finish(mut self) -> Result<(W, PackSummary)> {
        let mut tail_bits = if self.bit_len() == 0 { 0 } else { 8 };

        if self.bit_count > 0 {
            tail_bits = self.bit_count;
            let byte = self.bit_buffer << (8 - self.bit_count);
            self.bit_buffer = 0;
            self.bit_count = 0;
            self.push_byte(byte)?;
        }

        self.flush_buffer()?;
        self.sink.flush()?;

        let summary = PackSummary {
            bytes_written: self.flushed,
            tail_bits,
        };
        Ok((self.sink, summary))
    }

    fn push_byte(&mut self, byte: u8) -> Result<()> {
        self.buffer.push(byte);
        if self.buffer.len() >= self.capacity {
            self.flush_buffer()?;
        }
        Ok(())
    }

    fn flush_buffer(&mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            self.sink.write_all(&self.buffer)?;
            self.flushed += self.buffer.len() as u64;
            self.buffer.clear();
        }
        Ok(())
    }
}

/// Reads bits MSB-first from a byte source.
///
/// Padding bits at the end of the source are not distinguishable from data;
/// callers that know the valid bit count must stop on their own.
#[derive(Debug)]
pub struct BitReader<R: Read> {
    source: R,
    buffer: Box<[u8]>,
    /// Valid bytes in buffer
    filled: usize,
    /// Next bit to hand out within buffer (0 = MSB of buffer[0])
    bit_position: usize,
    /// Bits handed out so far
    consumed: u64,
}

impl<R: Read> BitReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            buffer: vec![0u8; INPUT_BUFFER_SIZE].into_boxed_slice(),
            filled: 0,
            bit_position: 0,
            consumed: 0,
        }
    }

    /// Next bit, or `None` once the source is exhausted.
    pub fn next_bit(&mut self) -> Result<Option<bool>> {
        if self.bit_position >= self.filled * 8 && !self.refill()? {
            return Ok(None);
        }

        let byte = self.buffer[self.bit_position / 8];
        let bit = byte & (1 << (7 - self.bit_position % 8)) != 0;
        self.bit_position += 1;
        self.consumed += 1;
        Ok(Some(bit))
    }

    /// Read a single bit, failing at end of input.
    pub fn read_bit(&mut self) -> Result<bool> {
        self.next_bit()?
            .ok_or_else(|| BitIoError::UnexpectedEof.into())
    }

    /// Read up to 64 bits as an integer, first bit most significant.
    ///
    /// # Errors
    /// - `BitIoError::InvalidBitCount` if count > 64
    /// - `BitIoError::UnexpectedEof` if the source ends first
    pub fn read_bits(&mut self, count: usize) -> Result<u64> {
        if count > 64 {
            return Err(BitIoError::InvalidBitCount(count).into());
        }

        let mut result = 0u64;
        for _ in 0..count {
            result = (result << 1) | self.read_bit()? as u64;
        }
        Ok(result)
    }

    /// Bits handed out so far.
    pub fn position(&self) -> u64 {
        self.consumed
    }

    fn refill(&mut self) -> Result<bool> {
        loop {
            match self.source.read(&mut self.buffer) {
                Ok(0) => return Ok(false),
                Ok(n) => {
                    self.filled = n;
                    self.bit_position = 0;
                    return Ok(true);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack(f: impl FnOnce(&mut BitPacker<Vec<u8>>)) -> (Vec<u8>, PackSummary) {
        let mut packer = BitPacker::new(Vec::<u8>::new());
        f(&mut packer);
        packer.finish().unwrap()
    }

    #[test]
    fn test_write_read_single_byte() {
        let (bytes, summary) = pack(|p| p.write_bits(0b10110011, 8).unwrap());
        assert_eq!(bytes, vec![0b10110011]);
        assert_eq!(summary.tail_bits, 8);

        let mut reader = BitReader::new(&bytes[..]);
        assert_eq!(reader.read_bits(8).unwrap(), 0b10110011);
    }

    #[test]
    fn test_write_read_partial_bits() {
        let (bytes, _) = pack(|p| {
            p.write_bits(0b101, 3).unwrap();
            p.write_bits(0b11, 2).unwrap();
            p.write_bits(0b000, 3).unwrap();
        });
        assert_eq!(bytes, vec![0b10111000]);

        let mut reader = BitReader::new(&bytes[..]);
        assert_eq!(reader.read_bits(3).unwrap(), 0b101);
        assert_eq!(reader.read_bits(2).unwrap(), 0b11);
        assert_eq!(reader.read_bits(3).unwrap(), 0b000);
    }

    #[test]
    fn test_padding() {
        let (bytes, summary) = pack(|p| p.write_bit(true).unwrap());
        assert_eq!(bytes, vec![0b10000000]);
        assert_eq!(summary.tail_bits, 1);
        assert_eq!(summary.bit_len(), 1);
    }

    #[test]
    fn test_nothing_written() {
        let (bytes, summary) = pack(|p| p.write_bits(0xFF, 0).unwrap());
        assert!(bytes.is_empty());
        assert_eq!(summary, PackSummary { bytes_written: 0, tail_bits: 0 });
        assert_eq!(summary.bit_len(), 0);
    }

    #[test]
    fn test_write_code_unaligned() {
        let mut code = Code::empty();
        for bit in [true, true, false, true, false, false, true, true, true, false] {
            code = code.with_bit(bit);
        }
        let (bytes, summary) = pack(|p| {
            p.write_bit(false).unwrap();
            p.write_code(&code).unwrap();
        });
        // 0 + 1101001110 = 01101001 110(00000)
        assert_eq!(bytes, vec![0b0110_1001, 0b1100_0000]);
        assert_eq!(summary.tail_bits, 3);
    }

    #[test]
    fn test_batches_reach_sink() {
        let mut packer = BitPacker::with_capacity(Vec::<u8>::new(), 4);
        for _ in 0..10 {
            packer.write_bits(0xAB, 8).unwrap();
        }
        assert_eq!(packer.bit_len(), 80);
        let (bytes, summary) = packer.finish().unwrap();
        assert_eq!(bytes, vec![0xAB; 10]);
        assert_eq!(summary.bytes_written, 10);
    }

    #[test]
    fn test_read_past_end() {
        let data = [0b10101010];
        let mut reader = BitReader::new(&data[..]);

        assert_eq!(reader.read_bits(8).unwrap(), 0b10101010);
        assert!(reader.read_bits(1).is_err());
        assert_eq!(reader.next_bit().unwrap(), None);
    }

    #[test]
    fn test_reader_crosses_refills() {
        let data: Vec<u8> = (0..3000u32).map(|i| i as u8).collect();
        let mut reader = BitReader::new(&data[..]);
        for expected in &data {
            assert_eq!(reader.read_bits(8).unwrap(), *expected as u64);
        }
        assert_eq!(reader.position(), 3000 * 8);
        assert_eq!(reader.next_bit().unwrap(), None);
    }

    #[test]
    fn test_64_bit_values() {
        let val = 0x123456789ABCDEF0u64;
        let (bytes, _) = pack(|p| p.write_bits(val, 64).unwrap());

        let mut reader = BitReader::new(&bytes[..]);
        assert_eq!(reader.read_bits(64).unwrap(), val);
    }

    #[test]
    fn test_invalid_bit_count() {
        let mut packer = BitPacker::new(Vec::<u8>::new());
        assert!(packer.write_bits(0, 65).is_err());

        let mut reader = BitReader::new(&[0u8; 16][..]);
        assert!(reader.read_bits(65).is_err());
    }
}
