//! Byte frequency analysis.
//!
//! A [`FrequencyTable`] holds one counter per possible byte value. It is the
//! first stage of compression: the tree builder only sees symbols whose count
//! is non-zero.

use std::io::{ErrorKind, Read};

use crate::error::Result;

/// Size of the read buffer used when scanning a byte source.
pub const READ_CHUNK_SIZE: usize = 1024;

/// Occurrence counts for each of the 256 byte values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: [u64; 256],
}

impl FrequencyTable {
    /// Create a table with every count at zero.
    pub fn new() -> Self {
        Self { counts: [0; 256] }
    }

    /// Count the bytes of an in-memory buffer.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut table = Self::new();
        table.update(data);
        table
    }

    /// Count every byte of `reader`, reading it exactly once.
    ///
    /// # Errors
    /// Propagates any I/O error from the source. Interrupted reads are retried.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut table = Self::new();
        let mut buffer = [0u8; READ_CHUNK_SIZE];

        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => table.update(&buffer[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(table)
    }

    /// Add the bytes of `data` to the counts.
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.counts[byte as usize] += 1;
        }
    }

    /// Count recorded for `byte`.
    pub fn count(&self, byte: u8) -> u64 {
        self.counts[byte as usize]
    }

    /// Total number of bytes counted.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Number of byte values with a non-zero count.
    pub fn distinct(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    /// True if no byte has been counted.
    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }

    /// Iterate `(byte, count)` over the non-zero entries in byte order.
    pub fn symbols(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, c)| **c > 0)
            .map(|(b, &c)| (b as u8, c))
    }
}

impl Default for FrequencyTable {
    fn default() -> Self {
        Self::new()
    }
}

impl From<[u64; 256]> for FrequencyTable {
    fn from(counts: [u64; 256]) -> Self {
        Self { counts }
    }
}
