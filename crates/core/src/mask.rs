//! Reversible key mask.
//!
//! Each byte is XORed with a single-bit mask chosen by the key:
//! byte `i` flips bit `key[i % key.len()] % 8`. Applying the same key twice
//! restores the input. This is obfuscation, not encryption.

use std::io::{ErrorKind, Read, Write};

use crate::error::{MaskError, Result};

/// Longest accepted key, in bytes.
pub const MAX_KEY_LEN: usize = 100;

/// Bytes processed per read when streaming.
pub const CHUNK_SIZE: usize = 1024;

/// A validated mask key.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMask {
    key: Vec<u8>,
}

impl KeyMask {
    /// Validate a key.
    ///
    /// # Errors
    /// - `MaskError::EmptyKey` for an empty key
    /// - `MaskError::KeyTooLong` beyond [`MAX_KEY_LEN`] bytes
    pub fn new(key: impl AsRef<[u8]>) -> Result<Self> {
        let key = key.as_ref();
        if key.is_empty() {
            return Err(MaskError::EmptyKey.into());
        }
        if key.len() > MAX_KEY_LEN {
            return Err(MaskError::KeyTooLong {
                len: key.len(),
                max: MAX_KEY_LEN,
            }
            .into());
        }
        Ok(Self { key: key.to_vec() })
    }

    /// Bit mask applied at stream position `position`.
    pub fn mask_at(&self, position: u64) -> u8 {
        let k = self.key[(position % self.key.len() as u64) as usize];
        1 << (k % 8)
    }

    /// Mask `data` in place, treating `data[0]` as stream position `offset`.
    pub fn apply(&self, data: &mut [u8], offset: u64) {
        for (i, byte) in data.iter_mut().enumerate() {
            *byte ^= self.mask_at(offset + i as u64);
        }
    }

    /// Mask everything from `reader` into `writer`, returning the byte count.
    pub fn apply_stream<R: Read, W: Write>(&self, mut reader: R, mut writer: W) -> Result<u64> {
        let mut buffer = [0u8; CHUNK_SIZE];
        let mut position = 0u64;

        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            self.apply(&mut buffer[..n], position);
            writer.write_all(&buffer[..n])?;
            position += n as u64;
        }

        writer.flush()?;
        Ok(position)
    }
}

impl std::fmt::Debug for KeyMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMask")
            .field("key_len", &self.key.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_single_bit_masks() {
        let mask = KeyMask::new("ab").unwrap();
        // 'a' = 97, 97 % 8 = 1; 'b' = 98, 98 % 8 = 2
        assert_eq!(mask.mask_at(0), 0b0000_0010);
        assert_eq!(mask.mask_at(1), 0b0000_0100);
        assert_eq!(mask.mask_at(2), 0b0000_0010);
    }

    #[test]
    fn test_self_inverse() {
        let mask = KeyMask::new("s3cret").unwrap();
        let original = b"the quick brown fox".to_vec();
        let mut data = original.clone();
        mask.apply(&mut data, 0);
        assert_ne!(data, original);
        mask.apply(&mut data, 0);
        assert_eq!(data, original);
    }

    #[test]
    fn test_stream_matches_in_place() {
        let mask = KeyMask::new("longer key with spaces").unwrap();
        let input: Vec<u8> = (0..5000u32).map(|i| (i * 7) as u8).collect();

        let mut streamed: Vec<u8> = Vec::new();
        let n = mask.apply_stream(&input[..], &mut streamed).unwrap();
        assert_eq!(n, 5000);

        let mut in_place = input.clone();
        mask.apply(&mut in_place, 0);
        assert_eq!(streamed, in_place);
    }

    #[test]
    fn test_key_validation() {
        assert!(matches!(
            KeyMask::new(""),
            Err(Error::Mask(MaskError::EmptyKey))
        ));
        assert!(matches!(
            KeyMask::new(vec![b'k'; MAX_KEY_LEN + 1]),
            Err(Error::Mask(MaskError::KeyTooLong { .. }))
        ));
        assert!(KeyMask::new(vec![b'k'; MAX_KEY_LEN]).is_ok());
    }

    #[test]
    fn test_debug_hides_key() {
        let mask = KeyMask::new("hunter2").unwrap();
        assert!(!format!("{:?}", mask).contains("hunter2"));
    }
}
