//! Sample input generation for testing.
//!
//! `oats sample` writes a file with interesting compression characteristics:
//! a mix of runs, text-like data and repeating patterns, all printable ASCII
//! so the file passes the compression pre-check.
//!
//! # Design
//!
//! Generated data has:
//! - Some highly compressible sections (runs of same character)
//! - Some moderately compressible sections (words over a skewed alphabet)
//! - Some structured sections (short repeating patterns)
//! - Some less compressible sections (uniform printable characters)
//!
//! This makes the compression behavior visible in metrics.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Largest section generated in one go
const SECTION_BYTES: usize = 4096;

/// Letters weighted roughly like English text
const TEXT_ALPHABET: &[u8] = b"eeeeeeettttttaaaaaooooiiiinnnnsssshhhrrrdddllcuumwfgypbvk";

/// Generate sample ASCII data with mixed compressibility.
///
/// # Arguments
/// - `seed`: random seed for determinism
/// - `size_bytes`: exact size of generated data
pub fn generate_sample_data(seed: u64, size_bytes: usize) -> Vec<u8> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(size_bytes);

    while data.len() < size_bytes {
        let section = (size_bytes - data.len()).min(rng.gen_range(256..=SECTION_BYTES));

        // Choose section type randomly
        match rng.gen_range(0..10u8) {
            // 20% runs of one character
            0..=1 => {
                let c = printable(&mut rng);
                data.extend(std::iter::repeat(c).take(section));
            }

            // 50% text-like words and lines
            2..=6 => push_text(&mut rng, &mut data, section),

            // 20% repeating patterns
            7..=8 => {
                let pattern = generate_pattern(&mut rng);
                data.extend(pattern.iter().cycle().take(section));
            }

            // 10% uniform printable characters
            _ => {
                for _ in 0..section {
                    data.push(printable(&mut rng));
                }
            }
        }
    }

    data.truncate(size_bytes);
    data
}

fn push_text(rng: &mut ChaCha8Rng, data: &mut Vec<u8>, section: usize) {
    let end = data.len() + section;
    let mut line_len = 0;

    while data.len() < end {
        let word_len: usize = rng.gen_range(1..=9);
        for _ in 0..word_len {
            data.push(TEXT_ALPHABET[rng.gen_range(0..TEXT_ALPHABET.len())]);
        }
        line_len += word_len + 1;

        if line_len > 72 {
            data.push(b'\n');
            line_len = 0;
        } else if rng.gen_bool(0.1) {
            data.extend_from_slice(b". ");
        } else {
            data.push(b' ');
        }
    }

    data.truncate(end);
}

/// Generate a small repeating pattern.
fn generate_pattern(rng: &mut ChaCha8Rng) -> Vec<u8> {
    let pattern_len = rng.gen_range(4..=32);
    (0..pattern_len).map(|_| printable(rng)).collect()
}

fn printable(rng: &mut ChaCha8Rng) -> u8 {
    rng.gen_range(b' '..=b'~')
}
