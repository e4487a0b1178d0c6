//! Metrics collection and reporting for a pipeline run.
//!
//! This module records what each stage did:
//! - Bytes read and written
//! - Compression ratio and codec details (symbols, tree header, tail bits)
//! - Timing information
//!
//! # Thread Safety
//!
//! The `Metrics` struct is NOT thread-safe. Runs are single-threaded and
//! update it explicitly after each stage.

use std::time::{Duration, Instant};

use crate::huffman::{CompressStats, DecompressStats};

/// Counters for one pipeline run.
#[derive(Debug, Clone)]
pub struct Metrics {
    // === Timing ===
    /// When the run started
    pub start_time: Instant,

    /// When the run ended (set on completion)
    pub end_time: Option<Instant>,

    // === Input/Output ===
    /// Bytes read from the user's input file
    pub input_bytes: u64,

    /// Bytes in the final output file
    pub output_bytes: u64,

    // === Compression ===
    /// Raw bytes fed to the compressor
    pub raw_bytes: u64,

    /// Artifact bytes (header, tree and payload)
    pub compressed_bytes: u64,

    /// Distinct byte values seen by the compressor
    pub distinct_symbols: u64,

    /// Serialized tree header size
    pub tree_bytes: u64,

    /// Valid bits in the last payload byte
    pub tail_bits: u8,

    // === Decompression ===
    /// Payload bits walked through the tree
    pub payload_bits: u64,

    /// Bytes produced by the decompressor
    pub decompressed_bytes: u64,

    // === Mask ===
    /// Bytes passed through the key mask
    pub masked_bytes: u64,

    // === Staging ===
    /// Intermediate files removed after use
    pub intermediates_removed: u64,
}

impl Metrics {
    /// Create new metrics with start time set to now.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            end_time: None,
            input_bytes: 0,
            output_bytes: 0,
            raw_bytes: 0,
            compressed_bytes: 0,
            distinct_symbols: 0,
            tree_bytes: 0,
            tail_bits: 0,
            payload_bits: 0,
            decompressed_bytes: 0,
            masked_bytes: 0,
            intermediates_removed: 0,
        }
    }

    /// Mark the run as complete.
    pub fn complete(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Get total duration (or current elapsed if not complete).
    pub fn duration(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    /// Fold in the result of a compression stage.
    ///
    /// `artifact_bytes` is the full artifact size, which includes the frame
    /// header when the framed layout is used.
    pub fn record_compress(&mut self, stats: &CompressStats, artifact_bytes: u64) {
        self.raw_bytes += stats.input_bytes;
        self.compressed_bytes += artifact_bytes;
        self.distinct_symbols = stats.distinct_symbols as u64;
        self.tree_bytes = stats.tree_bytes as u64;
        self.tail_bits = stats.payload.tail_bits;
    }

    /// Fold in the result of a decompression stage.
    pub fn record_decompress(&mut self, stats: &DecompressStats) {
        self.tree_bytes = stats.tree_bytes as u64;
        self.payload_bits += stats.payload_bits;
        self.decompressed_bytes += stats.output_bytes;
    }

    /// Compute compression ratio (compressed / raw).
    ///
    /// Returns 0.0 if no data compressed.
    pub fn compression_ratio(&self) -> f64 {
        if self.raw_bytes == 0 {
            0.0
        } else {
            self.compressed_bytes as f64 / self.raw_bytes as f64
        }
    }

    /// Average code length in bits per input byte.
    pub fn bits_per_symbol(&self) -> f64 {
        if self.raw_bytes == 0 {
            0.0
        } else {
            let payload = self.compressed_bytes.saturating_sub(self.tree_bytes);
            payload as f64 * 8.0 / self.raw_bytes as f64
        }
    }

    /// Compute throughput in bytes/second.
    pub fn throughput_bps(&self) -> f64 {
        let duration_secs = self.duration().as_secs_f64();
        if duration_secs == 0.0 {
            0.0
        } else {
            self.input_bytes as f64 / duration_secs
        }
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        let duration_ms = self.duration().as_millis();

        println!("\n=== Run Summary ===");
        println!("Duration: {} ms", duration_ms);
        println!("Input:  {} bytes", self.input_bytes);
        println!("Output: {} bytes", self.output_bytes);
        println!();

        if self.raw_bytes > 0 || self.compressed_bytes > 0 {
            println!("=== Compression ===");
            println!("Raw bytes: {}", self.raw_bytes);
            println!("Compressed: {}", self.compressed_bytes);
            println!("Ratio: {:.1}%", self.compression_ratio() * 100.0);
            println!("Symbols: {}", self.distinct_symbols);
            println!("Tree header: {} bytes", self.tree_bytes);
            println!("Tail bits: {}", self.tail_bits);
            println!();
        }

        if self.decompressed_bytes > 0 || self.payload_bits > 0 {
            println!("=== Decompression ===");
            println!("Payload bits: {}", self.payload_bits);
            println!("Decompressed: {} bytes", self.decompressed_bytes);
            println!();
        }

        if self.masked_bytes > 0 {
            println!("=== Mask ===");
            println!("Masked: {} bytes", self.masked_bytes);
            println!();
        }

        println!("=== Performance ===");
        println!("Throughput: {:.2} MB/s", self.throughput_bps() / 1_000_000.0);
        println!();
    }

    /// Export metrics as a simple text format (for parsing/testing).
    pub fn export_text(&self) -> String {
        format!(
            "duration_ms={}\n\
             input_bytes={}\n\
             output_bytes={}\n\
             raw_bytes={}\n\
             compressed_bytes={}\n\
             compression_ratio={:.4}\n\
             distinct_symbols={}\n\
             tree_bytes={}\n\
             tail_bits={}\n\
             decompressed_bytes={}\n\
             masked_bytes={}\n\
             intermediates_removed={}\n",
            self.duration().as_millis(),
            self.input_bytes,
            self.output_bytes,
            self.raw_bytes,
            self.compressed_bytes,
            self.compression_ratio(),
            self.distinct_symbols,
            self.tree_bytes,
            self.tail_bits,
            self.decompressed_bytes,
            self.masked_bytes,
            self.intermediates_removed,
        )
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitio::PackSummary;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new();
        assert!(metrics.end_time.is_none());
        assert!(metrics.duration().as_millis() < 100); // Should be recent
    }

    #[test]
    fn test_compression_ratio() {
        let mut metrics = Metrics::new();
        metrics.raw_bytes = 1000;
        metrics.compressed_bytes = 750;

        assert_eq!(metrics.compression_ratio(), 0.75);
    }

    #[test]
    fn test_record_compress() {
        let mut metrics = Metrics::new();
        let stats = CompressStats {
            input_bytes: 400,
            distinct_symbols: 4,
            tree_bytes: 11,
            payload: PackSummary {
                bytes_written: 100,
                tail_bits: 8,
            },
        };
        metrics.record_compress(&stats, 111);

        assert_eq!(metrics.raw_bytes, 400);
        assert_eq!(metrics.compressed_bytes, 111);
        assert_eq!(metrics.distinct_symbols, 4);
        assert_eq!(metrics.bits_per_symbol(), 2.0);
    }

    #[test]
    fn test_record_decompress() {
        let mut metrics = Metrics::new();
        metrics.record_decompress(&DecompressStats {
            tree_bytes: 5,
            payload_bits: 16,
            output_bytes: 16,
        });
        assert_eq!(metrics.payload_bits, 16);
        assert_eq!(metrics.decompressed_bytes, 16);
    }

    #[test]
    fn test_throughput() {
        let mut metrics = Metrics::new();
        metrics.input_bytes = 1_000_000;

        std::thread::sleep(Duration::from_millis(10));
        metrics.complete();

        let throughput = metrics.throughput_bps();
        assert!(throughput > 0.0);
    }

    #[test]
    fn test_export_text() {
        let mut metrics = Metrics::new();
        metrics.input_bytes = 1000;
        metrics.output_bytes = 420;
        metrics.masked_bytes = 420;

        let text = metrics.export_text();
        assert!(text.contains("input_bytes=1000"));
        assert!(text.contains("output_bytes=420"));
        assert!(text.contains("masked_bytes=420"));
    }
}
