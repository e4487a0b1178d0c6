//! Configuration for the oats application.
//!
//! Handles parsing command-line arguments and resolving them into the single
//! `Config` the pipeline consumes.
//!
//! # Philosophy
//!
//! Every choice the pipeline makes is visible in `Config`, and
//! `--print-config` shows all of it, so runs are reproducible.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Args, Parser, Subcommand};

/// Default size of generated sample files
pub const DEFAULT_SAMPLE_SIZE: usize = 64 * 1024;

#[derive(Parser, Debug)]
#[command(name = "oats")]
#[command(version)]
#[command(about = "Compress, mask and restore files with Huffman coding", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Print resolved configuration
    #[arg(long, global = true)]
    pub print_config: bool,

    /// Don't print metrics summary
    #[arg(long, global = true)]
    pub no_metrics: bool,

    /// Write outputs here instead of next to the input
    #[arg(long, global = true)]
    pub out_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compress then mask: x.txt -> x_encoded.oats
    Pack {
        input: PathBuf,
        #[command(flatten)]
        key: KeyArgs,
        #[command(flatten)]
        compress: CompressArgs,
    },
    /// Unmask then decompress: x_encoded.oats -> x_decompressed.txt
    Unpack {
        input: PathBuf,
        #[command(flatten)]
        key: KeyArgs,
    },
    /// Compress: x.txt -> x_compressed.oats
    Compress {
        input: PathBuf,
        #[command(flatten)]
        compress: CompressArgs,
    },
    /// Decompress a .oats file -> x_decompressed.txt
    Decompress { input: PathBuf },
    /// Toggle the key mask on any file
    Mask {
        input: PathBuf,
        #[command(flatten)]
        key: KeyArgs,
    },
    /// Print the frequency and code tables of a file
    Inspect { input: PathBuf },
    /// Generate a seeded ASCII sample file
    Sample {
        /// Output path
        #[arg(long)]
        out: PathBuf,
        /// Size in bytes
        #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE)]
        size: usize,
        /// Random seed (default: time-based)
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct KeyArgs {
    /// Mask key, 1-100 bytes (prompted on stdin if omitted)
    #[arg(long)]
    pub key: Option<String>,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct CompressArgs {
    /// Write the raw layout (tree + payload, no frame header)
    #[arg(long)]
    pub raw: bool,
    /// Fail instead of warning on non-ASCII input
    #[arg(long)]
    pub require_ascii: bool,
}

/// What the run does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Pack,
    Unpack,
    Compress,
    Decompress,
    Mask,
    Inspect,
    Sample { size: usize, seed: u64 },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Pack => "pack",
            Operation::Unpack => "unpack",
            Operation::Compress => "compress",
            Operation::Decompress => "decompress",
            Operation::Mask => "mask",
            Operation::Inspect => "inspect",
            Operation::Sample { .. } => "sample",
        }
    }

    /// True if the operation applies the key mask.
    pub fn needs_key(&self) -> bool {
        matches!(self, Operation::Pack | Operation::Unpack | Operation::Mask)
    }
}

/// Where the mask key comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum KeySource {
    Given(String),
    Prompt,
}

impl std::fmt::Debug for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::Given(_) => f.write_str("Given(..)"),
            KeySource::Prompt => f.write_str("Prompt"),
        }
    }
}

/// Artifact layout written by compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Framed,
    Raw,
}

/// What to do with non-ASCII input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsciiPolicy {
    Warn,
    Require,
}

/// Complete configuration for a run.
#[derive(Debug, Clone)]
pub struct Config {
    // === Files ===
    /// File the operation reads (the file written, for `sample`)
    pub target: PathBuf,

    /// Output directory override (None = next to the input)
    pub out_dir: Option<PathBuf>,

    // === Operation ===
    pub operation: Operation,

    /// Mask key source
    pub key: KeySource,

    /// Layout for compression output
    pub layout: Layout,

    /// Non-ASCII handling for compression input
    pub ascii: AsciiPolicy,

    // === Behavior ===
    /// Log level passed to the subscriber
    pub log_level: String,

    /// Whether to print detailed config
    pub print_config: bool,

    /// Whether to print detailed metrics summary
    pub print_metrics: bool,
}

impl Config {
    /// Resolve parsed arguments into a configuration.
    ///
    /// If `sample` has no `--seed`, a time-based seed is chosen and recorded.
    pub fn from_cli(cli: Cli) -> Self {
        let mut key = KeySource::Prompt;
        let mut compress = CompressArgs {
            raw: false,
            require_ascii: false,
        };

        let (operation, target) = match cli.command {
            Command::Pack {
                input,
                key: k,
                compress: c,
            } => {
                key = key_source(k);
                compress = c;
                (Operation::Pack, input)
            }
            Command::Unpack { input, key: k } => {
                key = key_source(k);
                (Operation::Unpack, input)
            }
            Command::Compress { input, compress: c } => {
                compress = c;
                (Operation::Compress, input)
            }
            Command::Decompress { input } => (Operation::Decompress, input),
            Command::Mask { input, key: k } => {
                key = key_source(k);
                (Operation::Mask, input)
            }
            Command::Inspect { input } => (Operation::Inspect, input),
            Command::Sample { out, size, seed } => {
                let seed = seed.unwrap_or_else(time_seed);
                (Operation::Sample { size, seed }, out)
            }
        };

        Config {
            target,
            out_dir: cli.out_dir,
            operation,
            key,
            layout: if compress.raw { Layout::Raw } else { Layout::Framed },
            ascii: if compress.require_ascii {
                AsciiPolicy::Require
            } else {
                AsciiPolicy::Warn
            },
            log_level: cli.log_level,
            print_config: cli.print_config,
            print_metrics: !cli.no_metrics,
        }
    }

    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        println!("=== Configuration ===");
        println!("Operation:  {}", self.operation.name());
        println!("Target:     {}", self.target.display());
        match &self.out_dir {
            Some(dir) => println!("Output dir: {}", dir.display()),
            None => println!("Output dir: (next to input)"),
        }
        println!();

        match self.operation {
            Operation::Pack | Operation::Compress => {
                println!("=== Compression ===");
                println!("Layout: {:?}", self.layout);
                println!("ASCII policy: {:?}", self.ascii);
                println!();
            }
            Operation::Sample { size, seed } => {
                println!("=== Sample ===");
                println!("Size: {} bytes", size);
                println!("Seed: {}", seed);
                println!();
            }
            _ => {}
        }

        if self.operation.needs_key() {
            println!("=== Mask ===");
            match self.key {
                KeySource::Given(_) => println!("Key: (from --key)"),
                KeySource::Prompt => println!("Key: (prompt on stdin)"),
            }
            println!();
        }

        println!("Log level: {}", self.log_level);
        println!("Metrics: {}", if self.print_metrics { "on" } else { "off" });
        println!();
    }
}

fn key_source(args: KeyArgs) -> KeySource {
    match args.key {
        Some(key) => KeySource::Given(key),
        None => KeySource::Prompt,
    }
}

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
