//! oats: Huffman file compressor with a reversible key mask
//!
//! ## Usage
//!
//! ```bash
//! # Compress and mask in one go (prompts for the key)
//! oats pack notes.txt
//!
//! # Undo it
//! oats unpack notes_encoded.oats --key hunter2
//!
//! # Single stages
//! oats compress notes.txt
//! oats decompress notes_compressed.oats
//! oats mask notes_compressed.oats --key hunter2
//!
//! # Look at the code table
//! oats inspect notes.txt
//!
//! # Generate test input
//! oats sample --out sample.txt --size 100000 --seed 42
//! ```

mod config;
mod error;
mod input_gen;
mod naming;
mod pipeline;

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::{Cli, Config};
use crate::error::AppError;

fn main() -> ExitCode {
    let config = Config::from_cli(Cli::parse());

    if let Err(e) = init_logging(&config.log_level) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    if config.print_config {
        config.print();
    }

    match pipeline::run(&config) {
        Ok(metrics) => {
            if config.print_metrics {
                metrics.print_summary();
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) -> Result<(), AppError> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Logging(e.to_string()))
}
