//! Error type for the oats command line tool.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Everything that can stop a run.
#[derive(Debug, Error)]
pub enum AppError {
    /// Codec, framing or mask failure
    #[error(transparent)]
    Codec(#[from] oats_core::Error),

    /// File system failure on a specific path
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No output name can be derived from this input name
    #[error("cannot derive an output name from {}", .0.display())]
    BadName(PathBuf),

    #[error("can't compress {}: already a .oats file", .0.display())]
    AlreadyCompressed(PathBuf),

    #[error("can only decompress .oats files, got {}", .0.display())]
    NotAnArtifact(PathBuf),

    /// Non-ASCII input while `--require-ascii` is set
    #[error("{} contains non-ASCII bytes", .0.display())]
    NotAscii(PathBuf),

    /// Stdin closed before a key was entered
    #[error("no key provided")]
    MissingKey,

    #[error("failed to install log subscriber: {0}")]
    Logging(String),
}

/// Attach a path to I/O errors.
pub trait IoContext<T> {
    fn at(self, path: &Path) -> Result<T, AppError>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at(self, path: &Path) -> Result<T, AppError> {
        self.map_err(|source| AppError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
