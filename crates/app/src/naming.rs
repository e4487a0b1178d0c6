//! Output file naming.
//!
//! Every stage derives its output name from its input name:
//!
//! ```text
//! notes.txt                -> notes_compressed.oats      (compress)
//! notes_compressed.oats   <-> notes_encoded.oats         (mask)
//! notes.bin               <-> notes_encoded.bin          (mask, other files)
//! notes_encoded.oats       -> notes_decompressed.txt     (decompress)
//! notes_compressed.oats    -> notes_decompressed.txt     (decompress)
//! ```
//!
//! Only the file name changes; the directory part is kept. Extensions are
//! split at the last '.'.

use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Extension of compressed artifacts.
pub const ARTIFACT_EXT: &str = "oats";

const COMPRESSED_SUFFIX: &str = "_compressed.oats";
const ENCODED_ARTIFACT_SUFFIX: &str = "_encoded.oats";
const ENCODED_MARK: &str = "_encoded";
const DECOMPRESSED_SUFFIX: &str = "_decompressed.txt";

/// True if `path` has the `.oats` extension.
pub fn is_artifact(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == ARTIFACT_EXT)
}

/// `stem.ext` -> `stem_compressed.oats`, `name` -> `name_compressed.oats`.
pub fn compressed_name(path: &Path) -> Result<PathBuf, AppError> {
    let name = file_name(path)?;
    let stem = match split_ext(name) {
        Some((stem, _)) => stem,
        None => name,
    };
    Ok(path.with_file_name(format!("{}{}", stem, COMPRESSED_SUFFIX)))
}

/// Toggle the encoded marker.
///
/// Artifacts swap `_compressed.oats` and `_encoded.oats`. Any other file gains
/// `_encoded` before its extension, or loses it if already present.
pub fn encoded_name(path: &Path) -> Result<PathBuf, AppError> {
    let name = file_name(path)?;

    let renamed = if let Some(stem) = name.strip_suffix(COMPRESSED_SUFFIX) {
        format!("{}{}", stem, ENCODED_ARTIFACT_SUFFIX)
    } else if let Some(stem) = name.strip_suffix(ENCODED_ARTIFACT_SUFFIX) {
        format!("{}{}", stem, COMPRESSED_SUFFIX)
    } else {
        let (stem, ext) = split_ext(name).unwrap_or((name, ""));
        match stem.strip_suffix(ENCODED_MARK) {
            Some(original) if !original.is_empty() => format!("{}{}", original, ext),
            _ => format!("{}{}{}", stem, ENCODED_MARK, ext),
        }
    };

    Ok(path.with_file_name(renamed))
}

/// `*_encoded.oats` or `*_compressed.oats` -> `*_decompressed.txt`.
pub fn decompressed_name(path: &Path) -> Result<PathBuf, AppError> {
    let name = file_name(path)?;
    let stem = name
        .strip_suffix(ENCODED_ARTIFACT_SUFFIX)
        .or_else(|| name.strip_suffix(COMPRESSED_SUFFIX))
        .ok_or_else(|| AppError::BadName(path.to_path_buf()))?;
    Ok(path.with_file_name(format!("{}{}", stem, DECOMPRESSED_SUFFIX)))
}

/// Move `path` into `dir` when an output directory override is set.
pub fn relocate(path: PathBuf, dir: Option<&Path>) -> PathBuf {
    match (dir, path.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => path,
    }
}

fn file_name(path: &Path) -> Result<&str, AppError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::BadName(path.to_path_buf()))
}

/// Split at the last '.', keeping the dot with the extension.
/// Dotfiles like `.profile` have no extension.
fn split_ext(name: &str) -> Option<(&str, &str)> {
    match name.rfind('.') {
        Some(0) | None => None,
        Some(i) => Some((&name[..i], &name[i..])),
    }
}
