//! File pipeline: runs one operation end to end.
//!
//! ```text
//! pack:       x.txt --compress--> [staged] --mask--> x_encoded.oats
//! unpack:     x_encoded.oats --mask--> [staged] --decompress--> x_decompressed.txt
//! compress:   x.txt --> x_compressed.oats
//! decompress: x_compressed.oats | x_encoded.oats --> x_decompressed.txt
//! mask:       any file <--> its encoded name
//! ```
//!
//! # Staging
//!
//! Every output is first written to a temporary file in the destination
//! directory and renamed into place only after its stage succeeded, so a
//! failed run never leaves a partial output behind. The intermediate of a
//! two-stage operation lives only as such a temporary file and is removed
//! when the run ends. User files are never deleted.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use oats_core::framing::{decompress_frame, is_framed, parse_frame};
use oats_core::{
    compress_framed, compress_stream, decompress_stream, CodeTable, DecompressStats,
    FrequencyTable, HuffmanTree, KeyMask, Metrics,
};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::{AsciiPolicy, Config, KeySource, Layout, Operation};
use crate::error::{AppError, IoContext};
use crate::input_gen;
use crate::naming;

/// Run the configured operation and return its metrics.
pub fn run(config: &Config) -> Result<Metrics, AppError> {
    let mut metrics = Metrics::new();
    let target = config.target.as_path();

    let output = match config.operation {
        Operation::Compress => {
            check_compressible(config, target)?;
            let dest = destination(config, naming::compressed_name(target)?);
            let mut staged = stage(&dest)?;
            compress_into(config.layout, target, &mut staged, &mut metrics)?;
            commit(staged, &dest)?;
            Some(dest)
        }

        Operation::Decompress => {
            check_artifact(target)?;
            let dest = destination(config, naming::decompressed_name(target)?);
            let mut staged = stage(&dest)?;
            decompress_into(target, &mut staged, &mut metrics)?;
            commit(staged, &dest)?;
            Some(dest)
        }

        Operation::Mask => {
            let dest = destination(config, naming::encoded_name(target)?);
            let mask = resolve_key(&config.key)?;
            let mut staged = stage(&dest)?;
            mask_into(&mask, target, &mut staged, &mut metrics)?;
            commit(staged, &dest)?;
            Some(dest)
        }

        Operation::Pack => {
            check_compressible(config, target)?;
            let compressed = naming::compressed_name(target)?;
            let dest = destination(config, naming::encoded_name(&compressed)?);
            let mask = resolve_key(&config.key)?;

            let mut intermediate = stage(&dest)?;
            compress_into(config.layout, target, &mut intermediate, &mut metrics)?;

            let mut staged = stage(&dest)?;
            mask_into(&mask, intermediate.path(), &mut staged, &mut metrics)?;
            discard(intermediate, &mut metrics)?;
            commit(staged, &dest)?;
            Some(dest)
        }

        Operation::Unpack => {
            check_artifact(target)?;
            let dest = destination(config, naming::decompressed_name(target)?);
            let mask = resolve_key(&config.key)?;

            let mut intermediate = stage(&dest)?;
            mask_into(&mask, target, &mut intermediate, &mut metrics)?;

            let mut staged = stage(&dest)?;
            decompress_into(intermediate.path(), &mut staged, &mut metrics)?;
            discard(intermediate, &mut metrics)?;
            commit(staged, &dest)?;
            Some(dest)
        }

        Operation::Inspect => {
            let data = fs::read(target).at(target)?;
            metrics.input_bytes = data.len() as u64;
            let stdout = io::stdout();
            write_inspection(&data, &mut stdout.lock()).at(target)?;
            None
        }

        Operation::Sample { size, seed } => {
            let data = input_gen::generate_sample_data(seed, size);
            let mut staged = stage(target)?;
            staged.write_all(&data).at(staged.path())?;
            commit(staged, target)?;
            info!(path = %target.display(), size, seed, "sample written");
            Some(target.to_path_buf())
        }
    };

    if let Some(dest) = &output {
        metrics.output_bytes = fs::metadata(dest).at(dest)?.len();
        info!(
            operation = config.operation.name(),
            output = %dest.display(),
            bytes = metrics.output_bytes,
            "done"
        );
    }

    metrics.complete();
    Ok(metrics)
}

/// True iff every byte of the file is at most 127.
pub fn is_ascii_file(path: &Path) -> io::Result<bool> {
    let mut reader = BufReader::new(File::open(path)?);
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(true);
        }
        if !buf.is_ascii() {
            return Ok(false);
        }
        let n = buf.len();
        reader.consume(n);
    }
}

/// Read a key from the first line of `reader`.
pub fn read_key<R: BufRead>(mut reader: R) -> Result<KeyMask, AppError> {
    let mut line = String::new();
    let n = reader.read_line(&mut line).map_err(|source| AppError::Io {
        path: PathBuf::from("<stdin>"),
        source,
    })?;
    if n == 0 {
        return Err(AppError::MissingKey);
    }
    let key = line.trim_end_matches(['\r', '\n']);
    Ok(KeyMask::new(key)?)
}

/// Print frequency and code tables.
pub fn write_inspection<W: Write>(data: &[u8], out: &mut W) -> io::Result<()> {
    let freqs = FrequencyTable::from_bytes(data);
    writeln!(out, "=== Frequencies ===")?;
    writeln!(out, "Total: {} bytes, {} distinct", freqs.total(), freqs.distinct())?;

    let Ok(tree) = HuffmanTree::from_frequencies(&freqs) else {
        writeln!(out, "(empty input, no codes)")?;
        return Ok(());
    };
    let table = CodeTable::from_tree(&tree);

    for (byte, count) in freqs.symbols() {
        writeln!(out, "{:>6}  {:>10}", display_byte(byte), count)?;
    }
    writeln!(out)?;

    writeln!(out, "=== Codes ===")?;
    writeln!(out, "Tree: {} leaves, depth {}", tree.leaf_count(), tree.depth())?;
    for (byte, code) in table.iter() {
        writeln!(out, "{:>6}  {}", display_byte(byte), code)?;
    }
    Ok(())
}

fn display_byte(byte: u8) -> String {
    match byte {
        b' ' => "' '".to_string(),
        b'\n' => "\\n".to_string(),
        b'\r' => "\\r".to_string(),
        b'\t' => "\\t".to_string(),
        0x21..=0x7E => format!("'{}'", byte as char),
        _ => format!("0x{:02x}", byte),
    }
}

fn resolve_key(source: &KeySource) -> Result<KeyMask, AppError> {
    match source {
        KeySource::Given(key) => Ok(KeyMask::new(key)?),
        KeySource::Prompt => {
            eprint!("Enter your key for the file: ");
            io::stderr().flush().ok();
            read_key(io::stdin().lock())
        }
    }
}

fn check_compressible(config: &Config, path: &Path) -> Result<(), AppError> {
    if naming::is_artifact(path) {
        return Err(AppError::AlreadyCompressed(path.to_path_buf()));
    }
    if !is_ascii_file(path).at(path)? {
        match config.ascii {
            AsciiPolicy::Require => return Err(AppError::NotAscii(path.to_path_buf())),
            AsciiPolicy::Warn => warn!(path = %path.display(), "input is not ASCII, compressing anyway"),
        }
    }
    Ok(())
}

fn check_artifact(path: &Path) -> Result<(), AppError> {
    if naming::is_artifact(path) {
        Ok(())
    } else {
        Err(AppError::NotAnArtifact(path.to_path_buf()))
    }
}

fn destination(config: &Config, name: PathBuf) -> PathBuf {
    naming::relocate(name, config.out_dir.as_deref())
}

/// Temporary file next to `dest`.
fn stage(dest: &Path) -> Result<NamedTempFile, AppError> {
    let dir = match dest.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    NamedTempFile::new_in(dir).at(dir)
}

fn commit(staged: NamedTempFile, dest: &Path) -> Result<(), AppError> {
    staged.persist(dest).map_err(|e| AppError::Io {
        path: dest.to_path_buf(),
        source: e.error,
    })?;
    debug!(path = %dest.display(), "persisted");
    Ok(())
}

fn discard(staged: NamedTempFile, metrics: &mut Metrics) -> Result<(), AppError> {
    let path = staged.path().to_path_buf();
    staged.close().at(&path)?;
    metrics.intermediates_removed += 1;
    Ok(())
}

fn compress_into(
    layout: Layout,
    source: &Path,
    staged: &mut NamedTempFile,
    metrics: &mut Metrics,
) -> Result<(), AppError> {
    let (stats, artifact_bytes) = match layout {
        Layout::Framed => {
            let data = fs::read(source).at(source)?;
            let (frame, stats) = compress_framed(&data)?;
            staged.write_all(&frame).at(staged.path())?;
            (stats, frame.len() as u64)
        }
        Layout::Raw => {
            let mut input = File::open(source).at(source)?;
            let writer = BufWriter::new(staged.as_file_mut());
            let stats = compress_stream(&mut input, writer)?;
            (stats, stats.output_bytes())
        }
    };
    staged.flush().at(staged.path())?;

    metrics.input_bytes = stats.input_bytes;
    metrics.record_compress(&stats, artifact_bytes);
    info!(
        input = %source.display(),
        input_bytes = stats.input_bytes,
        output_bytes = artifact_bytes,
        symbols = stats.distinct_symbols,
        "compressed"
    );
    Ok(())
}

fn decompress_into(
    source: &Path,
    staged: &mut NamedTempFile,
    metrics: &mut Metrics,
) -> Result<(), AppError> {
    let mut input = BufReader::new(File::open(source).at(source)?);

    let framed = is_framed(input.fill_buf().at(source)?);
    let stats = if framed {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes).at(source)?;
        let frame = parse_frame(&bytes)?;
        let output = decompress_frame(&frame)?;
        staged.write_all(&output).at(staged.path())?;
        DecompressStats {
            tree_bytes: frame.tree_len as usize,
            payload_bits: frame.payload_bits(),
            output_bytes: output.len() as u64,
        }
    } else {
        warn!(input = %source.display(), "raw layout, trailing pad bits may decode as extra bytes");
        decompress_stream(input, BufWriter::new(staged.as_file_mut()))?
    };
    staged.flush().at(staged.path())?;

    if metrics.input_bytes == 0 {
        metrics.input_bytes = fs::metadata(source).at(source)?.len();
    }
    metrics.record_decompress(&stats);
    info!(
        input = %source.display(),
        framed,
        output_bytes = stats.output_bytes,
        "decompressed"
    );
    Ok(())
}

fn mask_into(
    mask: &KeyMask,
    source: &Path,
    staged: &mut NamedTempFile,
    metrics: &mut Metrics,
) -> Result<(), AppError> {
    let input = File::open(source).at(source)?;
    let n = mask.apply_stream(input, BufWriter::new(staged.as_file_mut()))?;

    if metrics.input_bytes == 0 {
        metrics.input_bytes = n;
    }
    metrics.masked_bytes += n;
    info!(input = %source.display(), bytes = n, "masked");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn config(op: Operation, target: PathBuf, key: Option<&str>) -> Config {
        Config {
            target,
            out_dir: None,
            operation: op,
            key: match key {
                Some(k) => KeySource::Given(k.to_string()),
                None => KeySource::Prompt,
            },
            layout: Layout::Framed,
            ascii: AsciiPolicy::Warn,
            log_level: "info".to_string(),
            print_config: false,
            print_metrics: false,
        }
    }

    fn write(dir: &TempDir, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, data).unwrap();
        path
    }

    fn entries(dir: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_compress_then_decompress() {
        let dir = TempDir::new().unwrap();
        let input = b"hello hello hello world\n".repeat(50);
        let src = write(&dir, "notes.txt", &input);

        let metrics = run(&config(Operation::Compress, src.clone(), None)).unwrap();
        let compressed = dir.path().join("notes_compressed.oats");
        assert!(compressed.exists());
        assert_eq!(metrics.raw_bytes, input.len() as u64);
        assert!(metrics.output_bytes < input.len() as u64);

        run(&config(Operation::Decompress, compressed, None)).unwrap();
        let restored = fs::read(dir.path().join("notes_decompressed.txt")).unwrap();
        assert_eq!(restored, input);

        // Inputs are never removed
        assert!(src.exists());
    }

    #[test]
    fn test_pack_then_unpack() {
        let dir = TempDir::new().unwrap();
        let input = b"The quick brown fox jumps over the lazy dog.\n".repeat(30);
        write(&dir, "fox.txt", &input);

        let metrics = run(&config(Operation::Pack, dir.path().join("fox.txt"), Some("k3y"))).unwrap();
        assert_eq!(metrics.intermediates_removed, 1);
        assert_eq!(entries(&dir), vec!["fox.txt", "fox_encoded.oats"]);

        let metrics = run(&config(
            Operation::Unpack,
            dir.path().join("fox_encoded.oats"),
            Some("k3y"),
        ))
        .unwrap();
        assert_eq!(metrics.intermediates_removed, 1);
        assert_eq!(
            entries(&dir),
            vec!["fox.txt", "fox_decompressed.txt", "fox_encoded.oats"]
        );
        assert_eq!(fs::read(dir.path().join("fox_decompressed.txt")).unwrap(), input);
    }

    #[test]
    fn test_unpack_wrong_key_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.txt", &b"abcabcabcabd".repeat(10));
        run(&config(Operation::Pack, dir.path().join("a.txt"), Some("right"))).unwrap();

        let result = run(&config(
            Operation::Unpack,
            dir.path().join("a_encoded.oats"),
            Some("wrong"),
        ));
        assert!(result.is_err());
        assert_eq!(entries(&dir), vec!["a.txt", "a_encoded.oats"]);
    }

    #[test]
    fn test_mask_toggles() {
        let dir = TempDir::new().unwrap();
        let input: Vec<u8> = (0..3000u32).map(|i| (i % 251) as u8).collect();
        write(&dir, "blob.bin", &input);

        run(&config(Operation::Mask, dir.path().join("blob.bin"), Some("abc"))).unwrap();
        let masked = fs::read(dir.path().join("blob_encoded.bin")).unwrap();
        assert_ne!(masked, input);

        fs::remove_file(dir.path().join("blob.bin")).unwrap();
        run(&config(Operation::Mask, dir.path().join("blob_encoded.bin"), Some("abc"))).unwrap();
        assert_eq!(fs::read(dir.path().join("blob.bin")).unwrap(), input);
    }

    #[test]
    fn test_raw_layout_option() {
        let dir = TempDir::new().unwrap();
        // 4 equally frequent symbols, 2 bits each: byte aligned
        let input = b"abcd".repeat(100);
        let src = write(&dir, "raw.txt", &input);

        let mut cfg = config(Operation::Compress, src, None);
        cfg.layout = Layout::Raw;
        run(&cfg).unwrap();

        let artifact = fs::read(dir.path().join("raw_compressed.oats")).unwrap();
        assert!(!is_framed(&artifact));

        run(&config(
            Operation::Decompress,
            dir.path().join("raw_compressed.oats"),
            None,
        ))
        .unwrap();
        assert_eq!(fs::read(dir.path().join("raw_decompressed.txt")).unwrap(), input);
    }

    #[test]
    fn test_empty_file() {
        let dir = TempDir::new().unwrap();
        let src = write(&dir, "empty.txt", b"");

        run(&config(Operation::Compress, src, None)).unwrap();
        run(&config(
            Operation::Decompress,
            dir.path().join("empty_compressed.oats"),
            None,
        ))
        .unwrap();
        assert!(fs::read(dir.path().join("empty_decompressed.txt")).unwrap().is_empty());
    }

    #[test]
    fn test_refuses_oats_input_for_compress() {
        let dir = TempDir::new().unwrap();
        let src = write(&dir, "x_compressed.oats", b"whatever");
        assert!(matches!(
            run(&config(Operation::Compress, src, None)),
            Err(AppError::AlreadyCompressed(_))
        ));
    }

    #[test]
    fn test_decompress_requires_oats() {
        let dir = TempDir::new().unwrap();
        let src = write(&dir, "x.txt", b"whatever");
        assert!(matches!(
            run(&config(Operation::Decompress, src, None)),
            Err(AppError::NotAnArtifact(_))
        ));
    }

    #[test]
    fn test_ascii_policy() {
        let dir = TempDir::new().unwrap();
        let src = write(&dir, "bin.dat", &[0x00, 0xFF, 0x80, b'a']);
        assert!(!is_ascii_file(&src).unwrap());

        let mut cfg = config(Operation::Compress, src.clone(), None);
        cfg.ascii = AsciiPolicy::Require;
        assert!(matches!(run(&cfg), Err(AppError::NotAscii(_))));
        assert_eq!(entries(&dir), vec!["bin.dat"]);

        // Default policy warns and compresses anyway
        run(&config(Operation::Compress, src, None)).unwrap();
        assert!(dir.path().join("bin_compressed.oats").exists());
    }

    #[test]
    fn test_out_dir_override() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let src = write(&dir, "doc.txt", b"some document text");

        let mut cfg = config(Operation::Compress, src, None);
        cfg.out_dir = Some(out.path().to_path_buf());
        run(&cfg).unwrap();

        assert!(out.path().join("doc_compressed.oats").exists());
        assert_eq!(entries(&dir), vec!["doc.txt"]);
    }

    #[test]
    fn test_corrupt_artifact_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        let src = write(&dir, "bad_compressed.oats", b"OATS\x01garbage");
        assert!(run(&config(Operation::Decompress, src, None)).is_err());
        assert_eq!(entries(&dir), vec!["bad_compressed.oats"]);
    }

    #[test]
    fn test_sample() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("sample.txt");
        let metrics = run(&config(Operation::Sample { size: 5000, seed: 9 }, out.clone(), None)).unwrap();
        assert_eq!(metrics.output_bytes, 5000);
        assert!(is_ascii_file(&out).unwrap());
    }

    #[test]
    fn test_read_key() {
        let mask = read_key(&b"secret\nignored\n"[..]).unwrap();
        assert_eq!(mask, KeyMask::new("secret").unwrap());

        let mask = read_key(&b"windows\r\n"[..]).unwrap();
        assert_eq!(mask, KeyMask::new("windows").unwrap());

        assert!(matches!(read_key(&b""[..]), Err(AppError::MissingKey)));
        assert!(matches!(read_key(&b"\n"[..]), Err(AppError::Codec(_))));
    }

    #[test]
    fn test_inspection_output() {
        let mut out: Vec<u8> = Vec::new();
        write_inspection(b"aaab", &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Total: 4 bytes, 2 distinct"));
        assert!(text.contains("'a'           3"));
        assert!(text.contains("'b'  0"));
        assert!(text.contains("'a'  1"));

        let mut out: Vec<u8> = Vec::new();
        write_inspection(b"", &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("no codes"));
    }
}
