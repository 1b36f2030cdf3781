use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use zstd::stream::read::Decoder as ZstdDecoder;

use super::error::{ImportError, Result};
use super::log;

pub type PgnInput = Box<dyn Read + Send>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompressionMode {
    Plain,
    Zstd,
}

impl CompressionMode {
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.trim();
        if normalized.eq_ignore_ascii_case("plain") {
            Ok(Self::Plain)
        } else if normalized.eq_ignore_ascii_case("zstd") {
            Ok(Self::Zstd)
        } else {
            Err(ImportError::InvalidCompression {
                value: normalized.to_string(),
            })
        }
    }

    /// `.zst` files are zstd, everything else plain.
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("zst") => Self::Zstd,
            _ => Self::Plain,
        }
    }
}

/// Expands a glob pattern (anything containing `*` or `?`) or returns the
/// single path as given.
pub fn expand_paths(pattern: &str) -> Result<Vec<PathBuf>> {
    if !pattern.contains('*') && !pattern.contains('?') {
        return Ok(vec![PathBuf::from(pattern)]);
    }

    let entries = glob::glob(pattern).map_err(|e| {
        ImportError::io(
            format!("invalid path pattern '{pattern}'"),
            io::Error::new(io::ErrorKind::InvalidInput, e.to_string()),
        )
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => paths.push(path),
            Err(e) => log::warn(format!("Skipping unreadable path: {e}")),
        }
    }

    if paths.is_empty() {
        return Err(ImportError::io(
            format!("no files match '{pattern}'"),
            io::Error::from(io::ErrorKind::NotFound),
        ));
    }
    Ok(paths)
}

fn open_input_stream(path: &Path, compression: CompressionMode) -> Result<PgnInput> {
    let file = File::open(path)
        .map_err(|e| ImportError::io(format!("Failed to open file '{}'", path.display()), e))?;

    match compression {
        CompressionMode::Plain => Ok(Box::new(file)),
        CompressionMode::Zstd => ZstdDecoder::new(file)
            .map(|decoder| Box::new(decoder) as PgnInput)
            .map_err(|e| {
                ImportError::io(
                    format!("Failed to initialize zstd decoder for '{}'", path.display()),
                    e,
                )
            }),
    }
}

/// Reads a whole PGN file, decompressing it when needed.
///
/// `compression` overrides detection from the file extension.
pub fn read_pgn_file(path: &Path, compression: Option<CompressionMode>) -> Result<String> {
    let mode = compression.unwrap_or_else(|| CompressionMode::detect(path));
    let mut input = open_input_stream(path, mode)?;

    let mut text = String::new();
    input
        .read_to_string(&mut text)
        .map_err(|e| ImportError::io(format!("Failed to read '{}'", path.display()), e))?;
    Ok(text)
}

/// Reads every file in `paths`, in order.
///
/// A file that cannot be read fails the call when it is the only input;
/// among several it is logged and skipped.
pub fn read_pgn_files(
    paths: &[PathBuf],
    compression: Option<CompressionMode>,
) -> Result<Vec<(&Path, String)>> {
    let mut texts = Vec::with_capacity(paths.len());
    for path in paths {
        match read_pgn_file(path, compression) {
            Ok(text) => texts.push((path.as_path(), text)),
            Err(e) if paths.len() == 1 => return Err(e),
            Err(e) => log::warn(format!("Skipping file: {e}")),
        }
    }
    Ok(texts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const PGN: &str = "[White \"A\"]\n[Black \"B\"]\n\n1. e4 *\n";

    #[test]
    fn test_parse_compression_mode_case_insensitive() {
        assert_eq!(CompressionMode::parse("zstd").unwrap(), CompressionMode::Zstd);
        assert_eq!(CompressionMode::parse("ZsTd").unwrap(), CompressionMode::Zstd);
        assert_eq!(CompressionMode::parse(" plain ").unwrap(), CompressionMode::Plain);
    }

    #[test]
    fn test_parse_compression_mode_rejects_unsupported_value() {
        let err = CompressionMode::parse("gzip").unwrap_err();
        assert!(err.to_string().contains("Invalid compression value 'gzip'"));
        assert!(err.is_client_error());

        let err = CompressionMode::parse("   ").unwrap_err();
        assert!(err.to_string().contains("Invalid compression value ''"));
    }

    #[test]
    fn test_detect_compression_from_extension() {
        assert_eq!(CompressionMode::detect(Path::new("games.pgn.zst")), CompressionMode::Zstd);
        assert_eq!(CompressionMode::detect(Path::new("games.PGN.ZST")), CompressionMode::Zstd);
        assert_eq!(CompressionMode::detect(Path::new("games.pgn")), CompressionMode::Plain);
        assert_eq!(CompressionMode::detect(Path::new("games")), CompressionMode::Plain);
    }

    #[test]
    fn test_expand_paths_single_path_is_returned_as_is() {
        let paths = expand_paths("does/not/need/to/exist.pgn").unwrap();
        assert_eq!(paths, [PathBuf::from("does/not/need/to/exist.pgn")]);
    }

    #[test]
    fn test_expand_paths_glob() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        fs::write(dir.join("a.pgn"), PGN).unwrap();
        fs::write(dir.join("b.pgn"), PGN).unwrap();
        fs::write(dir.join("notes.txt"), "x").unwrap();

        let pattern = format!("{}/*.pgn", dir.display());
        let mut paths = expand_paths(&pattern).unwrap();
        paths.sort();

        assert_eq!(paths, [dir.join("a.pgn"), dir.join("b.pgn")]);
    }

    #[test]
    fn test_expand_paths_glob_without_matches_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let pattern = format!("{}/*.pgn", temp_dir.path().display());

        assert!(matches!(expand_paths(&pattern), Err(ImportError::Io { .. })));
    }

    #[test]
    fn test_read_pgn_file_plain_and_zstd() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        let plain = dir.join("game.pgn");
        let compressed = dir.join("game.pgn.zst");
        fs::write(&plain, PGN).unwrap();
        fs::write(&compressed, zstd::encode_all(PGN.as_bytes(), 0).unwrap()).unwrap();

        assert_eq!(read_pgn_file(&plain, None).unwrap(), PGN);
        assert_eq!(read_pgn_file(&compressed, None).unwrap(), PGN);
        assert_eq!(
            read_pgn_file(&compressed, Some(CompressionMode::Zstd)).unwrap(),
            PGN
        );
    }

    #[test]
    fn test_read_pgn_file_missing_file_is_transient_io_error() {
        let err = read_pgn_file(Path::new("/definitely/missing/file.pgn"), None).unwrap_err();
        assert!(matches!(err, ImportError::Io { .. }));
        assert!(err.to_string().contains("Failed to open file"));
    }

    #[test]
    fn test_read_pgn_files_skips_unreadable_file_among_several() {
        let temp_dir = TempDir::new().unwrap();
        let good = temp_dir.path().join("good.pgn");
        let not_utf8 = temp_dir.path().join("binary.pgn");
        fs::write(&good, PGN).unwrap();
        fs::write(&not_utf8, [0xff, 0xfe, 0x00]).unwrap();

        let paths = [temp_dir.path().join("missing.pgn"), not_utf8, good.clone()];
        let texts = read_pgn_files(&paths, None).unwrap();

        assert_eq!(texts, [(good.as_path(), PGN.to_string())]);
    }

    #[test]
    fn test_read_pgn_files_single_unreadable_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let paths = [temp_dir.path().join("missing.pgn")];

        let err = read_pgn_files(&paths, None).unwrap_err();
        assert!(matches!(err, ImportError::Io { .. }));
    }
}
