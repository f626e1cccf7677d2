//! Source loading for orrery
//!
//! Reading goes through the [`SourceLoader`] trait so indexing can be driven
//! from something other than the local disk (and mocked in tests). This
//! module also owns binary detection, UTF-8 decoding, language detection and
//! the content checksum.

use crate::ir::LanguageId;
use std::io;
use std::path::Path;

#[cfg(test)]
use mockall::automock;

/// Bytes inspected for NUL when sniffing binary content
const BINARY_SNIFF_LEN: usize = 8192;

/// Trait for reading source files
///
/// This trait allows for mocking in tests and alternative implementations
/// (e.g., in-memory or remote sources).
#[cfg_attr(test, automock)]
pub trait SourceLoader: Send + Sync {
    /// Read the raw bytes of a file
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Loader backed by the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLoader;

impl SourceLoader for FsLoader {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

/// Outcome of decoding raw file bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Valid UTF-8
    Clean(String),
    /// Invalid bytes replaced one-for-one; `replaced` counts them
    Lossy { text: String, replaced: usize },
    /// NUL bytes or too many invalid sequences
    Binary,
}

/// Check if content appears to be binary
pub fn is_binary(content: &[u8]) -> bool {
    // Empty is not binary
    if content.is_empty() {
        return false;
    }

    let check_len = content.len().min(BINARY_SNIFF_LEN);
    content[..check_len].contains(&0)
}

/// Placeholder for each byte that is not valid UTF-8
const INVALID_BYTE: char = '?';

/// Decode file bytes
///
/// Invalid UTF-8 is tolerated while invalid bytes stay under 10% of the
/// file. Each invalid byte becomes one ASCII placeholder and line endings are
/// preserved, so decoded byte offsets match the bytes on disk.
pub fn decode(bytes: &[u8]) -> Decoded {
    if is_binary(bytes) {
        return Decoded::Binary;
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Decoded::Clean(text.to_string());
    }

    let mut text = String::with_capacity(bytes.len());
    let mut replaced = 0;
    let mut rest = bytes;
    while !rest.is_empty() {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                text.push_str(valid);
                break;
            }
            Err(err) => {
                let (valid, after) = rest.split_at(err.valid_up_to());
                // valid_up_to marks a UTF-8 boundary
                text.push_str(std::str::from_utf8(valid).unwrap_or_default());
                let invalid = err.error_len().unwrap_or(after.len());
                text.extend(std::iter::repeat(INVALID_BYTE).take(invalid));
                replaced += invalid;
                rest = &after[invalid..];
            }
        }
    }

    if replaced * 10 < bytes.len() {
        Decoded::Lossy { text, replaced }
    } else {
        Decoded::Binary
    }
}

/// Hex MD5 of the decoded source; the staleness key for caches
pub fn checksum(source: &str) -> String {
    format!("{:x}", md5::compute(source.as_bytes()))
}

/// Detect a file's language from its extension, falling back to a shebang
/// on the first line for extensionless files
pub fn detect_language(path: &Path, head: &[u8]) -> LanguageId {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        return LanguageId::from_extension(ext);
    }
    if !head.starts_with(b"#!") {
        return LanguageId::Unknown;
    }
    let line_end = head.iter().position(|b| *b == b'\n').unwrap_or(head.len());
    let first_line = String::from_utf8_lossy(&head[..line_end]);
    LanguageId::from_shebang(&first_line)
}

/// Normalize path separators for cross-platform compatibility.
/// - Converts Windows backslashes to forward slashes
/// - Strips Windows UNC prefix `\\?\` if present
pub fn normalize_path(path: &str) -> String {
    let stripped = path
        .strip_prefix(r"\\?\")
        .or_else(|| path.strip_prefix(r"\\.\"))
        .unwrap_or(path);
    stripped.replace('\\', "/")
}

/// `/`-separated path of `path` relative to `root`
pub fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    normalize_path(&relative.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Binary Detection Tests
    // =========================================================================

    #[test]
    fn test_is_binary_empty() {
        assert!(!is_binary(&[]));
    }

    #[test]
    fn test_is_binary_with_null() {
        assert!(is_binary(&[0x00, 0x01, 0x02]));
    }

    #[test]
    fn test_is_binary_text() {
        assert!(!is_binary(b"Hello, world!"));
    }

    #[test]
    fn test_is_binary_null_after_sniff_window() {
        let mut content = vec![b'a'; BINARY_SNIFF_LEN + 10];
        content[BINARY_SNIFF_LEN + 5] = 0;
        assert!(!is_binary(&content));
    }

    // =========================================================================
    // Decoding Tests
    // =========================================================================

    #[test]
    fn test_decode_clean_keeps_crlf() {
        assert_eq!(decode(b"a\r\nb"), Decoded::Clean("a\r\nb".to_string()));
    }

    #[test]
    fn test_decode_lossy_under_threshold() {
        let mut bytes = b"function ok() { return 1; }".to_vec();
        bytes.push(0xFF);
        match decode(&bytes) {
            Decoded::Lossy { text, replaced } => {
                assert_eq!(replaced, 1);
                assert!(text.ends_with("}?"));
                assert_eq!(text.len(), bytes.len());
            }
            other => panic!("expected lossy decode, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_lossy_keeps_byte_offsets() {
        let bytes = b"x = 'caf\xE9'\ndef f():\n    pass\n\xF0\x9F";
        match decode(bytes) {
            Decoded::Lossy { text, replaced } => {
                assert_eq!(replaced, 3);
                assert_eq!(text.len(), bytes.len());
                assert_eq!(text.find("def"), Some(11));
                assert!(text.ends_with("pass\n??"));
            }
            other => panic!("expected lossy decode, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_mostly_invalid_is_binary() {
        assert_eq!(decode(&[0xFF, 0xFE, 0xFD, b'a']), Decoded::Binary);
    }

    #[test]
    fn test_decode_nul_is_binary() {
        assert_eq!(decode(b"abc\0def"), Decoded::Binary);
    }

    // =========================================================================
    // Language Detection Tests
    // =========================================================================

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(detect_language(Path::new("src/main.rs"), b""), LanguageId::Rust);
        assert_eq!(detect_language(Path::new("app.tsx"), b""), LanguageId::Tsx);
        assert_eq!(detect_language(Path::new("data.json"), b""), LanguageId::Json);
    }

    #[test]
    fn test_detect_by_shebang() {
        assert_eq!(
            detect_language(Path::new("bin/tool"), b"#!/usr/bin/env python3\nprint(1)\n"),
            LanguageId::Python
        );
        assert_eq!(
            detect_language(Path::new("bin/serve"), b"#!/usr/bin/env node\n"),
            LanguageId::JavaScript
        );
        assert_eq!(detect_language(Path::new("README"), b"hello"), LanguageId::Unknown);
    }

    #[test]
    fn test_extension_wins_over_shebang() {
        assert_eq!(
            detect_language(Path::new("script.rb"), b"#!/usr/bin/env python\n"),
            LanguageId::Ruby
        );
    }

    // =========================================================================
    // Path and Checksum Tests
    // =========================================================================

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(r"src\lib.rs"), "src/lib.rs");
        assert_eq!(normalize_path(r"\\?\C:\proj\a.rs"), "C:/proj/a.rs");
        assert_eq!(normalize_path("src/lib.rs"), "src/lib.rs");
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(
            relative_path(Path::new("/proj"), Path::new("/proj/src/a.rs")),
            "src/a.rs"
        );
    }

    #[test]
    fn test_checksum_is_stable_hex() {
        let a = checksum("fn main() {}");
        assert_eq!(a.len(), 32);
        assert_eq!(a, checksum("fn main() {}"));
        assert_ne!(a, checksum("fn main() { }"));
    }

    #[test]
    fn test_mock_loader() {
        let mut loader = MockSourceLoader::new();
        loader
            .expect_read()
            .returning(|_| Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")));
        let err = loader.read(Path::new("a.rs")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }
}
