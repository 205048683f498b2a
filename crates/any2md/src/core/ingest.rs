//! Content ingestion: turning caller-supplied document content into bytes.
//!
//! The unified convert entry point accepts three content shapes in one string
//! field:
//!
//! 1. `file://` references - read from the local filesystem
//! 2. base64 - strict-alphabet decode
//! 3. raw text - passed through as UTF-8 bytes
//!
//! Size validation happens on the *estimated* decoded size before any decode
//! work, so oversized payloads are rejected cheaply.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{Any2mdError, Result};

static BASE64_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9+/]*={0,2}$").unwrap_or_else(|e| panic!("invalid base64 pattern: {e}"))
});

/// How the supplied content was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentOrigin {
    Base64,
    FileReference,
    RawText,
}

/// Decoded document content plus its interpretation.
#[derive(Debug, Clone)]
pub struct DecodedContent {
    pub bytes: Vec<u8>,
    pub origin: ContentOrigin,
}

/// Whether the string is shaped like base64 (strict alphabet, padded length).
///
/// Whitespace anywhere disqualifies the string; real base64 payloads arrive
/// unwrapped.
fn looks_like_base64(content: &str) -> bool {
    !content.is_empty() && content.len() % 4 == 0 && BASE64_RE.is_match(content)
}

/// Estimate the decoded size of the content without decoding it.
///
/// Base64-shaped content estimates at `len * 3 / 4`; everything else at its
/// literal length.
pub fn estimated_decoded_size(content: &str) -> usize {
    if content.starts_with("file://") {
        content.len()
    } else if looks_like_base64(content) {
        content.len() * 3 / 4
    } else {
        content.len()
    }
}

/// Reject content whose estimated decoded size exceeds `max_size`.
///
/// # Errors
///
/// Returns `FileTooLarge` with both sizes in MB.
pub fn validate_file_size(content: &str, max_size: u64) -> Result<()> {
    let estimated = estimated_decoded_size(content) as u64;
    if estimated > max_size {
        return Err(Any2mdError::FileTooLarge(format!(
            "estimated size {}MB exceeds the {}MB limit",
            estimated / (1024 * 1024),
            max_size / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Reject decoded content larger than `max_size`.
///
/// The up-front estimate cannot see through a `file://` reference, so the
/// actual byte count is checked again after decoding.
///
/// # Errors
///
/// Returns `FileTooLarge` with both sizes in MB.
pub fn validate_decoded_size(size: u64, max_size: u64) -> Result<()> {
    if size > max_size {
        return Err(Any2mdError::FileTooLarge(format!(
            "decoded size {}MB exceeds the {}MB limit",
            size / (1024 * 1024),
            max_size / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Validate the filename and its extension against the allowed set.
///
/// # Errors
///
/// - `Validation` for an empty filename or a filename with no extension
/// - `UnsupportedFormat` for an extension outside `allowed`
pub fn validate_file_format(filename: &str, allowed: &[String]) -> Result<()> {
    if filename.is_empty() {
        return Err(Any2mdError::validation("filename must not be empty"));
    }
    let ext = file_extension(filename)
        .ok_or_else(|| Any2mdError::validation(format!("filename has no extension: {}", filename)))?;
    if !allowed.iter().any(|a| a == &ext) {
        return Err(Any2mdError::UnsupportedFormat(format!(
            "{} (supported: {})",
            ext,
            allowed.join(", ")
        )));
    }
    Ok(())
}

/// Lowercased final extension of a filename, if any.
pub fn file_extension(filename: &str) -> Option<String> {
    let ext = filename.rsplit('.').next()?;
    if ext.len() == filename.len() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Decode caller-supplied content into bytes.
///
/// # Errors
///
/// - `Validation` for empty content or a `file://` reference to a missing file
/// - `Io` for filesystem errors while reading a referenced file
pub async fn decode_content(content: &str) -> Result<DecodedContent> {
    if content.is_empty() {
        return Err(Any2mdError::validation("file_content must not be empty"));
    }

    if let Some(path) = content.strip_prefix("file://") {
        let path = std::path::Path::new(path);
        if !path.exists() {
            return Err(Any2mdError::validation(format!(
                "Referenced file does not exist: {}",
                path.display()
            )));
        }
        let bytes = tokio::fs::read(path).await.map_err(Any2mdError::Io)?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "Read file reference");
        return Ok(DecodedContent {
            bytes,
            origin: ContentOrigin::FileReference,
        });
    }

    if looks_like_base64(content)
        && let Ok(bytes) = BASE64.decode(content)
    {
        return Ok(DecodedContent {
            bytes,
            origin: ContentOrigin::Base64,
        });
    }

    // Raw text: the input is already valid UTF-8 by construction.
    Ok(DecodedContent {
        bytes: content.as_bytes().to_vec(),
        origin: ContentOrigin::RawText,
    })
}

/// Decode bytes back to text, tolerating non-UTF-8 input.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (a superset of
/// Latin-1 in practice). Never fails; unmappable bytes are replaced.
pub fn bytes_to_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_decode_base64() {
        let encoded = BASE64.encode(b"%PDF-1.4 test");
        let decoded = decode_content(&encoded).await.unwrap();
        assert_eq!(decoded.origin, ContentOrigin::Base64);
        assert_eq!(decoded.bytes, b"%PDF-1.4 test");
    }

    #[tokio::test]
    async fn test_decode_file_reference() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"pdf bytes").unwrap();

        let content = format!("file://{}", path.display());
        let decoded = decode_content(&content).await.unwrap();
        assert_eq!(decoded.origin, ContentOrigin::FileReference);
        assert_eq!(decoded.bytes, b"pdf bytes");
    }

    #[tokio::test]
    async fn test_decode_missing_file_reference() {
        let result = decode_content("file:///nonexistent/doc.pdf").await;
        assert!(matches!(result, Err(Any2mdError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_decode_raw_text() {
        // odd length, not base64-shaped
        let decoded = decode_content("hello world").await.unwrap();
        assert_eq!(decoded.origin, ContentOrigin::RawText);
        assert_eq!(decoded.bytes, b"hello world");
    }

    #[tokio::test]
    async fn test_decode_text_with_whitespace_is_raw() {
        // length is a multiple of 4 but the space disqualifies base64
        let decoded = decode_content("abc def!").await.unwrap();
        assert_eq!(decoded.origin, ContentOrigin::RawText);
    }

    #[tokio::test]
    async fn test_decode_empty_content() {
        let result = decode_content("").await;
        assert!(matches!(result, Err(Any2mdError::Validation { .. })));
    }

    #[test]
    fn test_looks_like_base64() {
        assert!(looks_like_base64("aGVsbG8="));
        assert!(looks_like_base64("AAAA"));
        assert!(!looks_like_base64("AAA")); // length not a multiple of 4
        assert!(!looks_like_base64("AAA A"));
        assert!(!looks_like_base64(""));
    }

    #[test]
    fn test_estimated_decoded_size() {
        assert_eq!(estimated_decoded_size("AAAA"), 3);
        assert_eq!(estimated_decoded_size("hello"), 5);
        let path = "file:///tmp/x.pdf";
        assert_eq!(estimated_decoded_size(path), path.len());
    }

    #[test]
    fn test_validate_file_size() {
        assert!(validate_file_size("AAAA", 100).is_ok());
        let big = "A".repeat(2000);
        let result = validate_file_size(&big, 1000);
        assert!(matches!(result, Err(Any2mdError::FileTooLarge(_))));
    }

    #[test]
    fn test_validate_decoded_size() {
        assert!(validate_decoded_size(100, 100).is_ok());
        assert!(matches!(
            validate_decoded_size(101, 100),
            Err(Any2mdError::FileTooLarge(_))
        ));
    }

    #[test]
    fn test_validate_file_format() {
        let allowed = vec!["pdf".to_string(), "docx".to_string()];
        assert!(validate_file_format("report.pdf", &allowed).is_ok());
        assert!(validate_file_format("Report.PDF", &allowed).is_ok());
        assert!(matches!(
            validate_file_format("notes.txt", &allowed),
            Err(Any2mdError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            validate_file_format("", &allowed),
            Err(Any2mdError::Validation { .. })
        ));
        assert!(matches!(
            validate_file_format("noextension", &allowed),
            Err(Any2mdError::Validation { .. })
        ));
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("a.PDF"), Some("pdf".to_string()));
        assert_eq!(file_extension("archive.tar.xlsx"), Some("xlsx".to_string()));
        assert_eq!(file_extension("none"), None);
        assert_eq!(file_extension("trailing."), None);
    }

    #[test]
    fn test_bytes_to_text_utf8() {
        assert_eq!(bytes_to_text("héllo".as_bytes()), "héllo");
    }

    #[test]
    fn test_bytes_to_text_latin1_fallback() {
        // 0xE9 is é in Windows-1252, invalid as a UTF-8 start byte here
        let bytes = vec![0x68, 0xE9, 0x6C, 0x6C, 0x6F];
        assert_eq!(bytes_to_text(&bytes), "héllo");
    }
}
