use serde::Serialize;
use tracing::{debug, warn};

use crate::error::EncodingFallbackError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    Utf8,
    /// Legacy Simplified Chinese multi-byte encoding.
    Gbk,
    /// Each byte mapped to the char with the same code point. Lossy for non-ASCII text.
    BytePassthrough,
}

pub fn decode_utf8(bytes: &[u8]) -> Result<String, EncodingFallbackError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|err| EncodingFallbackError::InvalidUtf8 {
            valid_up_to: err.valid_up_to(),
        })
}

/// Decodes uploaded bytes, trying UTF-8 first and the legacy decoder second.
pub fn decode(bytes: &[u8]) -> (String, TextEncoding) {
    match decode_utf8(bytes) {
        Ok(text) => {
            debug!("Decoded {} bytes as UTF-8", bytes.len());
            (text, TextEncoding::Utf8)
        }
        Err(err) => {
            warn!("{err}; retrying with legacy decoder");
            decode_legacy(bytes)
        }
    }
}

#[cfg(feature = "legacy-encoding")]
fn decode_legacy(bytes: &[u8]) -> (String, TextEncoding) {
    let (text, _, had_errors) = encoding_rs::GBK.decode(bytes);
    if had_errors {
        warn!("GBK decoding replaced malformed sequences");
    }
    (text.into_owned(), TextEncoding::Gbk)
}

#[cfg(not(feature = "legacy-encoding"))]
fn decode_legacy(bytes: &[u8]) -> (String, TextEncoding) {
    warn!("Legacy decoder unavailable, passing bytes through");
    (passthrough(bytes), TextEncoding::BytePassthrough)
}

pub fn passthrough(bytes: &[u8]) -> String {
    bytes.iter().map(|&byte| char::from(byte)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_utf8_bom() {
        let (text, encoding) = decode("\u{FEFF}姓名,数学".as_bytes());
        assert_eq!(text, "姓名,数学");
        assert_eq!(encoding, TextEncoding::Utf8);
    }

    #[test]
    fn invalid_utf8_reports_position() {
        let err = decode_utf8(b"ab\xFFcd").unwrap_err();
        assert_eq!(err, EncodingFallbackError::InvalidUtf8 { valid_up_to: 2 });
    }

    #[cfg(feature = "legacy-encoding")]
    #[test]
    fn falls_back_to_gbk() {
        // "姓名,数学" in GBK
        let bytes = [0xD0, 0xD5, 0xC3, 0xFB, b',', 0xCA, 0xFD, 0xD1, 0xA7];
        let (text, encoding) = decode(&bytes);
        assert_eq!(encoding, TextEncoding::Gbk);
        assert_eq!(text, "姓名,数学");
    }

    #[test]
    fn passthrough_keeps_ascii() {
        assert_eq!(passthrough(b"name,math\nA,90"), "name,math\nA,90");
        assert_eq!(passthrough(&[0xE9]).chars().count(), 1);
    }
}
