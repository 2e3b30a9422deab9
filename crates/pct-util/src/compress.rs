//! Reversible text encoding for shipping large reports as one string value:
//! gzip, then standard base64.

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD as B64_STD;
use base64::Engine as _;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::UtilError;

/// Gzip `text` and encode the result as base64.
///
/// # Errors
/// Returns an error if the in-memory encoder fails.
pub fn compress(text: &str) -> Result<String, UtilError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(text.as_bytes())
        .and_then(|()| encoder.finish())
        .map(|bytes| B64_STD.encode(bytes))
        .map_err(|e| UtilError::Decode {
            message: format!("gzip encoding failed: {e}"),
        })
}

/// Reverse [`compress`].
///
/// # Errors
/// Returns `UtilError::Decode` if the input is not base64, not gzip, or does
/// not decompress to UTF-8.
pub fn decompress(encoded: &str) -> Result<String, UtilError> {
    let bytes = B64_STD
        .decode(encoded.trim())
        .map_err(|e| UtilError::Decode {
            message: format!("invalid base64: {e}"),
        })?;
    let mut text = String::new();
    GzDecoder::new(bytes.as_slice())
        .read_to_string(&mut text)
        .map_err(|e| UtilError::Decode {
            message: format!("invalid gzip stream: {e}"),
        })?;
    Ok(text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn round_trip_empty() {
        assert_eq!(decompress(&compress("").unwrap()).unwrap(), "");
    }

    #[test]
    fn large_repetitive_input_shrinks() {
        let report = "{\"plugin\":\"credentials\",\"status\":\"SUCCESS\"}\n".repeat(500);
        let encoded = compress(&report).unwrap();
        assert!(encoded.len() < report.len());
        assert_eq!(decompress(&encoded).unwrap(), report);
    }

    #[test]
    fn decompress_rejects_garbage() {
        let err = decompress("not base64!!").unwrap_err().to_string();
        assert!(err.contains("invalid base64"), "error was: {err}");

        let not_gzip = B64_STD.encode(b"plain text");
        let err = decompress(&not_gzip).unwrap_err().to_string();
        assert!(err.contains("invalid gzip"), "error was: {err}");
    }

    #[test]
    fn decompress_tolerates_surrounding_whitespace() {
        let encoded = format!("  {}\n", compress("payload").unwrap());
        assert_eq!(decompress(&encoded).unwrap(), "payload");
    }

    proptest! {
        #[test]
        fn round_trip_any_string(s in "\\PC{0,400}") {
            prop_assert_eq!(decompress(&compress(&s).unwrap()).unwrap(), s);
        }
    }
}
