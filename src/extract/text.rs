//! Plain text extractor
//!
//! Used for `.txt` files and for anything the sniffer could not classify.

use async_trait::async_trait;
use tracing::debug;

use super::{ExtractionError, TextExtractor};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Decodes bytes as UTF-8; never fails
pub struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        Ok(decode(bytes))
    }
}

/// Strict UTF-8 decode, falling back to a lossy one that replaces invalid
/// sequences with U+FFFD.
pub fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(e) => {
            debug!(valid_up_to = e.valid_up_to(), "invalid UTF-8, decoding lossily");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}
