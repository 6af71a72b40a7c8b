//! Transcoding of service payloads into displayable images
//!
//! The service returns PNG bytes as a hexadecimal string. Decoding splits the
//! string into byte pairs (most significant nibble first), then re-encodes the
//! bytes as standard padded base64 behind a `data:image/png;base64,` header.
//! Malformed input is rejected as a whole; nothing is partially decoded.

use crate::error::{Error, Result};
use base64::{Engine as _, engine::general_purpose};
use std::fmt;

/// Header prefixed to every displayable image
pub const DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Decode a hexadecimal payload into raw bytes.
///
/// Both upper and lower case digits are accepted. Odd lengths and any
/// non-hex character fail with [`Error::Decode`].
pub fn decode_hex(payload: &str) -> Result<Vec<u8>> {
    Ok(hex::decode(payload)?)
}

/// A base64 PNG wrapped in a data URI, ready to be rendered
#[derive(Clone, PartialEq, Eq)]
pub struct DisplayableImage {
    data_uri: String,
}

impl DisplayableImage {
    /// Build a displayable image from the service's hexadecimal payload.
    pub fn from_hex(payload: &str) -> Result<Self> {
        let bytes = decode_hex(payload)?;
        Ok(Self::from_bytes(&bytes))
    }

    /// Wrap raw image bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let encoded = general_purpose::STANDARD.encode(bytes);
        Self {
            data_uri: format!("{DATA_URI_PREFIX}{encoded}"),
        }
    }

    /// Parse an existing `data:image/png;base64,` URI.
    pub fn from_data_uri(data_uri: &str) -> Result<Self> {
        let encoded = data_uri
            .strip_prefix(DATA_URI_PREFIX)
            .ok_or_else(|| Error::Decode("Missing PNG data URI header".to_string()))?;
        general_purpose::STANDARD.decode(encoded)?;
        Ok(Self {
            data_uri: data_uri.to_string(),
        })
    }

    /// The full data URI.
    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }

    /// The base64 part following the header.
    pub fn base64(&self) -> &str {
        &self.data_uri[DATA_URI_PREFIX.len()..]
    }

    /// Re-derive the image bytes from the base64 body.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(general_purpose::STANDARD.decode(self.base64())?)
    }
}

impl fmt::Debug for DisplayableImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayableImage")
            .field("base64_len", &self.base64().len())
            .finish()
    }
}

impl fmt::Display for DisplayableImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.data_uri)
    }
}
