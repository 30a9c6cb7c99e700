//! Newline-delimited JSON codec.

use crate::error::Result;

/// JSON codec producing one object per line.
pub struct JsonCodec;

impl JsonCodec {
    /// Encode a value as compact JSON.
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    /// Encode a value as compact JSON followed by a single `\n`.
    ///
    /// Uses an explicit `\n` so output is identical on every platform.
    pub fn encode_line<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut out = serde_json::to_vec(value)?;
        out.push(b'\n');
        Ok(out)
    }

    /// Decode a JSON value; trailing whitespace (the line break) is ignored.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
