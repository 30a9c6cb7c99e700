//! MessagePack codec using `rmp-serde`.
//!
//! Samples are written as maps keyed by field name, so consumers in other
//! languages do not depend on field order. MessagePack values are
//! self-delimiting: a stream of samples is plain concatenation, and
//! [`MsgPackCodec::decode_from`] reads them back one at a time.

use std::io::Read;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

/// MessagePack codec for samples.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Serialize a value into a fresh buffer.
    pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        Self::encode_into(value, &mut out)?;
        Ok(out)
    }

    /// Append one value to `out`, struct fields as a map.
    pub fn encode_into<T: Serialize>(value: &T, out: &mut Vec<u8>) -> Result<()> {
        let mut serializer = rmp_serde::Serializer::new(out).with_struct_map();
        value.serialize(&mut serializer)?;
        Ok(())
    }

    /// Deserialize a single value occupying all of `bytes`.
    pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    /// Read the next value from a concatenated stream.
    pub fn decode_from<T: DeserializeOwned, R: Read>(reader: R) -> Result<T> {
        Ok(rmp_serde::from_read(reader)?)
    }
}
