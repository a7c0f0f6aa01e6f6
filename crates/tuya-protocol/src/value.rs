//! Typed datapoint value codec
//!
//! Interprets a datapoint's raw payload according to its declared type.
//! RAW and BITMAP payloads stay opaque here; byte slicing belongs to the
//! mapping layer's converters.

use crate::types::{DpType, ProtocolError};

/// Decoded form of a datapoint payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    Bool(bool),
    /// Unsigned 32-bit big-endian integer; signed interpretation is a
    /// converter concern
    Value(u32),
    /// ASCII text, verbatim including any trailing padding
    Text(String),
    /// Raw enum ordinal
    Enum(u8),
    Raw(Vec<u8>),
    Bitmap(Vec<u8>),
}

impl TypedValue {
    /// Decode a payload using the given datapoint type
    pub fn decode(dp_type: DpType, payload: &[u8]) -> Result<Self, ProtocolError> {
        match dp_type {
            DpType::Bool => {
                if payload.len() != 1 {
                    return Err(ProtocolError::PayloadLength {
                        dp_type,
                        expected: 1,
                        actual: payload.len(),
                    });
                }
                Ok(TypedValue::Bool(payload[0] != 0))
            }
            DpType::Value => {
                if payload.len() != 4 {
                    return Err(ProtocolError::PayloadLength {
                        dp_type,
                        expected: 4,
                        actual: payload.len(),
                    });
                }
                Ok(TypedValue::Value(u32::from_be_bytes([
                    payload[0], payload[1], payload[2], payload[3],
                ])))
            }
            DpType::Enum => {
                if payload.len() != 1 {
                    return Err(ProtocolError::PayloadLength {
                        dp_type,
                        expected: 1,
                        actual: payload.len(),
                    });
                }
                Ok(TypedValue::Enum(payload[0]))
            }
            DpType::String => {
                if let Some(&bad) = payload.iter().find(|b| !b.is_ascii()) {
                    return Err(ProtocolError::NonAscii(bad));
                }
                // Length is explicit in the frame; padding is kept as-is
                Ok(TypedValue::Text(
                    payload.iter().map(|&b| char::from(b)).collect(),
                ))
            }
            DpType::Raw => Ok(TypedValue::Raw(payload.to_vec())),
            DpType::Bitmap => Ok(TypedValue::Bitmap(payload.to_vec())),
        }
    }

    /// Encode back to a wire payload; exact inverse of [`TypedValue::decode`]
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            TypedValue::Bool(v) => vec![u8::from(*v)],
            TypedValue::Value(v) => v.to_be_bytes().to_vec(),
            TypedValue::Text(s) => s.as_bytes().to_vec(),
            TypedValue::Enum(v) => vec![*v],
            TypedValue::Raw(bytes) | TypedValue::Bitmap(bytes) => bytes.clone(),
        }
    }

    /// Wire type this value encodes as
    #[must_use]
    pub fn dp_type(&self) -> DpType {
        match self {
            TypedValue::Bool(_) => DpType::Bool,
            TypedValue::Value(_) => DpType::Value,
            TypedValue::Text(_) => DpType::String,
            TypedValue::Enum(_) => DpType::Enum,
            TypedValue::Raw(_) => DpType::Raw,
            TypedValue::Bitmap(_) => DpType::Bitmap,
        }
    }
}
