//! Serializer module for stored values
//!
//! Values handed to the adapters are plain `serde` types. The flat store keeps
//! them as JSON text, the in-memory object store keeps them as structured
//! `serde_json::Value` trees. Both directions map failures into
//! [`SerializerError`] so callers see serialization problems apart from
//! storage problems.

use crate::error::{SerializerError, SerializerResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Serialize a value to its JSON text representation
pub fn to_text<V>(value: &V) -> SerializerResult<String>
where
    V: Serialize + ?Sized,
{
    serde_json::to_string(value).map_err(|e| SerializerError::SerializationFailed {
        reason: e.to_string(),
    })
}

/// Parse JSON text back into a typed value
pub fn from_text<V>(text: &str) -> SerializerResult<V>
where
    V: DeserializeOwned,
{
    serde_json::from_str(text).map_err(|e| SerializerError::DeserializationFailed {
        reason: e.to_string(),
    })
}

/// Convert a value into a structured JSON tree
pub fn to_value<V>(value: &V) -> SerializerResult<Value>
where
    V: Serialize + ?Sized,
{
    serde_json::to_value(value).map_err(|e| SerializerError::SerializationFailed {
        reason: e.to_string(),
    })
}

/// Convert a structured JSON tree into a typed value
pub fn from_value<V>(value: Value) -> SerializerResult<V>
where
    V: DeserializeOwned,
{
    serde_json::from_value(value).map_err(|e| SerializerError::DeserializationFailed {
        reason: e.to_string(),
    })
}
