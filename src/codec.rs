//! Blob encoding for the persisted subset.
//!
//! The default codec is compact JSON. Both sides are pluggable through
//! [`PersistConfig`](crate::config::PersistConfig).

use serde_json::Value;
use std::sync::Arc;

use crate::error::Result;

/// Encodes a subset into the raw string stored in the medium.
pub type SerializeFn = Arc<dyn Fn(&Value) -> Result<String> + Send + Sync>;

/// Decodes a raw string read from the medium back into state.
pub type DeserializeFn = Arc<dyn Fn(&str) -> Result<Value> + Send + Sync>;

/// Encode as compact JSON.
pub fn to_json(subset: &Value) -> Result<String> {
    Ok(serde_json::to_string(subset)?)
}

/// Encode as indented JSON. Useful for file-backed media meant to be read by people.
pub fn json_pretty(subset: &Value) -> Result<String> {
    Ok(serde_json::to_string_pretty(subset)?)
}

/// Decode JSON text.
pub fn from_json(raw: &str) -> Result<Value> {
    Ok(serde_json::from_str(raw)?)
}

/// The default encoder, [`to_json`].
pub fn default_serializer() -> SerializeFn {
    Arc::new(to_json)
}

/// [`json_pretty`] as a pluggable encoder.
pub fn pretty_serializer() -> SerializeFn {
    Arc::new(json_pretty)
}

/// The default decoder, [`from_json`].
pub fn default_deserializer() -> DeserializeFn {
    Arc::new(from_json)
}
