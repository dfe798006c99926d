//! Deterministic MessagePack encoding of canonical actions.
//!
//! Structs are written in map form (`to_vec_named`) with keys in declaration
//! order and integers at their minimal width. Equal inputs encode to equal
//! bytes.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{SignError, SignResult};

/// Encode an action to msgpack bytes.
///
/// # Errors
/// Returns `SignError::Encoding` if serialization fails.
pub fn encode<T: Serialize + ?Sized>(action: &T) -> SignResult<Vec<u8>> {
    rmp_serde::to_vec_named(action).map_err(|e| SignError::Encoding(e.to_string()))
}

/// Decode msgpack bytes, typically into `serde_json::Value` or a wire type.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> SignResult<T> {
    rmp_serde::from_slice(bytes).map_err(|e| SignError::Encoding(e.to_string()))
}
