//! JSON encoding of request bodies and shape-checked decoding of responses
//!
//! Decoding is structural: fields the daemon adds in newer API versions are
//! ignored, and `null` collections decode as empty ones.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{Error, Result};

/// A response record with a name used in decode errors
pub trait Resource: DeserializeOwned {
    const SHAPE: &'static str;
}

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| Error::Validation(format!("cannot encode request body: {}", e)))
}

pub fn decode<T: Resource>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|source| Error::MalformedResponse {
        shape: T::SHAPE,
        source,
    })
}

/// Decode a JSON array of records; a `null` body is an empty list.
pub fn decode_list<T: Resource>(bytes: &[u8]) -> Result<Vec<T>> {
    let list: Option<Vec<T>> = serde_json::from_slice(bytes).map_err(|source| Error::MalformedResponse {
        shape: T::SHAPE,
        source,
    })?;
    Ok(list.unwrap_or_default())
}

/// `deserialize_with` helper: treat an explicit `null` like a missing field
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
