//! Versioned JSON envelope codec for cache payloads.
//!
//! Every value goes through the store as text: a JSON envelope carrying a
//! schema version and the payload. The version is validated before the
//! payload is handed back, so schema drift surfaces as a typed error instead
//! of a mangled value:
//!
//! ```text
//! {"version":1,"payload":{...}}
//! ```
//!
//! Bump [`CURRENT_SCHEMA_VERSION`] when making breaking changes to cached
//! types (adding/removing fields, changing field types). Entries written
//! under the old version are then rejected with `Error::VersionMismatch` and
//! should be evicted and recomputed — no silent migration.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Current envelope schema version.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Envelope wrapping every stored payload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CacheEnvelope<T> {
    /// Schema version; must match [`CURRENT_SCHEMA_VERSION`] on decode.
    pub version: u32,
    /// The cached value.
    pub payload: T,
}

impl<T> CacheEnvelope<T> {
    /// Wrap a payload under the current schema version.
    pub fn new(payload: T) -> Self {
        Self {
            version: CURRENT_SCHEMA_VERSION,
            payload,
        }
    }
}

/// Serialize a value into envelope text for storage.
///
/// # Errors
///
/// Returns `Error::SerializationError` if JSON encoding fails.
pub fn serialize_value<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(&CacheEnvelope::new(value)).map_err(|e| {
        error!("Cache serialization failed: {}", e);
        Error::SerializationError(e.to_string())
    })
}

/// Decode envelope text back into a value, validating the schema version.
///
/// # Errors
///
/// - `Error::DeserializationError`: malformed envelope or payload no longer
///   matching the requested type shape (cached before a schema change).
/// - `Error::VersionMismatch`: envelope written under a different schema
///   version.
pub fn deserialize_value<T: DeserializeOwned>(text: &str) -> Result<T> {
    let envelope: CacheEnvelope<T> = serde_json::from_str(text).map_err(|e| {
        error!("Cache deserialization failed: {}", e);
        Error::DeserializationError(e.to_string())
    })?;

    if envelope.version != CURRENT_SCHEMA_VERSION {
        warn!(
            "Cache version mismatch: expected {}, got {}",
            CURRENT_SCHEMA_VERSION, envelope.version
        );
        return Err(Error::VersionMismatch {
            expected: CURRENT_SCHEMA_VERSION,
            found: envelope.version,
        });
    }

    Ok(envelope.payload)
}
