//! Error types for the cache access layer.

use std::fmt;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the cache access layer.
///
/// Absence is never an error: a missing object is `Ok(None)`, a missing key is
/// `Ok(false)`. The variants below represent actual failures.
#[derive(Debug, Clone)]
pub enum Error {
    /// Serialization failed when encoding a value for storage.
    SerializationError(String),

    /// A stored payload could not be decoded into the requested type.
    ///
    /// The usual cause is a schema change since the value was cached.
    /// The entry should be evicted and recomputed, not silently defaulted.
    DeserializationError(String),

    /// Envelope schema version mismatch between code and cached data.
    ///
    /// Raised when the payload decoded but was written by a different
    /// schema version. Expected after deployments that bump
    /// `CURRENT_SCHEMA_VERSION`; the entry should be evicted.
    VersionMismatch {
        /// Expected schema version (from compiled code)
        expected: u32,
        /// Found schema version (from the cached entry)
        found: u32,
    },

    /// Missing or ambiguous key metadata for a type.
    ///
    /// Raised by key derivation when a type declares no usable type key.
    /// Fatal to the call; surfaced immediately at the call site.
    ConfigError(String),

    /// The backing store is unreachable, or an operation was attempted
    /// after `disconnect()`. Never retried here; retry policy belongs to
    /// the caller.
    ConnectionError(String),

    /// Store-side command failure (protocol error, storage full, etc).
    BackendError(String),

    /// Feature not implemented or not enabled (e.g. a Cargo feature is off).
    NotImplemented(String),

    /// Generic error with a custom message.
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            Error::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Cache version mismatch: expected {}, found {}",
                    expected, found
                )
            }
            Error::ConfigError(msg) => write!(f, "Config error: {}", msg),
            Error::ConnectionError(msg) => write!(f, "Connection error: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::NotImplemented(msg) => write!(f, "Not implemented: {}", msg),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::BackendError(e.to_string())
        } else if e.is_syntax() || e.is_data() || e.is_eof() {
            Error::DeserializationError(e.to_string())
        } else {
            Error::SerializationError(e.to_string())
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::BackendError(e.to_string())
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(e.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        Error::BackendError(format!("Redis error: {}", e))
    }
}
