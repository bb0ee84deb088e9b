//! Store key derivation.
//!
//! All addressing flows through these functions. Derivation is a pure
//! function of its inputs and stable across processes: two workers deriving
//! keys for the same type must land on the same store entries, or the cache
//! silently splits.

use crate::entity::TypeKeyed;
use crate::error::{Error, Result};

/// Derives store keys and namespaces from declared type keys and ids.
pub struct KeySchema;

impl KeySchema {
    /// Derive the storage namespace for a type.
    ///
    /// Used both as the hash-table name for object storage and as the flat
    /// key for singleton key-value storage. Dots are replaced with dashes so
    /// dotted, module-path-style keys stay unambiguous in stores that treat
    /// `.` as a path separator.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` when the type declares an empty key —
    /// surfaced immediately rather than silently defaulting to a shared
    /// namespace.
    pub fn namespace_for<T: TypeKeyed>() -> Result<String> {
        let key = T::type_key();
        if key.trim().is_empty() {
            return Err(Error::ConfigError(format!(
                "type {} declares an empty type key",
                std::any::type_name::<T>()
            )));
        }
        Ok(key.replace('.', "-"))
    }

    /// The in-namespace field for an object: the stringified id.
    pub fn object_field(id: i64) -> String {
        id.to_string()
    }

    /// The namespace holding one user's features: the stringified user id.
    pub fn user_namespace(user_id: u64) -> String {
        user_id.to_string()
    }
}
