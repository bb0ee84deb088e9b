//! Core traits for values addressed through the type-keyed cache.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A type with a stable, explicitly declared cache identifier.
///
/// The type key is the addressing primitive for everything the cache stores:
/// it names the hash namespace for object storage, the flat key for singleton
/// key-value storage, and the per-user field for feature storage.
///
/// Two distinct logical kinds must never declare the same key, or their
/// storage namespaces collide. The key must also be stable across process
/// restarts — two processes deriving different keys for the same type would
/// silently split the cache.
///
/// # Example
///
/// ```
/// use cache_dal::TypeKeyed;
///
/// struct SessionToken;
///
/// impl TypeKeyed for SessionToken {
///     fn type_key() -> &'static str {
///         "session_token"
///     }
/// }
/// ```
pub trait TypeKeyed {
    /// Return the declared type key. Must be non-empty; key derivation
    /// rejects an empty key with a `ConfigError`.
    fn type_key() -> &'static str;
}

/// Anything storable as a singleton key-value entry or a per-user feature.
///
/// Blanket-implemented for every `TypeKeyed` type that is also serde-capable,
/// so callers only ever implement `TypeKeyed` (and `CacheEntity` where the
/// object-CRUD path is needed).
pub trait CacheValue: TypeKeyed + Serialize + DeserializeOwned + Clone + Send + Sync {}

impl<T> CacheValue for T where T: TypeKeyed + Serialize + DeserializeOwned + Clone + Send + Sync {}

/// A domain value storable through the object-CRUD path.
///
/// Identity is `(type_key, entity_id)`: entities live in a hash namespace
/// named after the type key, with the stringified id as the in-namespace
/// field.
///
/// # Example
///
/// ```
/// use cache_dal::{CacheEntity, TypeKeyed};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Serialize, Deserialize)]
/// struct UserAddress {
///     id: i64,
///     name: String,
///     number: i64,
/// }
///
/// impl TypeKeyed for UserAddress {
///     fn type_key() -> &'static str {
///         "user_address"
///     }
/// }
///
/// impl CacheEntity for UserAddress {
///     fn entity_id(&self) -> i64 {
///         self.id
///     }
///
///     fn display_name(&self) -> &str {
///         &self.name
///     }
/// }
/// ```
pub trait CacheEntity: CacheValue {
    /// The entity's integer identifier, unique within its type key.
    fn entity_id(&self) -> i64;

    /// Human-readable name. Informational only; never used for addressing.
    fn display_name(&self) -> &str;
}
