//! Store provider contract and implementations.
//!
//! The contract is split into narrow capability traits — object storage,
//! singleton key-value storage, per-user feature storage — plus the
//! [`StoreProvider`] supertrait carrying the connection lifecycle. Concrete
//! adapters implement the capabilities over their own primitives and test
//! doubles compose easily.
//!
//! **IMPORTANT:** All methods take `&self`; implementations use interior
//! mutability (DashMap, pool handles) so providers can be cloned and shared
//! across tasks.

use crate::entity::{CacheEntity, CacheValue, TypeKeyed};
use crate::error::Result;
use std::time::Duration;

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use memory::InMemoryProvider;
#[cfg(feature = "redis")]
pub use redis::{RedisConfig, RedisProvider};

/// Object storage: values with an `(type key, id)` identity, kept in a
/// hash namespace named after the type key.
#[allow(async_fn_in_trait)]
pub trait ObjectStore {
    /// Save one object, overwriting any existing entry with the same id.
    ///
    /// Returns `Ok(true)` when the write was accepted, whether or not an
    /// entry already existed.
    async fn save_object<T: CacheEntity>(&self, value: &T) -> Result<bool>;

    /// Save a collection of objects.
    ///
    /// Every element is attempted even after a rejection (no short-circuit);
    /// the result is `Ok(true)` only if all elements saved.
    async fn save_objects<T: CacheEntity>(&self, values: &[T]) -> Result<bool> {
        let mut all_saved = true;
        for value in values {
            if !self.save_object(value).await? {
                all_saved = false;
            }
        }
        Ok(all_saved)
    }

    /// Fetch one object by id.
    ///
    /// Absence is `Ok(None)`, never an error.
    async fn get_object_by_id<T: CacheEntity>(&self, id: i64) -> Result<Option<T>>;

    /// Fetch one object by an explicit in-namespace field key.
    async fn get_object_by_field<T: CacheEntity>(&self, field: &str) -> Result<Option<T>>;

    /// Fetch every object stored under the type's namespace.
    ///
    /// An empty namespace yields an empty vec. A payload that no longer
    /// decodes into `T` (schema drift since it was cached) is skipped with
    /// a logged warning rather than aborting the enumeration; single-object
    /// gets propagate the decode error instead.
    async fn get_all_objects<T: CacheEntity>(&self) -> Result<Vec<T>>;

    /// Delete one object by id. Returns `Ok(false)` when no entry existed.
    async fn delete_object_by_id<T: CacheEntity>(&self, id: i64) -> Result<bool>;
}

/// Singleton key-value storage: at most one live value per type key.
#[allow(async_fn_in_trait)]
pub trait KeyValueStore {
    /// Store the singleton value for `T` with the given TTL.
    ///
    /// Unconditional overwrite (last writer wins); the store applies the TTL
    /// atomically at write time, with millisecond granularity.
    async fn save_key_value<T: CacheValue>(&self, value: &T, ttl: Duration) -> Result<bool>;

    /// Fetch the singleton value for `T`, if one is live.
    async fn get_key_value<T: CacheValue>(&self) -> Result<Option<T>>;

    /// Delete the singleton key for `T`. Returns `Ok(false)` when absent.
    async fn delete_key<T: TypeKeyed>(&self) -> Result<bool>;
}

/// Per-user feature storage: one value of each type key per user,
/// namespaced by the user id.
///
/// The "current user" variants address the user bound at `connect` time.
#[allow(async_fn_in_trait)]
pub trait UserFeatureStore {
    /// Save a feature for the current user.
    async fn save_user_feature<T: CacheValue>(&self, value: &T) -> Result<bool>;

    /// Save a feature for an explicit user.
    async fn save_user_feature_for<T: CacheValue>(&self, user_id: u64, value: &T) -> Result<bool>;

    /// Fetch the current user's feature of type `T`.
    async fn get_user_feature<T: CacheValue>(&self) -> Result<Option<T>>;

    /// Fetch an explicit user's feature of type `T`.
    async fn get_user_feature_for<T: CacheValue>(&self, user_id: u64) -> Result<Option<T>>;

    /// Delete the current user's feature. Returns `Ok(false)` when absent.
    async fn delete_user_feature<T: TypeKeyed>(&self) -> Result<bool>;

    /// Delete an explicit user's feature. Returns `Ok(false)` when absent.
    async fn delete_user_feature_for<T: TypeKeyed>(&self, user_id: u64) -> Result<bool>;

    /// Whether the current user has a feature of type `T`.
    async fn user_feature_exists<T: TypeKeyed>(&self) -> Result<bool>;

    /// Delete one feature kind for many users.
    ///
    /// Each user is attempted independently, sequentially, with no
    /// short-circuit; the result is `Ok(true)` only if every deletion
    /// succeeded.
    async fn delete_feature_for_users<T: TypeKeyed>(&self, user_ids: &[u64]) -> Result<bool> {
        let mut all_deleted = true;
        for user_id in user_ids {
            if !self.delete_user_feature_for::<T>(*user_id).await? {
                all_deleted = false;
            }
        }
        Ok(all_deleted)
    }

    /// Drop a user's entire feature namespace.
    async fn delete_user_cache(&self, user_id: u64) -> Result<bool>;
}

/// The full provider contract: all three capability groups plus the
/// connection lifecycle.
#[allow(async_fn_in_trait)]
pub trait StoreProvider:
    ObjectStore + KeyValueStore + UserFeatureStore + Send + Sync + Clone
{
    /// Bind the current user and establish the store connection.
    ///
    /// Safe to call once per worker lifetime; calling again rebinds the
    /// current user.
    async fn connect(&self, user_id: u64) -> Result<bool>;

    /// Release the connection. Subsequent operations fail fast with
    /// `ConnectionError` rather than silently no-op.
    async fn disconnect(&self) -> Result<bool>;

    /// Whether a connection is currently bound.
    fn is_connected(&self) -> bool;

    /// Whether any entry exists under the type's derived key, across both
    /// storage shapes (hash namespace or flat singleton key).
    async fn type_exists<T: TypeKeyed>(&self) -> Result<bool>;

    /// Destructive flush of every namespace.
    ///
    /// On replicated stores this must be routed to the node that is
    /// authoritative for writes.
    async fn clear_all(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::TypeKeyed;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
    struct Widget {
        id: i64,
        name: String,
    }

    impl TypeKeyed for Widget {
        fn type_key() -> &'static str {
            "widget"
        }
    }

    impl CacheEntity for Widget {
        fn entity_id(&self) -> i64 {
            self.id
        }
        fn display_name(&self) -> &str {
            &self.name
        }
    }

    #[tokio::test]
    async fn test_default_save_objects_saves_all() {
        let provider = InMemoryProvider::new();
        provider.connect(1).await.expect("Failed to connect");

        let widgets: Vec<Widget> = (0..5)
            .map(|i| Widget {
                id: i,
                name: format!("widget {}", i),
            })
            .collect();

        let all_saved = provider
            .save_objects(&widgets)
            .await
            .expect("Failed to save objects");
        assert!(all_saved);

        let stored = provider
            .get_all_objects::<Widget>()
            .await
            .expect("Failed to get all");
        assert_eq!(stored.len(), 5);
    }

    #[tokio::test]
    async fn test_default_bulk_feature_delete_reports_missing() {
        let provider = InMemoryProvider::new();
        provider.connect(1).await.expect("Failed to connect");

        let widget = Widget {
            id: 1,
            name: "w".to_string(),
        };
        provider
            .save_user_feature_for(10, &widget)
            .await
            .expect("Failed to save feature");

        // User 11 never had the feature, so the aggregate result is false.
        let all_deleted = provider
            .delete_feature_for_users::<Widget>(&[10, 11])
            .await
            .expect("Failed to bulk delete");
        assert!(!all_deleted);

        assert!(provider
            .get_user_feature_for::<Widget>(10)
            .await
            .expect("Failed to get feature")
            .is_none());
    }
}
