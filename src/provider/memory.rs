//! In-memory store provider backed by DashMap.
//!
//! Default provider, always available. Holds the same two storage shapes a
//! networked store would: hash namespaces (objects and per-user features) and
//! flat singleton keys with TTL. Payloads go through the same envelope codec
//! as every other provider, so codec bugs surface here first.
//!
//! TTL entries expire lazily, on access: a read that finds an expired entry
//! removes it and reports absence. There is no background sweeper.

use crate::entity::{CacheEntity, CacheValue, TypeKeyed};
use crate::error::{Error, Result};
use crate::key::KeySchema;
use crate::provider::{KeyValueStore, ObjectStore, StoreProvider, UserFeatureStore};
use crate::serialization::{deserialize_value, serialize_value};
use dashmap::DashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// A TTL-bearing singleton entry.
struct KvEntry {
    payload: String,
    expires_at: Instant,
}

impl KvEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory provider.
///
/// Cloning is cheap and clones share the same backing store, so one
/// "store" can serve several workers in tests.
#[derive(Clone)]
pub struct InMemoryProvider {
    /// Hash namespaces: object namespaces and per-user feature namespaces.
    hashes: Arc<DashMap<String, DashMap<String, String>>>,
    /// Flat singleton keys with TTL.
    singles: Arc<DashMap<String, KvEntry>>,
    /// Current user id; `None` means disconnected.
    session: Arc<RwLock<Option<u64>>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        InMemoryProvider {
            hashes: Arc::new(DashMap::new()),
            singles: Arc::new(DashMap::new()),
            session: Arc::new(RwLock::new(None)),
        }
    }

    fn session_user(&self) -> Result<Option<u64>> {
        self.session
            .read()
            .map(|guard| *guard)
            .map_err(|_| Error::Other("session lock poisoned".to_string()))
    }

    fn current_user(&self) -> Result<u64> {
        self.session_user()?.ok_or_else(|| {
            Error::ConnectionError("provider is not connected".to_string())
        })
    }

    fn ensure_connected(&self) -> Result<()> {
        self.current_user().map(|_| ())
    }

    /// Whether a live (non-expired) singleton entry exists, removing the
    /// entry if it has expired.
    fn singleton_live(&self, namespace: &str) -> bool {
        let expired = match self.singles.get(namespace) {
            Some(entry) => entry.is_expired(),
            None => return false,
        };
        if expired {
            self.singles.remove(namespace);
            return false;
        }
        true
    }

    fn hash_get(&self, namespace: &str, field: &str) -> Option<String> {
        self.hashes
            .get(namespace)
            .and_then(|fields| fields.get(field).map(|text| text.clone()))
    }

    fn hash_set(&self, namespace: String, field: String, text: String) {
        self.hashes.entry(namespace).or_default().insert(field, text);
    }

    fn hash_delete(&self, namespace: &str, field: &str) -> bool {
        let deleted = match self.hashes.get(namespace) {
            Some(fields) => fields.remove(field).is_some(),
            None => false,
        };
        if deleted {
            // Deleting the last field must drop the namespace itself, or
            // existence checks keep answering true for an empty hash.
            self.hashes
                .remove_if(namespace, |_, fields| fields.is_empty());
        }
        deleted
    }
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryProvider {
    async fn save_object<T: CacheEntity>(&self, value: &T) -> Result<bool> {
        self.ensure_connected()?;
        let namespace = KeySchema::namespace_for::<T>()?;
        let field = KeySchema::object_field(value.entity_id());
        let text = serialize_value(value)?;
        self.hash_set(namespace, field, text);
        debug!("✓ Saved {} '{}'", T::type_key(), value.display_name());
        Ok(true)
    }

    async fn get_object_by_id<T: CacheEntity>(&self, id: i64) -> Result<Option<T>> {
        self.ensure_connected()?;
        let namespace = KeySchema::namespace_for::<T>()?;
        let field = KeySchema::object_field(id);
        match self.hash_get(&namespace, &field) {
            Some(text) => Ok(Some(deserialize_value(&text)?)),
            None => Ok(None),
        }
    }

    async fn get_object_by_field<T: CacheEntity>(&self, field: &str) -> Result<Option<T>> {
        self.ensure_connected()?;
        let namespace = KeySchema::namespace_for::<T>()?;
        match self.hash_get(&namespace, field) {
            Some(text) => Ok(Some(deserialize_value(&text)?)),
            None => Ok(None),
        }
    }

    async fn get_all_objects<T: CacheEntity>(&self) -> Result<Vec<T>> {
        self.ensure_connected()?;
        let namespace = KeySchema::namespace_for::<T>()?;
        let texts: Vec<String> = match self.hashes.get(&namespace) {
            Some(fields) => fields.iter().map(|entry| entry.value().clone()).collect(),
            None => return Ok(Vec::new()),
        };
        let mut values = Vec::with_capacity(texts.len());
        for text in &texts {
            match deserialize_value(text) {
                Ok(value) => values.push(value),
                Err(e) => {
                    warn!("Skipping undecodable {} entry: {}", T::type_key(), e);
                }
            }
        }
        Ok(values)
    }

    async fn delete_object_by_id<T: CacheEntity>(&self, id: i64) -> Result<bool> {
        self.ensure_connected()?;
        let namespace = KeySchema::namespace_for::<T>()?;
        let field = KeySchema::object_field(id);
        let deleted = self.hash_delete(&namespace, &field);
        if deleted {
            debug!("✓ Deleted {} id {}", T::type_key(), id);
        }
        Ok(deleted)
    }
}

impl KeyValueStore for InMemoryProvider {
    async fn save_key_value<T: CacheValue>(&self, value: &T, ttl: Duration) -> Result<bool> {
        self.ensure_connected()?;
        let namespace = KeySchema::namespace_for::<T>()?;
        let text = serialize_value(value)?;
        self.singles.insert(
            namespace,
            KvEntry {
                payload: text,
                expires_at: Instant::now() + ttl,
            },
        );
        debug!("✓ Saved key {} with TTL {:?}", T::type_key(), ttl);
        Ok(true)
    }

    async fn get_key_value<T: CacheValue>(&self) -> Result<Option<T>> {
        self.ensure_connected()?;
        let namespace = KeySchema::namespace_for::<T>()?;
        if !self.singleton_live(&namespace) {
            return Ok(None);
        }
        match self.singles.get(&namespace) {
            Some(entry) => Ok(Some(deserialize_value(&entry.payload)?)),
            None => Ok(None),
        }
    }

    async fn delete_key<T: TypeKeyed>(&self) -> Result<bool> {
        self.ensure_connected()?;
        let namespace = KeySchema::namespace_for::<T>()?;
        if !self.singleton_live(&namespace) {
            return Ok(false);
        }
        Ok(self.singles.remove(&namespace).is_some())
    }
}

impl UserFeatureStore for InMemoryProvider {
    async fn save_user_feature<T: CacheValue>(&self, value: &T) -> Result<bool> {
        let user_id = self.current_user()?;
        self.save_user_feature_for(user_id, value).await
    }

    async fn save_user_feature_for<T: CacheValue>(&self, user_id: u64, value: &T) -> Result<bool> {
        self.ensure_connected()?;
        let namespace = KeySchema::user_namespace(user_id);
        let field = KeySchema::namespace_for::<T>()?;
        let text = serialize_value(value)?;
        self.hash_set(namespace, field, text);
        debug!("✓ Saved feature {} for user {}", T::type_key(), user_id);
        Ok(true)
    }

    async fn get_user_feature<T: CacheValue>(&self) -> Result<Option<T>> {
        let user_id = self.current_user()?;
        self.get_user_feature_for(user_id).await
    }

    async fn get_user_feature_for<T: CacheValue>(&self, user_id: u64) -> Result<Option<T>> {
        self.ensure_connected()?;
        let namespace = KeySchema::user_namespace(user_id);
        let field = KeySchema::namespace_for::<T>()?;
        match self.hash_get(&namespace, &field) {
            Some(text) => Ok(Some(deserialize_value(&text)?)),
            None => Ok(None),
        }
    }

    async fn delete_user_feature<T: TypeKeyed>(&self) -> Result<bool> {
        let user_id = self.current_user()?;
        self.delete_user_feature_for::<T>(user_id).await
    }

    async fn delete_user_feature_for<T: TypeKeyed>(&self, user_id: u64) -> Result<bool> {
        self.ensure_connected()?;
        let namespace = KeySchema::user_namespace(user_id);
        let field = KeySchema::namespace_for::<T>()?;
        Ok(self.hash_delete(&namespace, &field))
    }

    async fn user_feature_exists<T: TypeKeyed>(&self) -> Result<bool> {
        let user_id = self.current_user()?;
        let namespace = KeySchema::user_namespace(user_id);
        let field = KeySchema::namespace_for::<T>()?;
        Ok(self.hash_get(&namespace, &field).is_some())
    }

    async fn delete_user_cache(&self, user_id: u64) -> Result<bool> {
        self.ensure_connected()?;
        let namespace = KeySchema::user_namespace(user_id);
        let deleted = self.hashes.remove(&namespace).is_some();
        if deleted {
            info!("✓ Cleared cache for user {}", user_id);
        }
        Ok(deleted)
    }
}

impl StoreProvider for InMemoryProvider {
    async fn connect(&self, user_id: u64) -> Result<bool> {
        let mut guard = self
            .session
            .write()
            .map_err(|_| Error::Other("session lock poisoned".to_string()))?;
        *guard = Some(user_id);
        info!("✓ In-memory provider connected for user {}", user_id);
        Ok(true)
    }

    async fn disconnect(&self) -> Result<bool> {
        let mut guard = self
            .session
            .write()
            .map_err(|_| Error::Other("session lock poisoned".to_string()))?;
        *guard = None;
        info!("✓ In-memory provider disconnected");
        Ok(true)
    }

    fn is_connected(&self) -> bool {
        self.session_user().map(|s| s.is_some()).unwrap_or(false)
    }

    async fn type_exists<T: TypeKeyed>(&self) -> Result<bool> {
        self.ensure_connected()?;
        let namespace = KeySchema::namespace_for::<T>()?;
        Ok(self.hashes.contains_key(&namespace) || self.singleton_live(&namespace))
    }

    async fn clear_all(&self) -> Result<()> {
        self.ensure_connected()?;
        self.hashes.clear();
        self.singles.clear();
        warn!("✓ Flushed entire in-memory store");
        Ok(())
    }
}
