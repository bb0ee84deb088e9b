//! High-level cache worker facade.
//!
//! `CacheWorker` is the single entry point application code talks to. It
//! binds a user session to a store provider, forwards the typed storage
//! operations, and layers the composite flows on top: get-or-load,
//! load-for-user, and the advisory lock protocol.
//!
//! ```no_run
//! # use cache_dal::{CacheWorker, InMemoryProvider, Result};
//! # use cache_dal::TypeKeyed;
//! # use serde::{Deserialize, Serialize};
//! # #[derive(Clone, Serialize, Deserialize)]
//! # struct Dashboard { widgets: Vec<String> }
//! # impl TypeKeyed for Dashboard {
//! #     fn type_key() -> &'static str { "dashboard" }
//! # }
//! # async fn example() -> Result<()> {
//! let worker = CacheWorker::connect(42, InMemoryProvider::new()).await?;
//!
//! let dashboard = worker
//!     .get_or_load(|| Dashboard { widgets: vec!["uptime".to_string()] })
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::entity::{CacheEntity, CacheValue, TypeKeyed};
use crate::error::Result;
use crate::key::KeySchema;
use crate::lock::LockModel;
use crate::observability::{CacheMetrics, NoOpMetrics};
use crate::provider::StoreProvider;
use std::marker::PhantomData;
use std::time::{Duration, Instant, SystemTime};

/// Cache worker bound to one user session and one provider.
pub struct CacheWorker<P: StoreProvider> {
    provider: P,
    metrics: Box<dyn CacheMetrics>,
}

impl<P: StoreProvider> CacheWorker<P> {
    /// Connect the provider for `user_id` and wrap it in a worker.
    ///
    /// # Errors
    /// Returns `Err` if the provider cannot establish its connection.
    pub async fn connect(user_id: u64, provider: P) -> Result<Self> {
        provider.connect(user_id).await?;
        info!("✓ Cache worker ready for user {}", user_id);
        Ok(CacheWorker {
            provider,
            metrics: Box::new(NoOpMetrics),
        })
    }

    /// Replace the metrics sink.
    pub fn with_metrics(mut self, metrics: Box<dyn CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Direct access to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn is_connected(&self) -> bool {
        self.provider.is_connected()
    }

    /// Release the provider connection.
    pub async fn disconnect(&self) -> Result<bool> {
        self.provider.disconnect().await
    }

    // ---- object storage ----

    pub async fn save_object<T: CacheEntity>(&self, value: &T) -> Result<bool> {
        let key = KeySchema::namespace_for::<T>()?;
        let started = Instant::now();
        let saved = self.provider.save_object(value).await?;
        self.metrics.record_set(&key, started.elapsed());
        Ok(saved)
    }

    pub async fn save_objects<T: CacheEntity>(&self, values: &[T]) -> Result<bool> {
        self.provider.save_objects(values).await
    }

    pub async fn get_object_by_id<T: CacheEntity>(&self, id: i64) -> Result<Option<T>> {
        self.provider.get_object_by_id(id).await
    }

    /// Fetch an object addressed by a raw field key rather than an id.
    pub async fn get_object_by_field<T: CacheEntity>(&self, field: &str) -> Result<Option<T>> {
        self.provider.get_object_by_field(field).await
    }

    pub async fn get_all_objects<T: CacheEntity>(&self) -> Result<Vec<T>> {
        self.provider.get_all_objects().await
    }

    /// Delete the stored entry for this value, addressed by its id.
    pub async fn delete_object<T: CacheEntity>(&self, value: &T) -> Result<bool> {
        self.provider.delete_object_by_id::<T>(value.entity_id()).await
    }

    pub async fn delete_object_by_id<T: CacheEntity>(&self, id: i64) -> Result<bool> {
        let key = KeySchema::namespace_for::<T>()?;
        let started = Instant::now();
        let deleted = self.provider.delete_object_by_id::<T>(id).await?;
        if deleted {
            self.metrics.record_delete(&key, started.elapsed());
        }
        Ok(deleted)
    }

    /// Whether anything is stored under `T`'s derived key, in either
    /// storage shape.
    pub async fn key_exists<T: TypeKeyed>(&self) -> Result<bool> {
        self.provider.type_exists::<T>().await
    }

    // ---- singleton key-value storage ----

    /// Store `T`'s singleton value with a TTL in minutes.
    pub async fn save_key_value<T: CacheValue>(&self, value: &T, ttl_minutes: u64) -> Result<bool> {
        let key = KeySchema::namespace_for::<T>()?;
        let started = Instant::now();
        let saved = self
            .provider
            .save_key_value(value, Duration::from_secs(ttl_minutes * 60))
            .await?;
        self.metrics.record_set(&key, started.elapsed());
        Ok(saved)
    }

    pub async fn get_key_value<T: CacheValue>(&self) -> Result<Option<T>> {
        self.provider.get_key_value().await
    }

    pub async fn delete_key<T: TypeKeyed>(&self) -> Result<bool> {
        let key = KeySchema::namespace_for::<T>()?;
        let started = Instant::now();
        let deleted = self.provider.delete_key::<T>().await?;
        if deleted {
            self.metrics.record_delete(&key, started.elapsed());
        }
        Ok(deleted)
    }

    // ---- per-user features ----

    pub async fn save_user_feature<T: CacheValue>(&self, value: &T) -> Result<bool> {
        self.provider.save_user_feature(value).await
    }

    pub async fn save_user_feature_for<T: CacheValue>(
        &self,
        user_id: u64,
        value: &T,
    ) -> Result<bool> {
        self.provider.save_user_feature_for(user_id, value).await
    }

    /// Produce a feature value with `loader` and store it for the current
    /// user. The loader always runs; this is a write-through, not a cache
    /// fill.
    pub async fn save_user_feature_with<T, F>(&self, loader: F) -> Result<bool>
    where
        T: CacheValue,
        F: FnOnce() -> T,
    {
        let value = loader();
        self.provider.save_user_feature(&value).await
    }

    pub async fn get_user_feature<T: CacheValue>(&self) -> Result<Option<T>> {
        self.provider.get_user_feature().await
    }

    pub async fn get_user_feature_for<T: CacheValue>(&self, user_id: u64) -> Result<Option<T>> {
        self.provider.get_user_feature_for(user_id).await
    }

    /// Fetch the current user's feature and map it through `parser`,
    /// which also sees absence.
    pub async fn get_user_feature_map<T, U, F>(&self, parser: F) -> Result<U>
    where
        T: CacheValue,
        F: FnOnce(Option<T>) -> U,
    {
        let feature = self.provider.get_user_feature::<T>().await?;
        Ok(parser(feature))
    }

    pub async fn delete_user_feature<T: TypeKeyed>(&self) -> Result<bool> {
        self.provider.delete_user_feature::<T>().await
    }

    pub async fn delete_user_feature_for<T: TypeKeyed>(&self, user_id: u64) -> Result<bool> {
        self.provider.delete_user_feature_for::<T>(user_id).await
    }

    pub async fn delete_feature_for_users<T: TypeKeyed>(&self, user_ids: &[u64]) -> Result<bool> {
        self.provider.delete_feature_for_users::<T>(user_ids).await
    }

    pub async fn has_user_feature<T: TypeKeyed>(&self) -> Result<bool> {
        self.provider.user_feature_exists::<T>().await
    }

    /// Drop every feature cached for `user_id`.
    pub async fn clear_user_cache(&self, user_id: u64) -> Result<bool> {
        self.provider.delete_user_cache(user_id).await
    }

    // ---- composite flows ----

    /// Return the current user's cached `T`, or produce one with `loader`,
    /// cache it, and return it.
    ///
    /// Never reports absence: if the value vanishes between the existence
    /// check and the read (TTL expiry, concurrent eviction), the loader runs
    /// and its result is returned.
    pub async fn get_or_load<T, F>(&self, loader: F) -> Result<T>
    where
        T: CacheValue,
        F: FnOnce() -> T,
    {
        let key = KeySchema::namespace_for::<T>()?;
        let started = Instant::now();
        match self.get_or_load_inner(&key, started, loader).await {
            Ok(value) => Ok(value),
            Err(e) => {
                self.metrics.record_error(&key, &e.to_string());
                Err(e)
            }
        }
    }

    async fn get_or_load_inner<T, F>(&self, key: &str, started: Instant, loader: F) -> Result<T>
    where
        T: CacheValue,
        F: FnOnce() -> T,
    {
        if self.provider.user_feature_exists::<T>().await? {
            if let Some(value) = self.provider.get_user_feature::<T>().await? {
                self.metrics.record_hit(key, started.elapsed());
                return Ok(value);
            }
            // Vanished between the check and the read; fall through.
        }

        let value = loader();
        self.provider.save_user_feature(&value).await?;
        self.metrics.record_miss(key, started.elapsed());
        Ok(value)
    }

    /// Produce a fresh `T` with `loader`, cache it for `user_id`, and
    /// return it. The loader always runs.
    pub async fn load_for_user<T, F>(&self, user_id: u64, loader: F) -> Result<T>
    where
        T: CacheValue,
        F: FnOnce() -> T,
    {
        let value = loader();
        self.provider.save_user_feature_for(user_id, &value).await?;
        Ok(value)
    }

    // ---- advisory locks, object flavor ----
    //
    // The object flavor stores the marker through the ordinary object path:
    // no TTL, explicit unlock, staleness judged by the reader against a
    // caller-supplied threshold. The check-then-act pairs below are not
    // atomic: two workers racing through `lock_if_absent` can both observe
    // absence and both write a marker. Callers needing hard mutual
    // exclusion must bring a store-side primitive.

    /// Write a lock marker for `L` unless one already exists.
    pub async fn lock_if_absent<L: LockModel>(&self) -> Result<()> {
        self.lock_if_absent_at::<L>(SystemTime::now()).await
    }

    /// Deterministic variant taking the acquisition timestamp explicitly.
    pub async fn lock_if_absent_at<L: LockModel>(&self, now: SystemTime) -> Result<()> {
        if !self.provider.type_exists::<L>().await? {
            let marker = L::acquire(now);
            self.provider.save_object(&marker).await?;
            debug!("✓ Acquired {} (object flavor)", L::type_key());
        }
        Ok(())
    }

    /// Remove every `L` marker, releasing the object-flavor lock.
    pub async fn unlock<L: LockModel>(&self) -> Result<()> {
        if self.provider.type_exists::<L>().await? {
            let markers = self.provider.get_all_objects::<L>().await?;
            for marker in &markers {
                self.provider
                    .delete_object_by_id::<L>(marker.entity_id())
                    .await?;
            }
            debug!("✓ Released {} (object flavor)", L::type_key());
        }
        Ok(())
    }

    /// Whether an `L` marker exists and is younger than `threshold_hours`.
    ///
    /// A marker older than the threshold counts as unlocked: the holder is
    /// presumed dead and the caller may proceed.
    pub async fn is_locked<L: LockModel>(&self, threshold_hours: u64) -> Result<bool> {
        self.is_locked_at::<L>(threshold_hours, SystemTime::now())
            .await
    }

    /// Deterministic variant evaluating the threshold against `now`.
    pub async fn is_locked_at<L: LockModel>(
        &self,
        threshold_hours: u64,
        now: SystemTime,
    ) -> Result<bool> {
        if !self.provider.type_exists::<L>().await? {
            return Ok(false);
        }
        let markers = self.provider.get_all_objects::<L>().await?;
        match markers.first() {
            Some(marker) => Ok(within_threshold(marker.created_at(), threshold_hours, now)),
            None => Ok(false),
        }
    }

    // ---- advisory locks, key-value flavor ----
    //
    // The key-value flavor stores the marker as `L`'s singleton with the
    // kind's own expiration as the store TTL, so an abandoned lock clears
    // itself without an unlock.

    /// Write (or refresh) the key-value lock marker for `L`.
    ///
    /// Unconditional overwrite: re-locking restarts both the timestamp and
    /// the TTL.
    pub async fn lock_with_expiration<L: LockModel>(&self) -> Result<bool> {
        self.lock_with_expiration_at::<L>(SystemTime::now()).await
    }

    /// Deterministic variant taking the acquisition timestamp explicitly.
    ///
    /// The store TTL still runs on the real clock; only the marker's
    /// recorded timestamp is controlled.
    pub async fn lock_with_expiration_at<L: LockModel>(&self, now: SystemTime) -> Result<bool> {
        let marker = L::acquire(now);
        let saved = self
            .provider
            .save_key_value(&marker, L::expiration())
            .await?;
        debug!("✓ Acquired {} (key-value flavor)", L::type_key());
        Ok(saved)
    }

    /// Acquire the key-value lock and hand back a handle that can refresh
    /// it while long work proceeds.
    pub async fn lock_with_expiration_handle<L: LockModel>(
        &self,
    ) -> Result<LockHandle<'_, P, L>> {
        self.lock_with_expiration::<L>().await?;
        Ok(LockHandle {
            worker: self,
            _kind: PhantomData,
        })
    }

    /// Delete the key-value lock marker. Returns `Ok(false)` when it had
    /// already expired or was never held.
    pub async fn unlock_with_expiration<L: LockModel>(&self) -> Result<bool> {
        self.provider.delete_key::<L>().await
    }

    /// Whether a live `L` key-value marker exists and is younger than
    /// `threshold_hours`.
    pub async fn is_locked_with_expiration<L: LockModel>(
        &self,
        threshold_hours: u64,
    ) -> Result<bool> {
        self.is_locked_with_expiration_at::<L>(threshold_hours, SystemTime::now())
            .await
    }

    /// Deterministic variant evaluating the threshold against `now`.
    pub async fn is_locked_with_expiration_at<L: LockModel>(
        &self,
        threshold_hours: u64,
        now: SystemTime,
    ) -> Result<bool> {
        if !self.provider.type_exists::<L>().await? {
            return Ok(false);
        }
        match self.provider.get_key_value::<L>().await? {
            Some(marker) => Ok(within_threshold(marker.created_at(), threshold_hours, now)),
            None => Ok(false),
        }
    }

    /// Whether any live `L` marker exists at all, ignoring its age.
    pub async fn is_locked_with_expiration_any<L: LockModel>(&self) -> Result<bool> {
        self.provider.type_exists::<L>().await
    }

    // ---- maintenance ----

    /// Destructive flush of the whole store.
    pub async fn clear_cache(&self) -> Result<()> {
        self.provider.clear_all().await
    }
}

/// A held key-value lock that can be refreshed during long work.
///
/// Dropping the handle does not release the lock; the TTL (or an explicit
/// `unlock_with_expiration`) does.
pub struct LockHandle<'a, P: StoreProvider, L: LockModel> {
    worker: &'a CacheWorker<P>,
    _kind: PhantomData<L>,
}

impl<'a, P: StoreProvider, L: LockModel> LockHandle<'a, P, L> {
    /// Re-acquire the marker, restarting its timestamp and TTL.
    pub async fn refresh(&self) -> Result<bool> {
        self.worker.lock_with_expiration::<L>().await
    }

    /// Release the lock explicitly.
    pub async fn release(self) -> Result<bool> {
        self.worker.unlock_with_expiration::<L>().await
    }
}

/// Lock-staleness predicate shared by both flavors: the marker counts as
/// held iff `created_at + threshold_hours` has not yet passed `now`.
fn within_threshold(created_at: SystemTime, threshold_hours: u64, now: SystemTime) -> bool {
    match created_at.checked_add(Duration::from_secs(threshold_hours * 3600)) {
        Some(deadline) => deadline >= now,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InMemoryProvider;
    use serde::{Deserialize, Serialize};
    use std::cell::Cell;

    #[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
    struct Profile {
        id: i64,
        name: String,
    }

    impl TypeKeyed for Profile {
        fn type_key() -> &'static str {
            "profile"
        }
    }

    impl CacheEntity for Profile {
        fn entity_id(&self) -> i64 {
            self.id
        }
        fn display_name(&self) -> &str {
            &self.name
        }
    }

    #[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
    struct Preferences {
        language: String,
    }

    impl TypeKeyed for Preferences {
        fn type_key() -> &'static str {
            "preferences"
        }
    }

    #[derive(Clone, Serialize, Deserialize)]
    struct RebuildLock {
        id: i64,
        name: String,
        created_at: SystemTime,
    }

    impl TypeKeyed for RebuildLock {
        fn type_key() -> &'static str {
            "rebuild_lock"
        }
    }

    impl CacheEntity for RebuildLock {
        fn entity_id(&self) -> i64 {
            self.id
        }
        fn display_name(&self) -> &str {
            &self.name
        }
    }

    impl LockModel for RebuildLock {
        const EXPIRATION_MINUTES: u32 = 30;

        fn acquire(created_at: SystemTime) -> Self {
            RebuildLock {
                id: 0,
                name: String::new(),
                created_at,
            }
        }

        fn created_at(&self) -> SystemTime {
            self.created_at
        }
    }

    async fn worker() -> CacheWorker<InMemoryProvider> {
        CacheWorker::connect(1, InMemoryProvider::new())
            .await
            .expect("Failed to connect worker")
    }

    fn prefs(language: &str) -> Preferences {
        Preferences {
            language: language.to_string(),
        }
    }

    #[tokio::test]
    async fn test_connect_binds_provider() {
        let worker = worker().await;
        assert!(worker.is_connected());
        worker.disconnect().await.expect("Failed to disconnect");
        assert!(!worker.is_connected());
    }

    #[tokio::test]
    async fn test_object_passthrough() {
        let worker = worker().await;
        let profile = Profile {
            id: 9,
            name: "nine".to_string(),
        };

        worker.save_object(&profile).await.expect("Failed to save");
        assert!(worker
            .key_exists::<Profile>()
            .await
            .expect("Failed to check key"));

        let found = worker
            .get_object_by_id::<Profile>(9)
            .await
            .expect("Failed to get");
        assert_eq!(found, Some(profile.clone()));

        assert!(worker
            .delete_object(&profile)
            .await
            .expect("Failed to delete"));
        assert!(worker
            .get_object_by_id::<Profile>(9)
            .await
            .expect("Failed to get")
            .is_none());
    }

    #[tokio::test]
    async fn test_get_or_load_runs_loader_once() {
        let worker = worker().await;
        let calls = Cell::new(0u32);

        let first = worker
            .get_or_load(|| {
                calls.set(calls.get() + 1);
                prefs("en")
            })
            .await
            .expect("Failed to get or load");
        assert_eq!(first, prefs("en"));

        let second = worker
            .get_or_load(|| {
                calls.set(calls.get() + 1);
                prefs("fr")
            })
            .await
            .expect("Failed to get or load");

        // Second call is a hit; the fr loader never runs.
        assert_eq!(second, prefs("en"));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_load_for_user_always_refreshes() {
        let worker = worker().await;

        worker
            .load_for_user(7, || prefs("en"))
            .await
            .expect("Failed to load for user");
        let refreshed = worker
            .load_for_user(7, || prefs("de"))
            .await
            .expect("Failed to load for user");

        assert_eq!(refreshed, prefs("de"));
        assert_eq!(
            worker
                .get_user_feature_for::<Preferences>(7)
                .await
                .expect("Failed to get feature"),
            Some(prefs("de"))
        );
    }

    #[tokio::test]
    async fn test_feature_map_sees_absence() {
        let worker = worker().await;

        let language = worker
            .get_user_feature_map(|prefs: Option<Preferences>| {
                prefs.map(|p| p.language).unwrap_or_else(|| "en".to_string())
            })
            .await
            .expect("Failed to map feature");
        assert_eq!(language, "en");
    }

    #[tokio::test]
    async fn test_object_lock_lifecycle() {
        let worker = worker().await;
        let t0 = SystemTime::now();

        assert!(!worker
            .is_locked_at::<RebuildLock>(1, t0)
            .await
            .expect("Failed to check lock"));

        worker
            .lock_if_absent_at::<RebuildLock>(t0)
            .await
            .expect("Failed to lock");
        assert!(worker
            .is_locked_at::<RebuildLock>(1, t0)
            .await
            .expect("Failed to check lock"));

        worker
            .unlock::<RebuildLock>()
            .await
            .expect("Failed to unlock");
        assert!(!worker
            .is_locked_at::<RebuildLock>(1, t0)
            .await
            .expect("Failed to check lock"));
    }

    #[tokio::test]
    async fn test_object_lock_is_stale_past_threshold() {
        let worker = worker().await;
        let t0 = SystemTime::now();

        worker
            .lock_if_absent_at::<RebuildLock>(t0)
            .await
            .expect("Failed to lock");

        let later = t0 + Duration::from_secs(3 * 3600);
        assert!(worker
            .is_locked_at::<RebuildLock>(4, later)
            .await
            .expect("Failed to check lock"));
        assert!(!worker
            .is_locked_at::<RebuildLock>(2, later)
            .await
            .expect("Failed to check lock"));
    }

    #[tokio::test]
    async fn test_lock_if_absent_does_not_refresh() {
        let worker = worker().await;
        let t0 = SystemTime::now();

        worker
            .lock_if_absent_at::<RebuildLock>(t0)
            .await
            .expect("Failed to lock");
        // A second acquisition attempt leaves the original timestamp.
        worker
            .lock_if_absent_at::<RebuildLock>(t0 + Duration::from_secs(3600))
            .await
            .expect("Failed to lock");

        let markers = worker
            .get_all_objects::<RebuildLock>()
            .await
            .expect("Failed to get markers");
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].created_at(), t0);
    }

    #[tokio::test]
    async fn test_relock_after_unlock_reacquires() {
        let worker = worker().await;
        let t0 = SystemTime::now();
        let t1 = t0 + Duration::from_secs(600);

        worker
            .lock_if_absent_at::<RebuildLock>(t0)
            .await
            .expect("Failed to lock");
        worker
            .unlock::<RebuildLock>()
            .await
            .expect("Failed to unlock");

        // The unlocked kind must be acquirable again, with a fresh marker.
        worker
            .lock_if_absent_at::<RebuildLock>(t1)
            .await
            .expect("Failed to re-lock");

        let markers = worker
            .get_all_objects::<RebuildLock>()
            .await
            .expect("Failed to get markers");
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].created_at(), t1);
        assert!(worker
            .is_locked_at::<RebuildLock>(1, t1)
            .await
            .expect("Failed to check lock"));
    }

    #[tokio::test]
    async fn test_expiring_lock_lifecycle() {
        let worker = worker().await;
        let t0 = SystemTime::now();

        worker
            .lock_with_expiration_at::<RebuildLock>(t0)
            .await
            .expect("Failed to lock");

        assert!(worker
            .is_locked_with_expiration_at::<RebuildLock>(0, t0)
            .await
            .expect("Failed to check lock"));
        assert!(worker
            .is_locked_with_expiration_any::<RebuildLock>()
            .await
            .expect("Failed to check lock"));

        // Past the kind's own expiration converted to a threshold.
        let past = t0 + Duration::from_secs(3600);
        assert!(!worker
            .is_locked_with_expiration_at::<RebuildLock>(0, past)
            .await
            .expect("Failed to check lock"));

        assert!(worker
            .unlock_with_expiration::<RebuildLock>()
            .await
            .expect("Failed to unlock"));
        assert!(!worker
            .is_locked_with_expiration_any::<RebuildLock>()
            .await
            .expect("Failed to check lock"));
    }

    #[tokio::test]
    async fn test_expiring_lock_relock_refreshes_timestamp() {
        let worker = worker().await;
        let t0 = SystemTime::now();
        let t1 = t0 + Duration::from_secs(600);

        worker
            .lock_with_expiration_at::<RebuildLock>(t0)
            .await
            .expect("Failed to lock");
        worker
            .lock_with_expiration_at::<RebuildLock>(t1)
            .await
            .expect("Failed to re-lock");

        let marker = worker
            .get_key_value::<RebuildLock>()
            .await
            .expect("Failed to get marker")
            .expect("Marker missing");
        assert_eq!(marker.created_at(), t1);
    }

    #[tokio::test]
    async fn test_lock_handle_refresh_and_release() {
        let worker = worker().await;

        let handle = worker
            .lock_with_expiration_handle::<RebuildLock>()
            .await
            .expect("Failed to lock");
        assert!(worker
            .is_locked_with_expiration_any::<RebuildLock>()
            .await
            .expect("Failed to check lock"));

        assert!(handle.refresh().await.expect("Failed to refresh"));
        assert!(handle.release().await.expect("Failed to release"));
        assert!(!worker
            .is_locked_with_expiration_any::<RebuildLock>()
            .await
            .expect("Failed to check lock"));
    }

    #[tokio::test]
    async fn test_metrics_record_all_outcomes() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        #[derive(Clone, Default)]
        struct Counting {
            hits: Arc<AtomicUsize>,
            misses: Arc<AtomicUsize>,
            sets: Arc<AtomicUsize>,
            deletes: Arc<AtomicUsize>,
            errors: Arc<AtomicUsize>,
        }

        impl CacheMetrics for Counting {
            fn record_hit(&self, _key: &str, _duration: Duration) {
                self.hits.fetch_add(1, Ordering::Relaxed);
            }
            fn record_miss(&self, _key: &str, _duration: Duration) {
                self.misses.fetch_add(1, Ordering::Relaxed);
            }
            fn record_set(&self, _key: &str, _duration: Duration) {
                self.sets.fetch_add(1, Ordering::Relaxed);
            }
            fn record_delete(&self, _key: &str, _duration: Duration) {
                self.deletes.fetch_add(1, Ordering::Relaxed);
            }
            fn record_error(&self, _key: &str, _error: &str) {
                self.errors.fetch_add(1, Ordering::Relaxed);
            }
        }

        let counting = Counting::default();
        let worker = worker().await.with_metrics(Box::new(counting.clone()));

        worker
            .get_or_load(|| prefs("en"))
            .await
            .expect("Failed to get or load");
        worker
            .get_or_load(|| prefs("en"))
            .await
            .expect("Failed to get or load");
        assert_eq!(counting.misses.load(Ordering::Relaxed), 1);
        assert_eq!(counting.hits.load(Ordering::Relaxed), 1);

        let profile = Profile {
            id: 1,
            name: "one".to_string(),
        };
        worker.save_object(&profile).await.expect("Failed to save");
        assert_eq!(counting.sets.load(Ordering::Relaxed), 1);

        worker
            .delete_object_by_id::<Profile>(1)
            .await
            .expect("Failed to delete");
        assert_eq!(counting.deletes.load(Ordering::Relaxed), 1);

        worker.disconnect().await.expect("Failed to disconnect");
        assert!(worker.get_or_load(|| prefs("en")).await.is_err());
        assert_eq!(counting.errors.load(Ordering::Relaxed), 1);
    }
}
