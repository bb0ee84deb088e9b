//! Advisory lock model taxonomy.
//!
//! A lock here is not a mutual-exclusion primitive. It is a presence marker
//! stored through the normal cache paths: a value whose existence (and
//! creation timestamp) signals "resource busy" to cooperating workers. The
//! store never enforces it against other writers.
//!
//! Each concrete lock kind hard-codes its own expiration as an associated
//! constant. New kinds are added by declaring a new type with a new constant,
//! never by parameterizing an existing one at runtime:
//!
//! ```
//! use cache_dal::{CacheEntity, LockModel, TypeKeyed};
//! use serde::{Deserialize, Serialize};
//! use std::time::SystemTime;
//!
//! #[derive(Clone, Serialize, Deserialize)]
//! struct RebuildIndexLock {
//!     id: i64,
//!     name: String,
//!     created_at: SystemTime,
//! }
//!
//! impl TypeKeyed for RebuildIndexLock {
//!     fn type_key() -> &'static str {
//!         "rebuild_index_lock"
//!     }
//! }
//!
//! impl CacheEntity for RebuildIndexLock {
//!     fn entity_id(&self) -> i64 {
//!         self.id
//!     }
//!     fn display_name(&self) -> &str {
//!         &self.name
//!     }
//! }
//!
//! impl LockModel for RebuildIndexLock {
//!     const EXPIRATION_MINUTES: u32 = 30;
//!
//!     fn acquire(created_at: SystemTime) -> Self {
//!         RebuildIndexLock {
//!             id: 0,
//!             name: String::new(),
//!             created_at,
//!         }
//!     }
//!
//!     fn created_at(&self) -> SystemTime {
//!         self.created_at
//!     }
//! }
//! ```

use crate::entity::CacheEntity;
use std::time::{Duration, SystemTime};

/// A lock marker value: a `CacheEntity` carrying a creation timestamp and a
/// per-kind fixed expiration.
///
/// Lifecycle: created on lock, `created_at` refreshed on re-lock, deleted
/// explicitly on unlock — or, on the key-value path, left to expire passively
/// through the store's TTL.
pub trait LockModel: CacheEntity {
    /// Fixed expiration for this lock kind. Not runtime-configurable.
    const EXPIRATION_MINUTES: u32;

    /// Construct a fresh marker acquired at `created_at`.
    ///
    /// Implementations should use id 0 and an empty name; the identity of
    /// a lock is its kind, not its id.
    fn acquire(created_at: SystemTime) -> Self;

    /// When this marker was (last) acquired.
    fn created_at(&self) -> SystemTime;

    /// The kind's expiration as a `Duration`.
    fn expiration() -> Duration {
        Duration::from_secs(u64::from(Self::EXPIRATION_MINUTES) * 60)
    }

    /// Whether the lock is still active when evaluated at `now`.
    ///
    /// Active iff `now < created_at + expiration`.
    fn is_active_at(&self, now: SystemTime) -> bool {
        match self.created_at().checked_add(Self::expiration()) {
            Some(expires_at) => now < expires_at,
            None => true,
        }
    }
}
