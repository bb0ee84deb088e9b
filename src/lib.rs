//! # cache-dal
//!
//! A type-keyed cache data-access layer for Rust.
//!
//! ## Features
//!
//! - **Type Keyed:** Every cacheable type declares its own storage key; no
//!   magic strings at call sites
//! - **Provider Agnostic:** In-memory and Redis providers behind one
//!   capability contract, custom providers via the same traits
//! - **Three Storage Shapes:** Id-addressed object collections, TTL'd
//!   singleton key-values, and per-user feature namespaces
//! - **Composite Flows:** Get-or-load and load-for-user built on the
//!   primitive operations
//! - **Advisory Locks:** Presence-marker locks in two flavors, with and
//!   without store-side expiration
//! - **Production Ready:** Built-in logging, metrics hooks, versioned
//!   payload envelopes, and typed errors
//!
//! ## Quick Start
//!
//! ```ignore
//! use cache_dal::{CacheEntity, CacheWorker, InMemoryProvider, TypeKeyed};
//! use serde::{Deserialize, Serialize};
//!
//! // 1. Define your cacheable type
//! #[derive(Clone, Serialize, Deserialize)]
//! struct Address {
//!     id: i64,
//!     street: String,
//! }
//!
//! // 2. Declare its storage key and identity
//! impl TypeKeyed for Address {
//!     fn type_key() -> &'static str { "address" }
//! }
//!
//! impl CacheEntity for Address {
//!     fn entity_id(&self) -> i64 { self.id }
//!     fn display_name(&self) -> &str { &self.street }
//! }
//!
//! // 3. Connect a worker and use it
//! let worker = CacheWorker::connect(42, InMemoryProvider::new()).await?;
//! worker.save_object(&Address { id: 1, street: "1 Main St".into() }).await?;
//! let found = worker.get_object_by_id::<Address>(1).await?;
//! ```
//!
//! With the `redis` feature enabled, swap in [`provider::RedisProvider`]
//! without touching call sites.

#[macro_use]
extern crate log;

pub mod entity;
pub mod error;
pub mod key;
pub mod lock;
pub mod observability;
pub mod provider;
pub mod serialization;
pub mod worker;

// Re-exports for convenience
pub use entity::{CacheEntity, CacheValue, TypeKeyed};
pub use error::{Error, Result};
pub use key::KeySchema;
pub use lock::LockModel;
pub use observability::{CacheMetrics, NoOpMetrics};
pub use provider::{
    InMemoryProvider, KeyValueStore, ObjectStore, StoreProvider, UserFeatureStore,
};
#[cfg(feature = "redis")]
pub use provider::{RedisConfig, RedisProvider};
pub use worker::{CacheWorker, LockHandle};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
