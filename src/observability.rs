//! Metrics hooks for cache operations.
//!
//! The worker reports hits, misses, writes and errors through the
//! [`CacheMetrics`] trait. The default implementation is a no-op; plug in
//! your own to feed a monitoring system:
//!
//! ```ignore
//! use cache_dal::observability::CacheMetrics;
//! use std::time::Duration;
//!
//! struct PrometheusMetrics;
//!
//! impl CacheMetrics for PrometheusMetrics {
//!     fn record_hit(&self, _key: &str, _duration: Duration) {
//!         // counter!("cache_hits").inc();
//!     }
//!     // ... other methods as needed
//! }
//! ```

use std::time::Duration;

/// Trait for cache metrics collection.
///
/// Default method bodies log via the `log` crate, so a partial
/// implementation still leaves a trace.
pub trait CacheMetrics: Send + Sync {
    /// Record a cache hit.
    fn record_hit(&self, key: &str, duration: Duration) {
        debug!("Cache HIT: {} took {:?}", key, duration);
    }

    /// Record a cache miss.
    fn record_miss(&self, key: &str, duration: Duration) {
        debug!("Cache MISS: {} took {:?}", key, duration);
    }

    /// Record a cache write.
    fn record_set(&self, key: &str, duration: Duration) {
        debug!("Cache SET: {} took {:?}", key, duration);
    }

    /// Record a cache delete.
    fn record_delete(&self, key: &str, duration: Duration) {
        debug!("Cache DELETE: {} took {:?}", key, duration);
    }

    /// Record an error.
    fn record_error(&self, key: &str, error: &str) {
        warn!("Cache ERROR for {}: {}", key, error);
    }
}

/// Default metrics implementation (no-op).
#[derive(Clone, Default)]
pub struct NoOpMetrics;

impl CacheMetrics for NoOpMetrics {
    fn record_hit(&self, _key: &str, _duration: Duration) {}
    fn record_miss(&self, _key: &str, _duration: Duration) {}
    fn record_set(&self, _key: &str, _duration: Duration) {}
    fn record_delete(&self, _key: &str, _duration: Duration) {}
    fn record_error(&self, _key: &str, _error: &str) {}
}
