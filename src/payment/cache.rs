//! Time-bounded cache of payment-verification results.
//!
//! Caches the boolean outcome of an expensive verification (token signature
//! check or on-chain lookup) per (identity, amount threshold), so repeated
//! requests from a paid-up caller skip the external calls until the entry
//! ages out.

use lru::LruCache;
use parking_lot::Mutex;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default cache capacity.
const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Cache key: identity plus the amount threshold it was verified against.
///
/// Amounts are keyed in micro-units so f64 prices hash deterministically.
type CacheKey = (String, u64);

/// A stored verification result.
///
/// Entries are written whole and never partially updated; a hit does not
/// refresh `recorded_at`.
#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    verified: bool,
    recorded_at: Instant,
}

/// Cache statistics for monitoring.
#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    /// Number of live-entry hits.
    pub hits: u64,
    /// Number of misses (absent or expired).
    pub misses: u64,
    /// Number of entries written.
    pub insertions: u64,
}

impl CacheStats {
    /// Calculate hit rate as a percentage.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            {
                (self.hits as f64 / total as f64) * 100.0
            }
        }
    }
}

/// LRU cache of verification results with per-lookup TTL.
///
/// Expiry is lazy: an expired entry is treated as absent at lookup time and
/// overwritten on the next verification; capacity pressure is handled by LRU
/// eviction. Cloning shares the underlying cache.
#[derive(Clone)]
pub struct VerificationCache {
    inner: Arc<Mutex<LruCache<CacheKey, CacheEntry>>>,
    stats: Arc<Mutex<CacheStats>>,
}

impl VerificationCache {
    /// Create a new cache with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Create a new cache with the specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Mutex::new(LruCache::new(cap))),
            stats: Arc::new(Mutex::new(CacheStats::default())),
        }
    }

    /// Return the cached result for (identity, amount) if a live entry
    /// exists; expired entries count as misses.
    #[must_use]
    pub fn lookup(&self, identity: &str, amount: f64, ttl: Duration) -> Option<bool> {
        let key = (identity.to_string(), amount_key(amount));
        let mut cache = self.inner.lock();
        let live = cache
            .get(&key)
            .filter(|entry| entry.recorded_at.elapsed() < ttl)
            .map(|entry| entry.verified);

        let mut stats = self.stats.lock();
        if live.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        live
    }

    /// Record a verification result for (identity, amount), replacing any
    /// previous entry.
    pub fn store(&self, identity: &str, amount: f64, verified: bool) {
        let key = (identity.to_string(), amount_key(amount));
        self.inner.lock().put(
            key,
            CacheEntry {
                verified,
                recorded_at: Instant::now(),
            },
        );
        self.stats.lock().insertions += 1;
    }

    /// Return the cached result, invoking `verify` only on a miss.
    ///
    /// Concurrent misses for the same key may each invoke `verify` (the lock
    /// is not held across the await); once a live entry exists there is no
    /// re-verification until it expires.
    pub async fn get_or_verify<F, Fut>(
        &self,
        identity: &str,
        amount: f64,
        ttl: Duration,
        verify: F,
    ) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = bool>,
    {
        if let Some(verified) = self.lookup(identity, amount, ttl) {
            debug!(identity, verified, "verification cache hit");
            return verified;
        }
        let verified = verify().await;
        self.store(identity, amount, verified);
        verified
    }

    /// Get current cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats.lock().clone()
    }

    /// Get the current number of entries in the cache.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Clear all entries from the cache.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

impl Default for VerificationCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a currency amount to its micro-unit cache key.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn amount_key(amount: f64) -> u64 {
    (amount.max(0.0) * 1_000_000.0).round() as u64
}
