//! Exchange rate caching using Moka.
//!
//! The cache is an explicitly owned object injected into the conversion
//! service, not process-wide state. Entries expire after a configurable
//! TTL (24 hours by default).

use moka::future::Cache;
use rust_decimal::Decimal;
use std::time::Duration;

/// Default cache capacity (number of currency pairs).
const DEFAULT_CACHE_CAPACITY: u64 = 1_000;

/// Default time-to-live for cached rates (24 hours).
const DEFAULT_TTL_SECS: u64 = 86_400;

/// TTL cache for exchange rates, keyed by currency pair.
///
/// Thread-safe and suitable for concurrent access.
#[derive(Clone)]
pub struct RateCache {
    cache: Cache<(String, String), Decimal>,
}

impl RateCache {
    /// Creates a rate cache with default settings (1000 pairs, 24 h TTL).
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL_SECS)
    }

    /// Creates a rate cache with a custom TTL in seconds.
    #[must_use]
    pub fn with_ttl(ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(DEFAULT_CACHE_CAPACITY)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { cache }
    }

    /// Returns the cached rate for a currency pair, if still fresh.
    pub async fn get(&self, from: &str, to: &str) -> Option<Decimal> {
        self.cache.get(&(from.to_string(), to.to_string())).await
    }

    /// Stores a rate for a currency pair.
    pub async fn insert(&self, from: &str, to: &str, rate: Decimal) {
        self.cache
            .insert((from.to_string(), to.to_string()), rate)
            .await;
    }

    /// Drops all cached rates.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

impl Default for RateCache {
    fn default() -> Self {
        Self::new()
    }
}
