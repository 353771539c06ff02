//! ETH/USD price slot
//!
//! A single cached quote with its fetch time. Owned by the price service
//! and created with the application context.

use chrono::{DateTime, Duration, Utc};
use std::sync::RwLock;

/// A cached quote
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedPrice {
    pub price_usd: f64,
    pub fetched_at: DateTime<Utc>,
}

impl CachedPrice {
    pub fn is_fresh_at(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        now - self.fetched_at < max_age
    }
}

/// Single-slot price cache
#[derive(Debug, Default)]
pub struct PriceCache {
    slot: RwLock<Option<CachedPrice>>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<CachedPrice> {
        *self.slot.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn store(&self, price_usd: f64, fetched_at: DateTime<Utc>) -> CachedPrice {
        let cached = CachedPrice {
            price_usd,
            fetched_at,
        };
        *self
            .slot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(cached);
        cached
    }

    /// Cached quote younger than `max_age`
    pub fn fresh(&self, max_age: Duration, now: DateTime<Utc>) -> Option<CachedPrice> {
        self.get().filter(|p| p.is_fresh_at(max_age, now))
    }

    pub fn clear(&self) {
        *self
            .slot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_respects_max_age() {
        let cache = PriceCache::new();
        assert!(cache.get().is_none());

        let t0 = Utc::now();
        cache.store(3210.5, t0);

        let max_age = Duration::seconds(60);
        assert!(cache.fresh(max_age, t0 + Duration::seconds(59)).is_some());
        assert!(cache.fresh(max_age, t0 + Duration::seconds(60)).is_none());
        // stale values remain readable
        assert_eq!(cache.get().map(|p| p.price_usd), Some(3210.5));

        cache.clear();
        assert!(cache.get().is_none());
    }
}
