use crate::core::clock::Clock;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Default time-to-live of a cached price.
pub const DEFAULT_TTL: Duration = Duration::minutes(5);

#[derive(Debug, Clone, Copy)]
struct CachedPrice {
    value: Decimal,
    fetched_at: DateTime<Utc>,
}

/// Session-scoped store of last known prices keyed by item name.
///
/// Entries past their TTL behave as misses but are not evicted; the next
/// `put` for the key overwrites them. All access goes through one exclusive
/// lock, so a `clear` never interleaves with a read.
#[derive(Clone)]
pub struct PriceCache {
    inner: Arc<Mutex<HashMap<String, CachedPrice>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl PriceCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn get(&self, key: &str) -> Option<Decimal> {
        let cache = self.inner.lock().await;
        let now = self.clock.now();
        match cache.get(key) {
            Some(entry) if now - entry.fetched_at < self.ttl => {
                debug!("Cache HIT for key: {:?}", key);
                Some(entry.value)
            }
            Some(_) => {
                debug!("Cache entry expired for key: {:?}", key);
                None
            }
            None => {
                debug!("Cache MISS for key: {:?}", key);
                None
            }
        }
    }

    pub async fn put(&self, key: &str, value: Decimal, fetched_at: DateTime<Utc>) {
        let mut cache = self.inner.lock().await;
        debug!("Cache PUT for key: {:?}", key);
        cache.insert(key.to_string(), CachedPrice { value, fetched_at });
    }

    pub async fn remove(&self, key: &str) {
        let mut cache = self.inner.lock().await;
        cache.remove(key);
        debug!("Cache REMOVE for key: {:?}", key);
    }

    pub async fn clear(&self) {
        let mut cache = self.inner.lock().await;
        cache.clear();
        debug!("Cache CLEAR");
    }

    /// Number of entries still within their TTL.
    pub async fn len(&self) -> usize {
        let cache = self.inner.lock().await;
        let now = self.clock.now();
        cache
            .values()
            .filter(|entry| now - entry.fetched_at < self.ttl)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Time left until the oldest live entry expires and a pass would hit
    /// the network again. `None` when nothing live is cached.
    pub async fn refresh_due_in(&self) -> Option<Duration> {
        let cache = self.inner.lock().await;
        let now = self.clock.now();
        cache
            .values()
            .map(|entry| self.ttl - (now - entry.fetched_at))
            .filter(|left| *left > Duration::zero())
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn setup() -> (Arc<ManualClock>, PriceCache) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap(),
        ));
        let cache = PriceCache::new(DEFAULT_TTL, clock.clone());
        (clock, cache)
    }

    #[tokio::test]
    async fn test_cache_get_put() {
        let (clock, cache) = setup();

        // Initially, cache is empty
        assert!(cache.get("AK-47 | Redline").await.is_none());

        cache.put("AK-47 | Redline", dec!(42.10), clock.now()).await;

        assert_eq!(cache.get("AK-47 | Redline").await, Some(dec!(42.10)));
        assert_eq!(cache.get("AK-47 | Redline").await, Some(dec!(42.10)));
        assert!(cache.get("AWP | Asiimov").await.is_none());
    }

    #[tokio::test]
    async fn test_cache_ttl_boundary() {
        let (clock, cache) = setup();
        cache.put("Glove Case", dec!(5), clock.now()).await;

        clock.advance(DEFAULT_TTL - Duration::milliseconds(1));
        assert_eq!(cache.get("Glove Case").await, Some(dec!(5)));

        clock.advance(Duration::milliseconds(2));
        assert!(cache.get("Glove Case").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_overwritten_by_put() {
        let (clock, cache) = setup();
        cache.put("Glove Case", dec!(5), clock.now()).await;
        clock.advance(Duration::minutes(10));
        assert!(cache.get("Glove Case").await.is_none());

        cache.put("Glove Case", dec!(6), clock.now()).await;
        assert_eq!(cache.get("Glove Case").await, Some(dec!(6)));
    }

    #[tokio::test]
    async fn test_cache_clear_resets_refresh_indicator() {
        let (clock, cache) = setup();
        cache.put("a", dec!(1), clock.now()).await;
        clock.advance(Duration::minutes(1));
        cache.put("b", dec!(2), clock.now()).await;

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.refresh_due_in().await, Some(Duration::minutes(4)));

        cache.clear().await;

        assert!(cache.is_empty().await);
        assert!(cache.get("a").await.is_none());
        assert_eq!(cache.refresh_due_in().await, None);
    }

    #[tokio::test]
    async fn test_cache_remove() {
        let (clock, cache) = setup();
        cache.put("a", dec!(1), clock.now()).await;
        cache.remove("a").await;
        assert!(cache.get("a").await.is_none());
    }
}
