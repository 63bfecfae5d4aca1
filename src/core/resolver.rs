//! Chooses one authoritative price per lot.
//!
//! Precedence: an active manual override, then a live cache entry, then the
//! remote provider. Successful lookups are written through to the cache;
//! failures never are, so the next pass asks the provider again.

use crate::core::cache::PriceCache;
use crate::core::lot::Lot;
use crate::core::price::{PriceProvider, ResolvedPrice, UnavailableReason};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct PriceResolver {
    cache: PriceCache,
    provider: Arc<dyn PriceProvider>,
    max_concurrent_fetches: usize,
}

impl PriceResolver {
    pub fn new(cache: PriceCache, provider: Arc<dyn PriceProvider>) -> Self {
        Self {
            cache,
            provider,
            max_concurrent_fetches: 1,
        }
    }

    /// Allows up to `limit` distinct items to be fetched at once.
    pub fn with_max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.max_concurrent_fetches = limit.max(1);
        self
    }

    pub fn cache(&self) -> &PriceCache {
        &self.cache
    }

    pub async fn resolve(&self, lot: &Lot) -> ResolvedPrice {
        if let Some(price) = lot.override_price() {
            debug!("Manual price {} used for {}", price, lot.item_name);
            return ResolvedPrice::Value(price);
        }
        self.resolve_item(&lot.item_name).await
    }

    /// Cache, then provider, for one item name.
    pub async fn resolve_item(&self, item_name: &str) -> ResolvedPrice {
        if let Some(price) = self.cache.get(item_name).await {
            return ResolvedPrice::Value(price);
        }

        let resolved = self.provider.fetch_price(item_name).await;
        if let ResolvedPrice::Value(price) = resolved {
            self.cache.put(item_name, price, self.cache.now()).await;
        }
        resolved
    }

    /// Number of item lookups `resolve_all` makes for `lots`, which is also
    /// how many times it calls `on_item_done`.
    pub fn lookup_count(lots: &[Lot]) -> usize {
        lookup_names(lots).len()
    }

    /// Resolves every lot, looking each distinct item name up only once.
    /// The result lines up with `lots` by position.
    pub async fn resolve_all(
        &self,
        lots: &[Lot],
        on_item_done: &(dyn Fn() + Sync),
    ) -> Vec<ResolvedPrice> {
        let names = lookup_names(lots);

        let by_name: HashMap<&str, ResolvedPrice> = stream::iter(names)
            .map(|name| async move {
                let resolved = self.resolve_item(name).await;
                on_item_done();
                (name, resolved)
            })
            .buffer_unordered(self.max_concurrent_fetches)
            .collect()
            .await;

        lots.iter()
            .map(|lot| match lot.override_price() {
                Some(price) => ResolvedPrice::Value(price),
                None => by_name
                    .get(lot.item_name.as_str())
                    .copied()
                    .unwrap_or(ResolvedPrice::Unavailable(UnavailableReason::ConnectionError)),
            })
            .collect()
    }
}

/// Distinct item names of the lots without an active manual price.
fn lookup_names(lots: &[Lot]) -> Vec<&str> {
    let mut names: Vec<&str> = lots
        .iter()
        .filter(|lot| lot.override_price().is_none())
        .map(|lot| lot.item_name.as_str())
        .collect();
    names.sort_unstable();
    names.dedup();
    names
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::cache::DEFAULT_TTL;
    use crate::core::clock::{Clock, ManualClock};
    use crate::core::lot::LotId;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    /// Provider that replays scripted answers per item and counts calls.
    #[derive(Default)]
    pub(crate) struct ScriptedProvider {
        answers: Mutex<HashMap<String, Vec<ResolvedPrice>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        pub(crate) fn answer(&self, item: &str, answers: Vec<ResolvedPrice>) {
            self.answers
                .lock()
                .unwrap()
                .insert(item.to_string(), answers);
        }

        pub(crate) fn calls_for(&self, item: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|c| *c == item).count()
        }

        pub(crate) fn total_calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PriceProvider for ScriptedProvider {
        async fn fetch_price(&self, item_name: &str) -> ResolvedPrice {
            self.calls.lock().unwrap().push(item_name.to_string());
            let mut answers = self.answers.lock().unwrap();
            match answers.get_mut(item_name) {
                Some(queue) if queue.len() > 1 => queue.remove(0),
                Some(queue) if queue.len() == 1 => queue[0],
                _ => ResolvedPrice::Unavailable(UnavailableReason::InvalidName),
            }
        }
    }

    pub(crate) fn lot(name: &str, unit_cost: Decimal) -> Lot {
        Lot {
            id: LotId::new(),
            item_name: name.to_string(),
            unit_cost,
            quantity: 1,
            manual_price: None,
            manual_override_active: false,
        }
    }

    fn setup() -> (Arc<ManualClock>, Arc<ScriptedProvider>, PriceResolver) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap(),
        ));
        let provider = Arc::new(ScriptedProvider::default());
        let cache = PriceCache::new(DEFAULT_TTL, clock.clone());
        let resolver = PriceResolver::new(cache, provider.clone());
        (clock, provider, resolver)
    }

    #[tokio::test]
    async fn test_manual_override_skips_cache_and_provider() {
        let (clock, provider, resolver) = setup();
        resolver.cache().put("Case", dec!(9), clock.now()).await;

        let mut pinned = lot("Case", dec!(1));
        pinned.manual_price = Some(dec!(3));
        pinned.manual_override_active = true;

        assert_eq!(resolver.resolve(&pinned).await, ResolvedPrice::Value(dec!(3)));
        assert_eq!(
            resolver.resolve_all(&[pinned], &|| {}).await,
            vec![ResolvedPrice::Value(dec!(3))]
        );
        assert_eq!(provider.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_inactive_or_zero_override_falls_through() {
        let (_clock, provider, resolver) = setup();
        provider.answer("Case", vec![ResolvedPrice::Value(dec!(2))]);

        let mut zero = lot("Case", dec!(1));
        zero.manual_price = Some(dec!(0));
        zero.manual_override_active = true;
        assert_eq!(resolver.resolve(&zero).await, ResolvedPrice::Value(dec!(2)));

        let mut inactive = lot("Case", dec!(1));
        inactive.manual_price = Some(dec!(7));
        resolver.cache().clear().await;
        assert_eq!(resolver.resolve(&inactive).await, ResolvedPrice::Value(dec!(2)));
        assert_eq!(provider.calls_for("Case"), 2);
    }

    #[tokio::test]
    async fn test_success_is_cached_within_ttl() {
        let (clock, provider, resolver) = setup();
        provider.answer("Case", vec![ResolvedPrice::Value(dec!(12.34))]);
        let case = lot("Case", dec!(1));

        assert_eq!(resolver.resolve(&case).await, ResolvedPrice::Value(dec!(12.34)));
        clock.advance(Duration::minutes(4));
        assert_eq!(resolver.resolve(&case).await, ResolvedPrice::Value(dec!(12.34)));
        assert_eq!(provider.calls_for("Case"), 1);

        clock.advance(Duration::minutes(2));
        resolver.resolve(&case).await;
        assert_eq!(provider.calls_for("Case"), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let (_clock, provider, resolver) = setup();
        provider.answer(
            "Case",
            vec![
                ResolvedPrice::Unavailable(UnavailableReason::ConnectionError),
                ResolvedPrice::Value(dec!(4)),
            ],
        );
        let case = lot("Case", dec!(1));

        assert_eq!(
            resolver.resolve(&case).await,
            ResolvedPrice::Unavailable(UnavailableReason::ConnectionError)
        );
        assert!(resolver.cache().get("Case").await.is_none());

        assert_eq!(resolver.resolve(&case).await, ResolvedPrice::Value(dec!(4)));
        assert_eq!(provider.calls_for("Case"), 2);
        assert_eq!(resolver.cache().get("Case").await, Some(dec!(4)));
    }

    #[tokio::test]
    async fn test_resolve_all_fetches_each_item_once() {
        let (_clock, provider, resolver) = setup();
        let resolver = resolver.with_max_concurrent_fetches(4);
        provider.answer("A", vec![ResolvedPrice::Value(dec!(1))]);
        provider.answer("B", vec![ResolvedPrice::Value(dec!(2))]);

        let lots = vec![
            lot("A", dec!(1)),
            lot("B", dec!(1)),
            lot("A", dec!(5)),
            lot("Nope", dec!(1)),
        ];
        let done = std::sync::atomic::AtomicUsize::new(0);
        let prices = resolver
            .resolve_all(&lots, &|| {
                done.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            })
            .await;

        assert_eq!(
            prices,
            vec![
                ResolvedPrice::Value(dec!(1)),
                ResolvedPrice::Value(dec!(2)),
                ResolvedPrice::Value(dec!(1)),
                ResolvedPrice::Unavailable(UnavailableReason::InvalidName),
            ]
        );
        assert_eq!(provider.calls_for("A"), 1);
        assert_eq!(provider.calls_for("B"), 1);
        assert_eq!(done.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_lookup_count_matches_progress_callbacks() {
        let (_clock, provider, resolver) = setup();
        provider.answer("A", vec![ResolvedPrice::Value(dec!(1))]);

        let mut pinned = lot("B", dec!(1));
        pinned.manual_price = Some(dec!(2));
        pinned.manual_override_active = true;
        let lots = vec![lot("A", dec!(1)), lot("A", dec!(2)), pinned];

        let done = std::sync::atomic::AtomicUsize::new(0);
        resolver
            .resolve_all(&lots, &|| {
                done.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            })
            .await;

        assert_eq!(PriceResolver::lookup_count(&lots), 1);
        assert_eq!(done.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
