//! Entry point the presentation layer talks to.

use crate::core::clock::Clock;
use crate::core::history::{HistoryPoint, HistoryRecorder};
use crate::core::lot::{Lot, LotId, LotStore};
use crate::core::portfolio::{self, PortfolioSnapshot, UnresolvedCostPolicy};
use crate::core::resolver::PriceResolver;
use anyhow::{Context, Result};
use chrono::Local;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Runs valuation passes for one session. The price cache inside the
/// resolver lives as long as the engine does.
pub struct ValuationEngine {
    resolver: PriceResolver,
    lots: LotStore,
    history: HistoryRecorder,
    clock: Arc<dyn Clock>,
    policy: UnresolvedCostPolicy,
    last_snapshot: Mutex<Option<PortfolioSnapshot>>,
}

impl ValuationEngine {
    pub fn new(
        resolver: PriceResolver,
        lots: LotStore,
        history: HistoryRecorder,
        clock: Arc<dyn Clock>,
        policy: UnresolvedCostPolicy,
    ) -> Self {
        Self {
            resolver,
            lots,
            history,
            clock,
            policy,
            last_snapshot: Mutex::new(None),
        }
    }

    pub fn lots(&self) -> &LotStore {
        &self.lots
    }

    pub fn resolver(&self) -> &PriceResolver {
        &self.resolver
    }

    pub async fn resolve_all(&self, lots: &[Lot]) -> PortfolioSnapshot {
        self.resolve_all_with_progress(lots, &|| {}).await
    }

    /// Like [`resolve_all`](Self::resolve_all), calling `on_item_done` after
    /// each distinct item lookup.
    pub async fn resolve_all_with_progress(
        &self,
        lots: &[Lot],
        on_item_done: &(dyn Fn() + Sync),
    ) -> PortfolioSnapshot {
        let prices = self.resolver.resolve_all(lots, on_item_done).await;
        let snapshot = portfolio::aggregate(lots, &prices, self.policy);
        debug!(
            "Valued {} lots, {} unresolved, profit {}",
            lots.len(),
            snapshot.unresolved_count(),
            snapshot.total_profit
        );
        *self.last_snapshot.lock().await = Some(snapshot.clone());
        snapshot
    }

    /// Loads every stored lot and values it.
    pub async fn valuate(&self) -> Result<PortfolioSnapshot> {
        let lots = self.lots.list().await.context("Failed to load lots")?;
        Ok(self.resolve_all(&lots).await)
    }

    pub async fn set_manual_price(&self, lot_id: LotId, price: Decimal) -> Result<Lot> {
        let lot = self.lots.set_manual_price(lot_id, price).await?;
        info!("Pinned {} to {}", lot.item_name, price);
        Ok(lot)
    }

    /// Forgets every cached price so the next pass goes to the market.
    pub async fn clear_cache(&self) {
        self.resolver.cache().clear().await;
        info!("Price cache cleared");
    }

    /// Records the most recent snapshot under today's date, then returns the
    /// full history in date order. Without a snapshot nothing is recorded.
    pub async fn record_and_fetch_history(&self) -> Result<Vec<HistoryPoint>> {
        let snapshot = self.last_snapshot.lock().await.clone();
        if let Some(snapshot) = snapshot {
            let today = self.clock.now().with_timezone(&Local).date_naive();
            self.history.record(today, &snapshot).await?;
        }
        self.history.points().await
    }
}
