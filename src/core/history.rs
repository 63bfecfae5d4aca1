//! Daily profit history.

use crate::core::portfolio::PortfolioSnapshot;
use crate::core::store::KeyValueCollection;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Which figure a history chart shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryMetric {
    #[default]
    Percent,
    Absolute,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredPoint {
    profit: Decimal,
    profit_percent: Decimal,
    #[serde(default)]
    total_value: Decimal,
    #[serde(default)]
    total_spent: Decimal,
}

/// One aggregate sample per calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub profit: Decimal,
    pub profit_percent: Decimal,
    pub total_value: Decimal,
    pub total_spent: Decimal,
}

impl HistoryPoint {
    pub fn metric(&self, metric: HistoryMetric) -> Decimal {
        match metric {
            HistoryMetric::Percent => self.profit_percent,
            HistoryMetric::Absolute => self.profit,
        }
    }
}

/// Keeps the latest snapshot of each day, keyed by `YYYY-MM-DD`.
#[derive(Clone)]
pub struct HistoryRecorder {
    collection: Arc<dyn KeyValueCollection>,
}

impl HistoryRecorder {
    pub fn new(collection: Arc<dyn KeyValueCollection>) -> Self {
        Self { collection }
    }

    /// Stores `snapshot` as the point for `date`, replacing any earlier one.
    pub async fn record(&self, date: NaiveDate, snapshot: &PortfolioSnapshot) -> Result<()> {
        let point = StoredPoint {
            profit: snapshot.total_profit,
            profit_percent: snapshot.profit_percent,
            total_value: snapshot.total_value,
            total_spent: snapshot.total_spent,
        };
        let key = date.format(DATE_FORMAT).to_string();
        let bytes = serde_json::to_vec(&point).context("Failed to encode history point")?;
        self.collection
            .put(key.as_bytes(), bytes)
            .await
            .with_context(|| format!("Failed to record history for {key}"))?;
        debug!("Recorded history point for {}", key);
        Ok(())
    }

    /// All points in ascending date order. Rows with an unreadable date or
    /// value are dropped.
    pub async fn points(&self) -> Result<Vec<HistoryPoint>> {
        let mut points: Vec<HistoryPoint> = self
            .collection
            .entries()
            .await?
            .into_iter()
            .filter_map(|(key, value)| {
                let key = String::from_utf8_lossy(&key);
                let date = match NaiveDate::parse_from_str(&key, DATE_FORMAT) {
                    Ok(date) => date,
                    Err(e) => {
                        warn!("Dropping history row with bad date {:?}: {}", key, e);
                        return None;
                    }
                };
                match serde_json::from_slice::<StoredPoint>(&value) {
                    Ok(stored) => Some(HistoryPoint {
                        date,
                        profit: stored.profit,
                        profit_percent: stored.profit_percent,
                        total_value: stored.total_value,
                        total_spent: stored.total_spent,
                    }),
                    Err(e) => {
                        warn!("Dropping unreadable history row for {}: {}", date, e);
                        None
                    }
                }
            })
            .collect();
        points.sort_by_key(|p| p.date);
        Ok(points)
    }
}
