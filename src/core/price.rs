//! Pricing abstractions and core types

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Why no price could be resolved for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    /// The item name does not match any market listing.
    InvalidName,
    /// The item exists but nobody is selling it right now.
    NoListings,
    /// Network, HTTP or parse failure. Worth retrying on the next pass.
    ConnectionError,
}

impl Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                UnavailableReason::InvalidName => "invalid name",
                UnavailableReason::NoListings => "no listings",
                UnavailableReason::ConnectionError => "connection error",
            }
        )
    }
}

/// Outcome of resolving the price of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedPrice {
    Value(Decimal),
    Unavailable(UnavailableReason),
}

impl ResolvedPrice {
    pub fn value(&self) -> Option<Decimal> {
        match self {
            ResolvedPrice::Value(price) => Some(*price),
            ResolvedPrice::Unavailable(_) => None,
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, ResolvedPrice::Value(_))
    }
}

impl Display for ResolvedPrice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolvedPrice::Value(price) => write!(f, "{price:.2}"),
            ResolvedPrice::Unavailable(reason) => write!(f, "unavailable ({reason})"),
        }
    }
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Looks up the current market price of `item_name`. Failures are
    /// reported as [`ResolvedPrice::Unavailable`], never as errors.
    async fn fetch_price(&self, item_name: &str) -> ResolvedPrice;
}
