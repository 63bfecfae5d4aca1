//! Profit and loss over a set of lots.
use crate::core::lot::Lot;
use crate::core::price::ResolvedPrice;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How lots without a price count toward `total_spent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedCostPolicy {
    /// Cost basis counts as spent even though no value is known.
    #[default]
    Include,
    /// The lot is left out of the totals entirely.
    Exclude,
}

/// Sign of a profit figure, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfitTrend {
    Gain,
    Loss,
    Flat,
}

impl ProfitTrend {
    pub fn of(profit: Decimal) -> Self {
        if profit > Decimal::ZERO {
            ProfitTrend::Gain
        } else if profit < Decimal::ZERO {
            ProfitTrend::Loss
        } else {
            ProfitTrend::Flat
        }
    }
}

/// Valuation of a single lot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LotValuation {
    pub lot: Lot,
    pub price: ResolvedPrice,
    /// `None` when the price is unavailable.
    pub profit: Option<Decimal>,
    pub profit_percent: Option<Decimal>,
}

impl LotValuation {
    pub fn trend(&self) -> Option<ProfitTrend> {
        self.profit.map(ProfitTrend::of)
    }

    pub fn market_value(&self) -> Option<Decimal> {
        self.price
            .value()
            .map(|p| clamp(p.checked_mul(Decimal::from(self.lot.quantity))))
    }
}

/// Result of one valuation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSnapshot {
    pub lots: Vec<LotValuation>,
    pub total_spent: Decimal,
    pub total_value: Decimal,
    /// Always `total_value - total_spent`.
    pub total_profit: Decimal,
    pub profit_percent: Decimal,
    /// Cost basis of lots whose price is unavailable.
    pub unresolved_cost: Decimal,
}

impl PortfolioSnapshot {
    pub fn unresolved_count(&self) -> usize {
        self.lots.iter().filter(|l| !l.price.is_value()).count()
    }

    pub fn trend(&self) -> ProfitTrend {
        ProfitTrend::of(self.total_profit)
    }
}

/// Checked decimal results collapse to zero on overflow or division by zero.
fn clamp(value: Option<Decimal>) -> Decimal {
    value.unwrap_or(Decimal::ZERO)
}

/// `(value - cost) / cost * 100`, or zero when `cost` is zero.
pub fn percent_change(value: Decimal, cost: Decimal) -> Decimal {
    if cost.is_zero() {
        return Decimal::ZERO;
    }
    clamp(
        value
            .checked_sub(cost)
            .and_then(|diff| diff.checked_div(cost))
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED)),
    )
}

fn value_lot(lot: &Lot, price: ResolvedPrice) -> LotValuation {
    let (profit, profit_percent) = match price {
        ResolvedPrice::Value(p) => {
            let profit = clamp(
                p.checked_sub(lot.unit_cost)
                    .and_then(|diff| diff.checked_mul(Decimal::from(lot.quantity))),
            );
            (Some(profit), Some(percent_change(p, lot.unit_cost)))
        }
        ResolvedPrice::Unavailable(reason) => {
            debug!("No price for {} ({}), excluded from value", lot.item_name, reason);
            (None, None)
        }
    };

    LotValuation {
        lot: lot.clone(),
        price,
        profit,
        profit_percent,
    }
}

/// Folds resolved prices into per-lot and whole-portfolio figures.
///
/// `prices` is matched to `lots` by position. Lots without a price add
/// nothing to the value; whether their cost still counts as spent depends
/// on `policy`.
pub fn aggregate(
    lots: &[Lot],
    prices: &[ResolvedPrice],
    policy: UnresolvedCostPolicy,
) -> PortfolioSnapshot {
    debug_assert_eq!(lots.len(), prices.len());

    let mut total_spent = Decimal::ZERO;
    let mut total_value = Decimal::ZERO;
    let mut unresolved_cost = Decimal::ZERO;
    let mut valuations = Vec::with_capacity(lots.len());

    for (lot, price) in lots.iter().zip(prices.iter().copied()) {
        let valuation = value_lot(lot, price);
        let cost = lot.cost_basis();

        match valuation.market_value() {
            Some(value) => {
                total_spent = clamp(total_spent.checked_add(cost));
                total_value = clamp(total_value.checked_add(value));
            }
            None => {
                unresolved_cost = clamp(unresolved_cost.checked_add(cost));
                if policy == UnresolvedCostPolicy::Include {
                    total_spent = clamp(total_spent.checked_add(cost));
                }
            }
        }
        valuations.push(valuation);
    }

    let total_profit = clamp(total_value.checked_sub(total_spent));
    let profit_percent = if total_spent > Decimal::ZERO {
        percent_change(total_value, total_spent)
    } else {
        Decimal::ZERO
    };

    PortfolioSnapshot {
        lots: valuations,
        total_spent,
        total_value,
        total_profit,
        profit_percent,
        unresolved_cost,
    }
}
