use super::ui;
use crate::core::ValuationEngine;
use crate::core::lot::{Lot, LotId, LotUpdate, NewLot};
use anyhow::{Result, bail};
use rust_decimal::Decimal;

fn describe(lot: &Lot, currency: &str) -> String {
    let manual = match lot.override_price() {
        Some(price) => format!(", manual price {price:.2} {currency}"),
        None => String::new(),
    };
    format!(
        "{} x{} @ {:.2} {currency}{manual} [{}]",
        lot.item_name, lot.quantity, lot.unit_cost, lot.id
    )
}

pub async fn add(engine: &ValuationEngine, new_lot: NewLot, currency: &str) -> Result<()> {
    let lot = engine.lots().insert(new_lot).await?;
    println!("Added {}", ui::style_text(&describe(&lot, currency), ui::StyleType::TotalLabel));
    Ok(())
}

pub async fn edit(
    engine: &ValuationEngine,
    id: LotId,
    update: LotUpdate,
    currency: &str,
) -> Result<()> {
    if update.item_name.is_none() && update.unit_cost.is_none() && update.quantity.is_none() {
        bail!("Nothing to change: pass --name, --cost or --quantity");
    }
    let lot = engine.lots().update(id, update).await?;
    println!("Updated {}", describe(&lot, currency));
    Ok(())
}

pub async fn remove(engine: &ValuationEngine, id: LotId) -> Result<()> {
    engine.lots().remove(id).await?;
    println!("Removed lot {id}");
    Ok(())
}

pub async fn set_price(
    engine: &ValuationEngine,
    id: LotId,
    price: Decimal,
    currency: &str,
) -> Result<()> {
    let lot = engine.set_manual_price(id, price).await?;
    println!("Pinned {}", describe(&lot, currency));
    Ok(())
}

pub async fn clear_price(engine: &ValuationEngine, id: LotId, currency: &str) -> Result<()> {
    let lot = engine.lots().clear_manual_price(id).await?;
    println!("Market price restored for {}", describe(&lot, currency));
    Ok(())
}
