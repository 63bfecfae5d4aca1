//! Purchase lots and their storage.

use crate::core::store::KeyValueCollection;
use anyhow::{Context, Result, anyhow, bail, ensure};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LotId(Uuid);

impl LotId {
    pub fn new() -> Self {
        LotId(Uuid::new_v4())
    }
}

impl Default for LotId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for LotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LotId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(LotId)
            .map_err(|e| anyhow!("Invalid lot id {s:?}: {e}"))
    }
}

/// One recorded purchase of `quantity` units of `item_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    pub id: LotId,
    /// Market name used to look up the price.
    pub item_name: String,
    pub unit_cost: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub manual_price: Option<Decimal>,
    #[serde(default)]
    pub manual_override_active: bool,
}

impl Lot {
    /// Manual price that takes precedence over market lookups, if any.
    pub fn override_price(&self) -> Option<Decimal> {
        match self.manual_price {
            Some(price) if self.manual_override_active && price > Decimal::ZERO => Some(price),
            _ => None,
        }
    }

    /// `unit_cost * quantity`, or zero if that overflows.
    pub fn cost_basis(&self) -> Decimal {
        self.unit_cost
            .checked_mul(Decimal::from(self.quantity))
            .unwrap_or(Decimal::ZERO)
    }
}

/// User input for a new lot.
#[derive(Debug, Clone)]
pub struct NewLot {
    pub item_name: String,
    pub unit_cost: Decimal,
    pub quantity: u32,
}

impl NewLot {
    pub fn validate(self) -> Result<Lot> {
        let item_name = validate_name(&self.item_name)?;
        validate_cost(self.unit_cost)?;
        validate_quantity(self.quantity)?;

        Ok(Lot {
            id: LotId::new(),
            item_name,
            unit_cost: self.unit_cost,
            quantity: self.quantity,
            manual_price: None,
            manual_override_active: false,
        })
    }
}

/// Edits to an existing lot. `None` fields are left as they are.
#[derive(Debug, Clone, Default)]
pub struct LotUpdate {
    pub item_name: Option<String>,
    pub unit_cost: Option<Decimal>,
    pub quantity: Option<u32>,
}

impl LotUpdate {
    fn apply(self, lot: &mut Lot) -> Result<()> {
        if let Some(name) = self.item_name {
            lot.item_name = validate_name(&name)?;
        }
        if let Some(cost) = self.unit_cost {
            validate_cost(cost)?;
            lot.unit_cost = cost;
        }
        if let Some(quantity) = self.quantity {
            validate_quantity(quantity)?;
            lot.quantity = quantity;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    ensure!(!name.is_empty(), "Item name must not be empty");
    Ok(name.to_string())
}

fn validate_cost(cost: Decimal) -> Result<()> {
    ensure!(cost > Decimal::ZERO, "Unit cost must be greater than zero");
    Ok(())
}

fn validate_quantity(quantity: u32) -> Result<()> {
    ensure!(quantity > 0, "Quantity must be greater than zero");
    Ok(())
}

/// Lot records persisted as JSON, keyed by lot id.
#[derive(Clone)]
pub struct LotStore {
    collection: Arc<dyn KeyValueCollection>,
}

impl LotStore {
    pub fn new(collection: Arc<dyn KeyValueCollection>) -> Self {
        Self { collection }
    }

    /// All lots. Records that fail to decode are skipped.
    pub async fn list(&self) -> Result<Vec<Lot>> {
        let entries = self.collection.entries().await?;
        let lots = entries
            .into_iter()
            .filter_map(|(key, value)| match serde_json::from_slice::<Lot>(&value) {
                Ok(lot) => Some(lot),
                Err(e) => {
                    warn!(
                        "Skipping unreadable lot record {:?}: {}",
                        String::from_utf8_lossy(&key),
                        e
                    );
                    None
                }
            })
            .collect();
        Ok(lots)
    }

    pub async fn get(&self, id: LotId) -> Result<Option<Lot>> {
        match self.collection.get(id.to_string().as_bytes()).await? {
            Some(bytes) => {
                let lot = serde_json::from_slice(&bytes)
                    .with_context(|| format!("Failed to decode lot {id}"))?;
                Ok(Some(lot))
            }
            None => Ok(None),
        }
    }

    /// Resolves a full id or a unique id prefix, as shown in summaries.
    pub async fn find_id(&self, id_or_prefix: &str) -> Result<LotId> {
        let needle = id_or_prefix.trim().to_lowercase();
        ensure!(!needle.is_empty(), "Lot id must not be empty");
        if let Ok(id) = needle.parse::<LotId>() {
            return Ok(id);
        }

        let matches: Vec<LotId> = self
            .list()
            .await?
            .into_iter()
            .map(|lot| lot.id)
            .filter(|id| id.to_string().starts_with(&needle))
            .collect();
        match matches.as_slice() {
            [id] => Ok(*id),
            [] => bail!("No lot with id {id_or_prefix}"),
            _ => bail!("Lot id {id_or_prefix} is ambiguous, use more characters"),
        }
    }

    async fn get_existing(&self, id: LotId) -> Result<Lot> {
        self.get(id)
            .await?
            .ok_or_else(|| anyhow!("No lot with id {id}"))
    }

    async fn save(&self, lot: &Lot) -> Result<()> {
        let bytes = serde_json::to_vec(lot).context("Failed to encode lot")?;
        self.collection
            .put(lot.id.to_string().as_bytes(), bytes)
            .await
    }

    pub async fn insert(&self, new_lot: NewLot) -> Result<Lot> {
        let lot = new_lot.validate()?;
        self.save(&lot).await?;
        debug!("Added lot {} ({})", lot.id, lot.item_name);
        Ok(lot)
    }

    pub async fn update(&self, id: LotId, update: LotUpdate) -> Result<Lot> {
        let mut lot = self.get_existing(id).await?;
        update.apply(&mut lot)?;
        self.save(&lot).await?;
        Ok(lot)
    }

    pub async fn remove(&self, id: LotId) -> Result<()> {
        if self.get(id).await?.is_none() {
            bail!("No lot with id {id}");
        }
        self.collection.remove(id.to_string().as_bytes()).await
    }

    /// Pins the lot to `price`. The override stays active until cleared.
    pub async fn set_manual_price(&self, id: LotId, price: Decimal) -> Result<Lot> {
        ensure!(price > Decimal::ZERO, "Manual price must be greater than zero");
        let mut lot = self.get_existing(id).await?;
        lot.manual_price = Some(price);
        lot.manual_override_active = true;
        self.save(&lot).await?;
        Ok(lot)
    }

    pub async fn clear_manual_price(&self, id: LotId) -> Result<Lot> {
        let mut lot = self.get_existing(id).await?;
        lot.manual_price = None;
        lot.manual_override_active = false;
        self.save(&lot).await?;
        Ok(lot)
    }
}
