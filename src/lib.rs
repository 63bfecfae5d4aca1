pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::ValuationEngine;
use crate::core::cache::PriceCache;
use crate::core::clock::SystemClock;
use crate::core::config::AppConfig;
use crate::core::history::HistoryRecorder;
use crate::core::lot::{LotStore, LotUpdate, NewLot};
use crate::core::resolver::PriceResolver;
use crate::providers::steam_market::SteamMarketProvider;
use crate::store::KeyValueStore;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub enum AppCommand {
    Add {
        name: String,
        unit_cost: Decimal,
        quantity: u32,
    },
    Edit {
        id: String,
        name: Option<String>,
        unit_cost: Option<Decimal>,
        quantity: Option<u32>,
    },
    Remove {
        id: String,
    },
    SetPrice {
        id: String,
        price: Decimal,
    },
    ClearPrice {
        id: String,
    },
    Summary,
    History,
    Watch {
        interval_secs: u64,
    },
}

/// Wires the store, the market provider and the price cache into one engine.
pub fn build_engine(config: &AppConfig, store: &KeyValueStore) -> Result<ValuationEngine> {
    let clock = Arc::new(SystemClock);
    let provider = Arc::new(SteamMarketProvider::new(&config.providers.steam)?);
    let cache = PriceCache::new(config.cache_ttl()?, clock.clone());
    let resolver = PriceResolver::new(cache, provider)
        .with_max_concurrent_fetches(config.max_concurrent_fetches);

    Ok(ValuationEngine::new(
        resolver,
        LotStore::new(store.collection("lots")?),
        HistoryRecorder::new(store.collection("history")?),
        clock,
        config.unresolved_cost,
    ))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("skinfolio starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let data_dir = config.data_dir()?;
    let store = KeyValueStore::open(&data_dir)
        .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?;
    let engine = build_engine(&config, &store)?;
    let currency = config.currency_symbol.as_str();

    match command {
        AppCommand::Add {
            name,
            unit_cost,
            quantity,
        } => {
            let new_lot = NewLot {
                item_name: name,
                unit_cost,
                quantity,
            };
            cli::lots::add(&engine, new_lot, currency).await
        }
        AppCommand::Edit {
            id,
            name,
            unit_cost,
            quantity,
        } => {
            let id = engine.lots().find_id(&id).await?;
            let update = LotUpdate {
                item_name: name,
                unit_cost,
                quantity,
            };
            cli::lots::edit(&engine, id, update, currency).await
        }
        AppCommand::Remove { id } => {
            let id = engine.lots().find_id(&id).await?;
            cli::lots::remove(&engine, id).await
        }
        AppCommand::SetPrice { id, price } => {
            let id = engine.lots().find_id(&id).await?;
            cli::lots::set_price(&engine, id, price, currency).await
        }
        AppCommand::ClearPrice { id } => {
            let id = engine.lots().find_id(&id).await?;
            cli::lots::clear_price(&engine, id, currency).await
        }
        AppCommand::Summary => cli::summary::run(&engine, currency).await.map(|_| ()),
        AppCommand::History => cli::history::run(&engine, config.history_metric, currency).await,
        AppCommand::Watch { interval_secs } => {
            let interval = Duration::from_secs(interval_secs.max(1));
            cli::watch::run(&engine, interval, currency).await
        }
    }
}
