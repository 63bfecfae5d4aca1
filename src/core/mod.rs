//! Core business logic abstractions

pub mod cache;
pub mod clock;
pub mod config;
pub mod engine;
pub mod history;
pub mod log;
pub mod lot;
pub mod portfolio;
pub mod price;
pub mod resolver;
pub mod store;

// Re-export main types for cleaner imports
pub use engine::ValuationEngine;
pub use price::{PriceProvider, ResolvedPrice, UnavailableReason};
