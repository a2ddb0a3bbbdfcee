//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement
//! the oracle's workflows.
//!
//! Use cases:
//! - `Resolver`: Periodic resolution of markets whose PR concluded
//! - `MarketDirectory`: Market and bet queries
//! - `MarketService`: Create market, place bet, claim winnings

pub mod market_directory;
pub mod market_service;
pub mod resolver;

pub use market_directory::MarketDirectory;
pub use market_service::{MarketService, MarketServiceError};
pub use resolver::{CycleObserver, CycleReport, MarketDisposition, OracleContext, Resolver};
