//! EVM Grid Executor - transaction execution and order reconciliation
//!
//! Turns grid-strategy trade decisions into signed, nonce-sequenced swap
//! transactions through a DEX aggregator, and settles each submitted order
//! once its receipt shows the real outcome.

pub mod config;
pub mod types;
pub mod errors;
pub mod evm;
pub mod network;
pub mod nonce;
pub mod aggregator;
pub mod swap;
pub mod keeper;
pub mod storage;
pub mod notify;
pub mod wallet;
pub mod context;
pub mod utils;

// Re-export commonly used items
pub use config::{Config, CONFIG};
pub use context::{ServiceContext, Stablecoin};
pub use errors::{GridError, GridResult};
pub use types::*;

// Type alias for our concrete provider
pub type ConcreteProvider = alloy::providers::RootProvider<alloy::transports::BoxTransport>;
