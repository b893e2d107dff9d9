//! Swap pipeline: quote with the user's policy, then execute

pub mod service;
pub mod slippage;
pub mod transaction;

pub use service::*;
pub use slippage::*;
pub use transaction::*;
