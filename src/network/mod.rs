//! Chain connectivity: RPC client, provider setup, retries

pub mod chain;
pub mod providers;
pub mod retry;

pub use chain::*;
pub use providers::*;
pub use retry::*;
