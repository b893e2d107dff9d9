//! Swap aggregators: the `{quote, execute}` capability and its implementations

pub mod registry;
pub mod relay;

pub use registry::*;
pub use relay::{RelayAggregator, RelayClient};

use alloy::{
    primitives::{Address, TxHash, U256},
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;

use crate::{errors::GridResult, types::AggregatorKind};

/// Exact-input swap intent on a single chain.
#[derive(Debug, Clone)]
pub struct QuoteRequest {
    pub chain_id: u64,
    pub user: Address,
    pub input_token: Address,
    pub output_token: Address,
    /// Input amount in base units.
    pub amount: U256,
    pub slippage_bps: u32,
    pub infinite_approval: bool,
}

#[async_trait]
pub trait DexAggregator: Send + Sync {
    fn kind(&self) -> AggregatorKind;

    async fn quote(&self, request: &QuoteRequest) -> GridResult<Box<dyn AggregatorQuote>>;
}

/// An executable quote. Execution submits every transaction the quote needs and
/// returns the hash and nonce of the last one.
#[async_trait]
pub trait AggregatorQuote: Send + Sync {
    /// Declared output in base units of the output token.
    fn out_amount(&self) -> U256;

    fn slippage_bps(&self) -> u32;

    async fn execute(&self, signer: &PrivateKeySigner) -> GridResult<(TxHash, u64)>;
}
