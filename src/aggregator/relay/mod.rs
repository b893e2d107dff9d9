//! Relay-style quote/execution API

pub mod client;
pub mod credential;
pub mod types;

pub use client::*;
pub use credential::*;
pub use types::*;

use alloy::{
    primitives::{TxHash, U256},
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    aggregator::{AggregatorQuote, DexAggregator, QuoteRequest},
    errors::GridResult,
    types::AggregatorKind,
};

pub struct RelayAggregator {
    client: Arc<RelayClient>,
}

impl RelayAggregator {
    pub fn new(client: Arc<RelayClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DexAggregator for RelayAggregator {
    fn kind(&self) -> AggregatorKind {
        AggregatorKind::Relay
    }

    async fn quote(&self, request: &QuoteRequest) -> GridResult<Box<dyn AggregatorQuote>> {
        let response = self.client.quote(request).await?;
        Ok(Box::new(RelayQuote {
            client: self.client.clone(),
            response,
        }))
    }
}

pub struct RelayQuote {
    client: Arc<RelayClient>,
    response: QuoteResponse,
}

#[async_trait]
impl AggregatorQuote for RelayQuote {
    fn out_amount(&self) -> U256 {
        self.response.details.currency_out.amount
    }

    fn slippage_bps(&self) -> u32 {
        self.response.slippage_bps()
    }

    async fn execute(&self, signer: &PrivateKeySigner) -> GridResult<(TxHash, u64)> {
        self.client.send_swap_transaction(signer, &self.response).await
    }
}
