//! Executable quote bound to the user it was quoted for

use alloy::primitives::{Address, TxHash, U256};
use tracing::info;

use crate::{aggregator::AggregatorQuote, errors::GridResult, swap::SwapService};

pub struct SwapTransaction {
    quote: Box<dyn AggregatorQuote>,
    service: SwapService,
    signer: Address,
}

impl SwapTransaction {
    pub(crate) fn new(quote: Box<dyn AggregatorQuote>, service: SwapService, signer: Address) -> Self {
        Self { quote, service, signer }
    }

    pub fn signer(&self) -> Address {
        self.signer
    }

    pub fn out_amount(&self) -> U256 {
        self.quote.out_amount()
    }

    pub fn slippage_bps(&self) -> u32 {
        self.quote.slippage_bps()
    }

    /// Submits the quoted transactions; returns the last hash and its nonce.
    pub async fn swap(&self) -> GridResult<(TxHash, u64)> {
        let signer = self.service.signer().await?;
        let (hash, nonce) = self.quote.execute(signer).await?;
        info!(
            user_id = self.service.user_id(),
            account = %self.signer,
            nonce,
            hash = %hash,
            "[SwapService] Swap submitted"
        );
        Ok((hash, nonce))
    }
}
