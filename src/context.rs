//! Shared collaborators handed to every long-running service

use alloy::primitives::Address;
use std::sync::Arc;
use tracing::info;

use crate::{
    aggregator::AggregatorRegistry,
    config::Config,
    errors::GridResult,
    evm::TokenMetaCache,
    network::ChainClient,
    nonce::NonceManager,
    notify::NotificationQueue,
    storage::Store,
    wallet::KeyVault,
};

/// The chain's quote currency, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stablecoin {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

impl Stablecoin {
    pub async fn resolve(token_meta: &TokenMetaCache, address: Address) -> GridResult<Self> {
        let meta = token_meta.get_token_meta(address).await?;
        info!("💵 Stablecoin {} ({}, {} decimals)", meta.symbol, address, meta.decimals);
        Ok(Self {
            address,
            symbol: meta.symbol,
            decimals: meta.decimals,
        })
    }
}

pub struct ServiceContext {
    pub config: Config,
    pub chain: Arc<dyn ChainClient>,
    pub store: Arc<Store>,
    pub nonces: Arc<NonceManager>,
    pub aggregators: AggregatorRegistry,
    pub token_meta: Arc<TokenMetaCache>,
    pub vault: Arc<KeyVault>,
    pub notifications: NotificationQueue,
    pub stablecoin: Stablecoin,
}
