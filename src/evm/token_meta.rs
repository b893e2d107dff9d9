//! Process-lifetime cache of ERC-20 metadata

use alloy::primitives::Address;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{errors::GridResult, evm::abi, network::ChainClient, types::TokenMeta};

pub struct TokenMetaCache {
    chain: Arc<dyn ChainClient>,
    entries: RwLock<HashMap<Address, TokenMeta>>,
}

impl TokenMetaCache {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self {
            chain,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get_token_meta(&self, token: Address) -> GridResult<TokenMeta> {
        if let Some(meta) = self.entries.read().await.get(&token) {
            return Ok(meta.clone());
        }

        let meta = abi::token_meta(self.chain.as_ref(), token).await?;
        debug!("Loaded token meta for {}: {} ({} decimals)", token, meta.symbol, meta.decimals);
        self.entries.write().await.insert(token, meta.clone());
        Ok(meta)
    }

    /// Seeds an entry without touching the chain.
    pub async fn insert(&self, token: Address, meta: TokenMeta) {
        self.entries.write().await.insert(token, meta);
    }
}
