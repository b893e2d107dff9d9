//! Network provider setup

use alloy::providers::ProviderBuilder;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    ConcreteProvider,
    config::Config,
    errors::{GridError, GridResult},
    network::{
        ChainClient,
        retry::{RetryConfig, retry_with_backoff},
    },
};

pub fn setup_provider(config: &Config) -> GridResult<Arc<ConcreteProvider>> {
    let rpc_url = config
        .rpc_url
        .as_ref()
        .ok_or_else(|| GridError::Config("RPC_URL is required".to_string()))?;
    let url = rpc_url
        .parse()
        .map_err(|e| GridError::Config(format!("invalid RPC_URL {rpc_url}: {e}")))?;

    Ok(Arc::new(ProviderBuilder::new().on_http(url).boxed()))
}

/// Waits for the node to answer and checks it serves `expected`.
pub async fn verify_chain(chain: &dyn ChainClient, expected: u64, retry: &RetryConfig) -> GridResult<u64> {
    info!("🔗 Testing connection to chain {}...", expected);
    let chain_id = retry_with_backoff(
        || async { chain.chain_id().await.map_err(anyhow::Error::from) },
        retry,
        "chain connection",
    )
    .await
    .map_err(|e| {
        warn!("⚠️ Network connection attempt failed: {}", e);
        e
    })?;

    if chain_id != expected {
        return Err(GridError::Config(format!(
            "node reports chain id {}, configured {}",
            chain_id, expected
        )));
    }

    info!("✅ Connected to chain {}", chain_id);
    Ok(chain_id)
}
