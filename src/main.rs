//! EVM Grid Executor - Main Entry Point

use anyhow::Result;
use evm_grid_executor::{
    aggregator::{AggregatorRegistry, RelayAggregator, RelayClient},
    evm::TokenMetaCache,
    keeper::OrderKeeper,
    network::{self, ChainClient, RetryConfig, RpcChainClient},
    nonce::NonceManager,
    notify::{LogNotifier, NotificationQueue, Notifier, TelegramNotifier},
    storage::Store,
    wallet::KeyVault,
    *,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const NOTIFY_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let config = CONFIG.clone();

    // Initialize logging
    utils::setup_output_directories(&config.store_path)?;
    let _logging_guard = utils::setup_logging()?;

    info!("🧮 EVM Grid Executor v{}", env!("CARGO_PKG_VERSION"));
    info!("📋 Configuration:");
    info!(
        "   Chain: {} ({})",
        utils::network_name(config.chain_id).unwrap_or("unknown"),
        config.chain_id
    );
    info!("   Default Slippage: {} bps", config.slippage_bps);
    info!("   Default Aggregator: {}", config.dex_aggregator);
    info!("   Keeper: every {}ms, {} orders per tick", config.keeper_interval_ms, config.keeper_batch_size);
    info!("   Receipt Timeout: {}s", config.receipt_timeout_secs);
    info!("   Store: {}", config.store_path);

    // Setup network provider
    let provider = network::setup_provider(&config)?;
    let chain: Arc<dyn ChainClient> = Arc::new(RpcChainClient::new(provider));
    network::verify_chain(chain.as_ref(), config.chain_id, &RetryConfig::connection()).await?;

    let token_meta = Arc::new(TokenMetaCache::new(chain.clone()));
    let stablecoin = Stablecoin::resolve(&token_meta, config.stablecoin).await?;

    let store = Arc::new(Store::open(&config.store_path)?);
    let nonces = Arc::new(NonceManager::new(chain.clone(), store.clone()));

    let mut aggregators = AggregatorRegistry::new();
    let relay = RelayClient::from_config(&config, chain.clone(), nonces.clone())?;
    aggregators.register(Arc::new(RelayAggregator::new(Arc::new(relay))));

    let notifier: Arc<dyn Notifier> = match &config.telegram_bot_token {
        Some(token) => Arc::new(TelegramNotifier::new(token)?),
        None => {
            warn!("⚠️ TELEGRAM_BOT_TOKEN not set, notifications go to the log");
            Arc::new(LogNotifier)
        }
    };
    let (notifications, notify_worker) = NotificationQueue::spawn(notifier, config.notify_queue_capacity);

    let ctx = Arc::new(ServiceContext {
        config: config.clone(),
        chain,
        store,
        nonces,
        aggregators,
        token_meta,
        vault: Arc::new(KeyVault::new(&config.hash_salt)),
        notifications,
        stablecoin,
    });

    let keeper = OrderKeeper::new(ctx.clone()).start();

    info!("\n🚀 Order keeper running, press Ctrl+C to stop\n");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
    }
    info!("\n📛 Received shutdown signal (Ctrl+C)...");

    keeper.stop().await;

    // The worker exits once the last queue handle is gone.
    drop(ctx);
    if tokio::time::timeout(NOTIFY_DRAIN_TIMEOUT, notify_worker).await.is_err() {
        warn!("⚠️ Notification queue not drained within {:?}", NOTIFY_DRAIN_TIMEOUT);
    }

    info!("🛑 Shut down gracefully");
    Ok(())
}
