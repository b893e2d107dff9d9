//! Executor configuration settings and environment variable handling

use alloy::primitives::{Address, address};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::types::AggregatorKind;

// Configuration constants
pub const DEFAULT_CHAIN_ID: u64 = 8453;
pub const BASE_USDC: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
pub const DEFAULT_SLIPPAGE_BPS: u32 = 50; // 0.5%
pub const MAX_SLIPPAGE_BPS: u32 = 5000; // 50%
pub const DEFAULT_RELAY_API_URL: &str = "https://api.relay.link";

// Order keeper constants
pub const DEFAULT_KEEPER_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_KEEPER_BATCH_SIZE: usize = 100;
pub const DEFAULT_RECEIPT_TIMEOUT_SECS: u64 = 120;

// Notification constants
pub const DEFAULT_NOTIFY_QUEUE_CAPACITY: usize = 256;

pub const DEFAULT_STORE_PATH: &str = "output/state/store.jsonl";
const FALLBACK_HASH_SALT: &str = "8wKzxf51vQJT5n=bM6e?z)6B]XiDXcMdE]=>GiXm";

#[derive(Debug, Clone)]
pub struct Config {
    // Chain
    pub rpc_url: Option<String>,
    pub chain_id: u64,
    pub stablecoin: Address,
    // Per-chain trade defaults
    pub slippage_bps: u32,
    pub dex_aggregator: AggregatorKind,
    // Aggregator API
    pub relay_api_url: String,
    pub relay_api_key: Option<String>,
    pub relay_api_secret: Option<String>,
    pub relay_api_passphrase: Option<String>,
    // Order keeper
    pub keeper_interval_ms: u64,
    pub keeper_batch_size: usize,
    pub receipt_timeout_secs: u64,
    // Storage and secrets
    pub store_path: String,
    pub hash_salt: String,
    // Notifications
    pub telegram_bot_token: Option<String>,
    pub notify_queue_capacity: usize,
}

impl Config {
    pub fn load() -> Self {
        Self {
            rpc_url: env::var("RPC_URL").ok(),
            chain_id: env::var("CHAIN_ID")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CHAIN_ID),
            stablecoin: env::var("STABLECOIN_ADDRESS")
                .ok()
                .and_then(|s| Address::from_str(&s).ok())
                .unwrap_or(BASE_USDC),
            slippage_bps: env::var("SLIPPAGE_BPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SLIPPAGE_BPS)
                .min(MAX_SLIPPAGE_BPS),
            dex_aggregator: env::var("DEX_AGGREGATOR")
                .ok()
                .and_then(|s| AggregatorKind::from_str(&s).ok())
                .unwrap_or(AggregatorKind::Relay),
            relay_api_url: env::var("RELAY_API_URL")
                .unwrap_or_else(|_| DEFAULT_RELAY_API_URL.to_string()),
            relay_api_key: env::var("RELAY_API_KEY").ok(),
            relay_api_secret: env::var("RELAY_API_SECRET").ok(),
            relay_api_passphrase: env::var("RELAY_API_PASSPHRASE").ok(),
            keeper_interval_ms: env::var("KEEPER_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_KEEPER_INTERVAL_MS)
                .max(100),
            keeper_batch_size: env::var("KEEPER_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_KEEPER_BATCH_SIZE)
                .max(1),
            receipt_timeout_secs: env::var("RECEIPT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RECEIPT_TIMEOUT_SECS),
            store_path: env::var("STORE_PATH")
                .unwrap_or_else(|_| DEFAULT_STORE_PATH.to_string()),
            hash_salt: env::var("GRIDBOT_HASH_SALT").unwrap_or_else(|_| {
                tracing::debug!("GRIDBOT_HASH_SALT not set, using built-in salt");
                FALLBACK_HASH_SALT.to_string()
            }),
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
            notify_queue_capacity: env::var("NOTIFY_QUEUE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_NOTIFY_QUEUE_CAPACITY)
                .max(1),
        }
    }

    pub fn keeper_interval(&self) -> Duration {
        Duration::from_millis(self.keeper_interval_ms)
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }
}

impl Default for Config {
    /// Defaults without consulting the environment.
    fn default() -> Self {
        Self {
            rpc_url: None,
            chain_id: DEFAULT_CHAIN_ID,
            stablecoin: BASE_USDC,
            slippage_bps: DEFAULT_SLIPPAGE_BPS,
            dex_aggregator: AggregatorKind::Relay,
            relay_api_url: DEFAULT_RELAY_API_URL.to_string(),
            relay_api_key: None,
            relay_api_secret: None,
            relay_api_passphrase: None,
            keeper_interval_ms: DEFAULT_KEEPER_INTERVAL_MS,
            keeper_batch_size: DEFAULT_KEEPER_BATCH_SIZE,
            receipt_timeout_secs: DEFAULT_RECEIPT_TIMEOUT_SECS,
            store_path: DEFAULT_STORE_PATH.to_string(),
            hash_salt: FALLBACK_HASH_SALT.to_string(),
            telegram_bot_token: None,
            notify_queue_capacity: DEFAULT_NOTIFY_QUEUE_CAPACITY,
        }
    }
}
