//! Wallet and strategy records referenced by the executor

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: i64,
    pub account: Address,
    /// Sealed private key, see [`crate::wallet::KeyVault`].
    pub private_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    pub guid: String,
    pub user_id: i64,
    pub token: Address,
    pub symbol: String,
    pub first_order_id: Option<u64>,
    pub enable_push_notification: bool,
}
