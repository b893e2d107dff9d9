//! Durable last-issued nonce per account

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonceRecord {
    pub account: Address,
    pub last_issued_nonce: u64,
    pub updated_at: DateTime<Utc>,
}
