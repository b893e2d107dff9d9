//! On-chain views consumed by the executor

use alloy::primitives::{Log, TxHash};

/// Mined transaction outcome: status plus emitted logs.
#[derive(Debug, Clone)]
pub struct TxReceipt {
    pub transaction_hash: TxHash,
    pub status: bool,
    pub logs: Vec<Log>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMeta {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}
