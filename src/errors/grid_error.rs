//! Error taxonomy for execution and reconciliation

use alloy::primitives::{Address, TxHash, U256};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Unsupported chain: {chain_id}")]
    UnsupportedChain { chain_id: u64 },

    #[error("Unsupported aggregator: {name}")]
    UnsupportedAggregator { name: String },

    #[error("Malformed call data: {reason}")]
    MalformedCallData { reason: String },

    #[error("Insufficient balance of {asset}: have {available}, need {required}")]
    InsufficientBalance {
        asset: String,
        available: U256,
        required: U256,
    },

    #[error("Upstream API error (status {status}): {message}")]
    UpstreamApi { status: u16, message: String },

    #[error("Receipt not found: {hash}")]
    ReceiptNotFound { hash: TxHash },

    #[error("Transaction {hash} not mined after {waited_secs}s")]
    Timeout { hash: TxHash, waited_secs: u64 },

    #[error("Execution reverted: {hash}")]
    ExecutionReverted { hash: TxHash },

    #[error("Signing failed: {message}")]
    Signing { message: String },

    #[error("Persistence error: {message}")]
    Persistence {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("RPC error: {message}")]
    Rpc {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("HTTP error: {message}")]
    Http {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Data parsing error: {context}")]
    DataParsing {
        context: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Quoted price {quoted} is below floor {floor}")]
    PriceTooLow { quoted: String, floor: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Encryption error: {0}")]
    Encryption(String),
}

pub type GridResult<T> = Result<T, GridError>;

impl GridError {
    pub fn rpc(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        GridError::Rpc {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        GridError::Persistence {
            message: message.into(),
            source: None,
        }
    }

    pub fn parsing(context: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        GridError::DataParsing {
            context: context.into(),
            source: Some(source.into()),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        GridError::MalformedCallData {
            reason: reason.into(),
        }
    }

    pub fn insufficient(asset: Address, available: U256, required: U256) -> Self {
        GridError::InsufficientBalance {
            asset: asset.to_checksum(None),
            available,
            required,
        }
    }
}
