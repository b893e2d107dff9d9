//! Chain RPC surface used by the executor, and its alloy-backed implementation

use alloy::{
    primitives::{Address, Bytes, TxHash, U256},
    providers::Provider,
    rpc::types::eth::TransactionRequest,
};
use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    ConcreteProvider,
    errors::{GridError, GridResult},
    types::TxReceipt,
};

#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn chain_id(&self) -> GridResult<u64>;

    /// Next usable nonce including transactions still in the node's pool.
    async fn pending_nonce(&self, account: Address) -> GridResult<u64>;

    async fn balance(&self, account: Address) -> GridResult<U256>;

    async fn call(&self, to: Address, data: Bytes) -> GridResult<Bytes>;

    async fn send_raw_transaction(&self, raw: Bytes) -> GridResult<TxHash>;

    /// `Ok(None)` while the transaction is unknown to the node or not yet mined.
    async fn transaction_receipt(&self, hash: TxHash) -> GridResult<Option<TxReceipt>>;
}

pub struct RpcChainClient {
    provider: Arc<ConcreteProvider>,
}

impl RpcChainClient {
    pub fn new(provider: Arc<ConcreteProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn chain_id(&self) -> GridResult<u64> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| GridError::rpc("eth_chainId failed", e))
    }

    async fn pending_nonce(&self, account: Address) -> GridResult<u64> {
        self.provider
            .get_transaction_count(account)
            .pending()
            .await
            .map_err(|e| GridError::rpc(format!("eth_getTransactionCount failed for {account}"), e))
    }

    async fn balance(&self, account: Address) -> GridResult<U256> {
        self.provider
            .get_balance(account)
            .await
            .map_err(|e| GridError::rpc(format!("eth_getBalance failed for {account}"), e))
    }

    async fn call(&self, to: Address, data: Bytes) -> GridResult<Bytes> {
        let tx = TransactionRequest::default().to(to).input(data.into());
        self.provider
            .call(&tx)
            .await
            .map_err(|e| GridError::rpc(format!("eth_call failed for {to}"), e))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> GridResult<TxHash> {
        let pending = self
            .provider
            .send_raw_transaction(&raw)
            .await
            .map_err(|e| GridError::rpc("eth_sendRawTransaction failed", e))?;
        Ok(*pending.tx_hash())
    }

    async fn transaction_receipt(&self, hash: TxHash) -> GridResult<Option<TxReceipt>> {
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| GridError::rpc(format!("eth_getTransactionReceipt failed for {hash}"), e))?;

        Ok(receipt.map(|receipt| TxReceipt {
            transaction_hash: receipt.transaction_hash,
            status: receipt.status(),
            logs: receipt.inner.logs().iter().map(|log| log.inner.clone()).collect(),
        }))
    }
}
