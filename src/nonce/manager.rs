//! Nonce coordinator: one in-flight submission per account, durable last-issued nonce

use alloy::primitives::{Address, TxHash};
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tracing::{debug, error};

use crate::{errors::GridResult, network::ChainClient};

/// Idle per-account locks are pruned once the table grows past this.
pub const DEFAULT_LOCK_TABLE_CAPACITY: usize = 1024;

/// Durable last-issued nonce per account.
#[async_trait]
pub trait NonceStore: Send + Sync {
    async fn last_issued_nonce(&self, account: Address) -> GridResult<Option<u64>>;

    /// Inserts the record on first use, updates it afterwards.
    async fn record_issued_nonce(&self, account: Address, nonce: u64) -> GridResult<()>;
}

type AccountLock = Arc<tokio::sync::Mutex<()>>;

pub struct NonceManager {
    chain: Arc<dyn ChainClient>,
    store: Arc<dyn NonceStore>,
    locks: Mutex<HashMap<Address, AccountLock>>,
    capacity: usize,
}

impl NonceManager {
    pub fn new(chain: Arc<dyn ChainClient>, store: Arc<dyn NonceStore>) -> Self {
        Self::with_capacity(chain, store, DEFAULT_LOCK_TABLE_CAPACITY)
    }

    pub fn with_capacity(chain: Arc<dyn ChainClient>, store: Arc<dyn NonceStore>, capacity: usize) -> Self {
        Self {
            chain,
            store,
            locks: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    fn account_lock(&self, account: Address) -> AccountLock {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if locks.len() >= self.capacity && !locks.contains_key(&account) {
            // Only the table holds a reference to an idle lock.
            let before = locks.len();
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            debug!("[NonceManager] Pruned {} idle account locks", before - locks.len());
        }

        locks.entry(account).or_default().clone()
    }

    /// Number of account locks currently tracked.
    pub fn tracked_accounts(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or_else(|p| p.into_inner().len())
    }

    /// Runs `consume` with the next unused nonce for `account`.
    ///
    /// The account stays locked from the chain query until the nonce is recorded, so
    /// concurrent callers for the same account receive consecutive nonces. The nonce is
    /// recorded only when `consume` succeeds; a failure to record it is logged and not
    /// returned, since the transaction has already left the process.
    pub async fn request<F, Fut>(&self, account: Address, consume: F) -> GridResult<(TxHash, u64)>
    where
        F: FnOnce(u64) -> Fut + Send,
        Fut: Future<Output = GridResult<TxHash>> + Send,
    {
        let lock = self.account_lock(account);
        let _guard = lock.lock().await;

        let mut nonce = self.chain.pending_nonce(account).await?;

        if let Some(last_issued) = self.store.last_issued_nonce(account).await? {
            if last_issued >= nonce {
                debug!(
                    "[NonceManager] Node reports nonce {} for {}, last issued {}",
                    nonce, account, last_issued
                );
                nonce = last_issued + 1;
            }
        }

        let hash = consume(nonce).await?;

        if let Err(e) = self.store.record_issued_nonce(account, nonce).await {
            error!(
                account = %account,
                nonce,
                "[NonceManager] Failed to record issued nonce: {}", e
            );
        }

        Ok((hash, nonce))
    }
}
