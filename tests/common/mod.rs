#![allow(dead_code)]

use alloy::{
    primitives::{Address, Bytes, Log, TxHash, U256, address, keccak256},
    signers::{Signer, local::PrivateKeySigner},
    sol_types::SolValue,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use evm_grid_executor::{
    Config, GridError, GridResult, ServiceContext, Stablecoin,
    aggregator::{AggregatorQuote, AggregatorRegistry, DexAggregator, QuoteRequest},
    evm::{TRANSFER_TOPIC, TokenMetaCache, selector},
    network::ChainClient,
    nonce::NonceManager,
    notify::{Notification, NotificationQueue},
    storage::Store,
    types::{AggregatorKind, NewOrder, Order, OrderSide, Strategy, TokenMeta, TxReceipt, Wallet},
    wallet::KeyVault,
};

pub const USDC: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
pub const TOKEN: Address = address!("4ed4E862860beD51a9570b96d89aF5E1B0Efefed");
pub const POOL: Address = address!("1111111111111111111111111111111111111111");
pub const ANVIL_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const USER_ID: i64 = 42;
pub const STRATEGY_ID: &str = "strategy-1";

#[derive(Default)]
struct ChainState {
    nonces: HashMap<Address, u64>,
    native: HashMap<Address, U256>,
    tokens: HashMap<Address, TokenMeta>,
    token_balances: HashMap<(Address, Address), U256>,
    receipts: HashMap<TxHash, TxReceipt>,
    fail_receipts: bool,
    receipt_lookups: usize,
    sent: Vec<Bytes>,
}

/// In-memory chain answering ERC-20 view calls and recording raw transactions.
pub struct MockChain {
    chain_id: u64,
    state: Mutex<ChainState>,
}

impl MockChain {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            state: Mutex::new(ChainState::default()),
        }
    }

    pub fn set_pending_nonce(&self, account: Address, nonce: u64) {
        self.state.lock().unwrap().nonces.insert(account, nonce);
    }

    pub fn set_native(&self, account: Address, amount: U256) {
        self.state.lock().unwrap().native.insert(account, amount);
    }

    pub fn add_token(&self, token: Address, name: &str, symbol: &str, decimals: u8) {
        self.state.lock().unwrap().tokens.insert(
            token,
            TokenMeta {
                name: name.to_string(),
                symbol: symbol.to_string(),
                decimals,
            },
        );
    }

    pub fn set_token_balance(&self, token: Address, owner: Address, amount: U256) {
        self.state.lock().unwrap().token_balances.insert((token, owner), amount);
    }

    pub fn set_receipt(&self, hash: TxHash, status: bool, logs: Vec<Log>) {
        self.state.lock().unwrap().receipts.insert(
            hash,
            TxReceipt {
                transaction_hash: hash,
                status,
                logs,
            },
        );
    }

    pub fn fail_receipts(&self, fail: bool) {
        self.state.lock().unwrap().fail_receipts = fail;
    }

    pub fn receipt_lookups(&self) -> usize {
        self.state.lock().unwrap().receipt_lookups
    }

    pub fn sent(&self) -> Vec<Bytes> {
        self.state.lock().unwrap().sent.clone()
    }
}

fn reverted(to: Address) -> GridError {
    GridError::Rpc {
        message: format!("eth_call failed for {to}: execution reverted"),
        source: None,
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn chain_id(&self) -> GridResult<u64> {
        Ok(self.chain_id)
    }

    async fn pending_nonce(&self, account: Address) -> GridResult<u64> {
        Ok(self.state.lock().unwrap().nonces.get(&account).copied().unwrap_or(0))
    }

    async fn balance(&self, account: Address) -> GridResult<U256> {
        Ok(self.state.lock().unwrap().native.get(&account).copied().unwrap_or_default())
    }

    async fn call(&self, to: Address, data: Bytes) -> GridResult<Bytes> {
        let state = self.state.lock().unwrap();
        let meta = state.tokens.get(&to).ok_or_else(|| reverted(to))?;
        if data.len() < 4 {
            return Err(reverted(to));
        }

        let method = &data[..4];
        let encoded = if method == selector("balanceOf(address)") && data.len() >= 36 {
            let owner = Address::from_slice(&data[16..36]);
            state.token_balances.get(&(to, owner)).copied().unwrap_or_default().abi_encode()
        } else if method == selector("name()") {
            meta.name.abi_encode()
        } else if method == selector("symbol()") {
            meta.symbol.abi_encode()
        } else if method == selector("decimals()") {
            U256::from(meta.decimals).abi_encode()
        } else {
            return Err(reverted(to));
        };
        Ok(encoded.into())
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> GridResult<TxHash> {
        let hash = keccak256(&raw);
        self.state.lock().unwrap().sent.push(raw);
        Ok(hash)
    }

    async fn transaction_receipt(&self, hash: TxHash) -> GridResult<Option<TxReceipt>> {
        let mut state = self.state.lock().unwrap();
        state.receipt_lookups += 1;
        if state.fail_receipts {
            return Err(GridError::Rpc {
                message: format!("eth_getTransactionReceipt failed for {hash}"),
                source: None,
            });
        }
        Ok(state.receipts.get(&hash).cloned())
    }
}

pub fn transfer_log(token: Address, from: Address, to: Address, amount: U256) -> Log {
    let data = Bytes::from(amount.to_be_bytes::<32>().to_vec());
    Log::new_unchecked(token, vec![TRANSFER_TOPIC, from.into_word(), to.into_word()], data)
}

/// Aggregator answering every quote with a fixed output and submission result.
pub struct MockAggregator {
    out_amount: U256,
    result: (TxHash, u64),
    requests: Mutex<Vec<QuoteRequest>>,
    executions: Arc<Mutex<usize>>,
}

impl MockAggregator {
    pub fn new(out_amount: U256, result: (TxHash, u64)) -> Self {
        Self {
            out_amount,
            result,
            requests: Mutex::new(Vec::new()),
            executions: Arc::new(Mutex::new(0)),
        }
    }

    pub fn requests(&self) -> Vec<QuoteRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn executions(&self) -> usize {
        *self.executions.lock().unwrap()
    }
}

struct MockQuote {
    out_amount: U256,
    slippage_bps: u32,
    result: (TxHash, u64),
    executions: Arc<Mutex<usize>>,
}

#[async_trait]
impl DexAggregator for MockAggregator {
    fn kind(&self) -> AggregatorKind {
        AggregatorKind::Relay
    }

    async fn quote(&self, request: &QuoteRequest) -> GridResult<Box<dyn AggregatorQuote>> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(Box::new(MockQuote {
            out_amount: self.out_amount,
            slippage_bps: request.slippage_bps,
            result: self.result,
            executions: self.executions.clone(),
        }))
    }
}

#[async_trait]
impl AggregatorQuote for MockQuote {
    fn out_amount(&self) -> U256 {
        self.out_amount
    }

    fn slippage_bps(&self) -> u32 {
        self.slippage_bps
    }

    async fn execute(&self, _signer: &PrivateKeySigner) -> GridResult<(TxHash, u64)> {
        *self.executions.lock().unwrap() += 1;
        Ok(self.result)
    }
}

pub struct TestEnv {
    pub ctx: Arc<ServiceContext>,
    pub chain: Arc<MockChain>,
    pub store: Arc<Store>,
    pub aggregator: Arc<MockAggregator>,
    pub notifications: mpsc::Receiver<Notification>,
    pub account: Address,
}

impl TestEnv {
    /// Drains every queued notification.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(n) = self.notifications.try_recv() {
            out.push(n);
        }
        out
    }
}

/// Context on a mock chain with one wallet, USDC and an 18-decimal token.
pub async fn test_env(config: Config, aggregator: MockAggregator) -> TestEnv {
    let chain = Arc::new(MockChain::new(config.chain_id));
    chain.add_token(USDC, "USD Coin", "USDC", 6);
    chain.add_token(TOKEN, "Degen", "DEGEN", 18);

    let store = Arc::new(Store::in_memory());
    let vault = Arc::new(KeyVault::with_iterations("test-passphrase", 1000));

    let signer: PrivateKeySigner = ANVIL_KEY.parse().unwrap();
    let account = signer.address();
    store
        .insert_wallet(Wallet {
            user_id: USER_ID,
            account,
            private_key: vault.seal(ANVIL_KEY).unwrap(),
        })
        .await
        .unwrap();

    let chain_client: Arc<dyn ChainClient> = chain.clone();
    let token_meta = Arc::new(TokenMetaCache::new(chain_client.clone()));
    let stablecoin = Stablecoin::resolve(&token_meta, config.stablecoin).await.unwrap();
    let nonces = Arc::new(NonceManager::new(chain_client.clone(), store.clone()));

    let aggregator = Arc::new(aggregator);
    let mut aggregators = AggregatorRegistry::new();
    aggregators.register(aggregator.clone());

    let (notifications, receiver) = NotificationQueue::channel(64);

    let ctx = Arc::new(ServiceContext {
        config,
        chain: chain_client,
        store: store.clone(),
        nonces,
        aggregators,
        token_meta,
        vault,
        notifications,
        stablecoin,
    });

    TestEnv {
        ctx,
        chain,
        store,
        aggregator,
        notifications: receiver,
        account,
    }
}

pub async fn insert_strategy(store: &Store, push: bool) {
    store
        .insert_strategy(Strategy {
            guid: STRATEGY_ID.to_string(),
            user_id: USER_ID,
            token: TOKEN,
            symbol: "DEGEN".to_string(),
            first_order_id: None,
            enable_push_notification: push,
        })
        .await
        .unwrap();
}

pub fn new_order(account: Address, side: OrderSide, in_amount: Decimal, hash: TxHash) -> NewOrder {
    NewOrder {
        account,
        token: TOKEN,
        symbol: "DEGEN".to_string(),
        strategy_id: Some(STRATEGY_ID.to_string()),
        side,
        quoted_price: Decimal::ZERO,
        in_amount,
        out_amount: Decimal::ZERO,
        nonce: 0,
        tx_hash: hash,
        grid_id: None,
        grid_number: None,
        grid_buy_cost: None,
    }
}

pub async fn reload(store: &Store, order: &Order) -> Order {
    store.find_order(order.id).await.unwrap()
}
