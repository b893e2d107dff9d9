//! Periodic reconciliation of pending orders against their receipts

use alloy::primitives::{Address, I256, TxHash};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::{
    context::ServiceContext,
    errors::GridError,
    evm::{extract_balance_deltas, to_decimal, token_balance},
    keeper::reconcile::{closing_transition, cost_basis, rejection_transition, settle_fill},
    storage::{OrderClosing, OrderRejection},
    swap::{SellRequest, SwapService},
    types::{Order, OrderSide},
    utils::display,
};

pub const REVERTED_REASON: &str = "execution reverted";

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub closed: usize,
    pub rejected: usize,
    pub timed_out: usize,
    pub skipped: usize,
    /// Receipt lookup failed and the rest of the batch was left for the next tick.
    pub aborted: bool,
}

pub struct OrderKeeper {
    ctx: Arc<ServiceContext>,
    /// Hashes given up on; lost on restart.
    timed_out: HashSet<TxHash>,
}

impl OrderKeeper {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self {
            ctx,
            timed_out: HashSet::new(),
        }
    }

    pub fn is_timed_out(&self, hash: &TxHash) -> bool {
        self.timed_out.contains(hash)
    }

    /// Spawns the keeper loop. The first tick runs immediately.
    pub fn start(self) -> OrderKeeperHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        info!("[OrderKeeper] Starting service");
        let task = tokio::spawn(self.run(shutdown_rx));
        OrderKeeperHandle { shutdown_tx, task }
    }

    async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let interval = self.ctx.config.keeper_interval();

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.tick().await;

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.changed() => break,
            }
        }
    }

    pub async fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        let orders = self.ctx.store.pending_orders(self.ctx.config.keeper_batch_size).await;
        if orders.is_empty() {
            return report;
        }

        let now = Utc::now();
        let timeout = chrono::Duration::from_std(self.ctx.config.receipt_timeout())
            .unwrap_or(chrono::Duration::MAX);
        let mut filled: Vec<(Order, HashMap<Address, I256>)> = Vec::new();

        for order in orders {
            if self.timed_out.contains(&order.tx_hash) {
                report.skipped += 1;
                continue;
            }

            match self.ctx.chain.transaction_receipt(order.tx_hash).await {
                Ok(None) => {
                    let waited = now - order.created_at;
                    if waited > timeout {
                        self.timed_out.insert(order.tx_hash);
                        report.timed_out += 1;
                        let err = GridError::Timeout {
                            hash: order.tx_hash,
                            waited_secs: waited.num_seconds().max(0) as u64,
                        };
                        error!(
                            order_id = order.id,
                            account = %order.account,
                            nonce = order.nonce,
                            created_at = %order.created_at,
                            "[OrderKeeper] {}, giving up", err
                        );
                    } else {
                        debug!(order_id = order.id, "[OrderKeeper] {}", GridError::ReceiptNotFound { hash: order.tx_hash });
                    }
                }
                Err(e) => {
                    error!(
                        order_id = order.id,
                        account = %order.account,
                        nonce = order.nonce,
                        hash = %order.tx_hash,
                        "[OrderKeeper] Failed to fetch receipt: {}", e
                    );
                    report.aborted = true;
                    return report;
                }
                Ok(Some(receipt)) if !receipt.status => {
                    warn!(order_id = order.id, "[OrderKeeper] {}", GridError::ExecutionReverted { hash: order.tx_hash });
                    if self.reject(&order, REVERTED_REASON).await {
                        report.rejected += 1;
                    }
                }
                Ok(Some(receipt)) => {
                    let deltas = extract_balance_deltas(&receipt.logs, order.account);
                    filled.push((order, deltas));
                }
            }
        }

        for (order, deltas) in filled {
            if self.close(&order, &deltas).await {
                report.closed += 1;
            }
        }

        report
    }

    async fn close(&self, order: &Order, deltas: &HashMap<Address, I256>) -> bool {
        let ctx = &self.ctx;

        let meta = match ctx.token_meta.get_token_meta(order.token).await {
            Ok(meta) => meta,
            Err(e) => {
                error!("[OrderKeeper] Failed to load token meta, token: {}, {}", order.token, e);
                return false;
            }
        };

        let fill = settle_fill(order, deltas, meta.decimals, ctx.stablecoin.address, ctx.stablecoin.decimals);

        let grid = match (&order.grid_id, order.grid_buy_cost) {
            (Some(guid), None) if order.side == OrderSide::Sell => {
                let grid = ctx.store.find_grid(guid).await;
                if grid.is_none() {
                    error!("[OrderKeeper] Grid {} not found for order {}", guid, order.id);
                }
                grid
            }
            _ => None,
        };
        let profit = cost_basis(order, grid.as_ref()).map(|cost| fill.out_amount - cost);

        let closing = OrderClosing {
            order_id: order.id,
            final_price: fill.final_price,
            out_amount: fill.out_amount,
            profit,
            grid: closing_transition(order, &fill),
            strategy_id: order.strategy_id.clone(),
        };

        let closed = match ctx.store.close_order(&closing).await {
            Ok(closed) => closed,
            Err(e) => {
                error!(
                    order_id = order.id,
                    hash = %order.tx_hash,
                    "[OrderKeeper] Failed to close order: {}", e
                );
                return false;
            }
        };
        info!(
            order_id = closed.id,
            side = %closed.side,
            final_price = %closed.final_price,
            out_amount = %closed.out_amount,
            profit = ?closed.profit,
            hash = %closed.tx_hash,
            "[OrderKeeper] Order closed"
        );

        let balance = match token_balance(ctx.chain.as_ref(), ctx.stablecoin.address, order.account).await {
            Ok(raw) => Some(to_decimal(raw, ctx.stablecoin.decimals)),
            Err(e) => {
                error!("[OrderKeeper] Failed to fetch {} balance of {}, {}", ctx.stablecoin.symbol, order.account, e);
                None
            }
        };

        let text = display::fill_message(ctx.config.chain_id, &closed, fill.stable_delta, balance);
        self.notify(&closed, text, closed.is_liquidation()).await;
        true
    }

    async fn reject(&self, order: &Order, reason: &str) -> bool {
        let rejection = OrderRejection {
            order_id: order.id,
            reason: reason.to_string(),
            grid: rejection_transition(order),
        };

        let rejected = match self.ctx.store.reject_order(&rejection).await {
            Ok(rejected) => rejected,
            Err(e) => {
                error!(
                    order_id = order.id,
                    hash = %order.tx_hash,
                    "[OrderKeeper] Failed to reject order: {}", e
                );
                return false;
            }
        };
        info!(
            order_id = rejected.id,
            hash = %rejected.tx_hash,
            reason,
            "[OrderKeeper] Order rejected"
        );

        let text = display::reject_message(self.ctx.config.chain_id, &rejected);
        self.notify(&rejected, text, rejected.is_liquidation()).await;

        if rejected.is_liquidation() {
            self.retry_liquidation(&rejected).await;
        }
        true
    }

    /// Re-sells what a failed liquidation tried to sell, carrying its cost basis.
    async fn retry_liquidation(&self, order: &Order) {
        let ctx = &self.ctx;

        let Some(wallet) = ctx.store.find_wallet_by_account(order.account).await else {
            error!("[OrderKeeper] Wallet not found for {}, cannot retry liquidation", order.account);
            return;
        };

        self.notify(order, display::retry_message(&order.symbol), true).await;

        let request = SellRequest {
            token: order.token,
            symbol: order.symbol.clone(),
            amount: Some(order.in_amount),
            min_price: None,
            exit: true,
            strategy_id: order.strategy_id.clone(),
            grid_buy_cost: order.grid_buy_cost,
        };

        match SwapService::new(ctx.clone(), wallet.user_id).sell_token(request).await {
            Ok(retry) => info!(
                order_id = retry.id,
                retry_of = order.id,
                hash = %retry.tx_hash,
                "[OrderKeeper] Liquidation resubmitted"
            ),
            Err(e) => {
                error!(
                    "[OrderKeeper] Liquidation retry failed, strategy: {:?}, token: {}, {}",
                    order.strategy_id, order.symbol, e
                );
                self.notify(order, display::retry_failed_message(&order.symbol), true).await;
            }
        }
    }

    /// Queues `text` for the order's owner. Non-forced messages respect the
    /// strategy's push setting.
    async fn notify(&self, order: &Order, text: String, force: bool) {
        let store = &self.ctx.store;

        let Some(wallet) = store.find_wallet_by_account(order.account).await else {
            error!("[OrderKeeper] Wallet not found for {}", order.account);
            return;
        };

        if let Some(strategy_id) = &order.strategy_id {
            let Some(strategy) = store.find_strategy(strategy_id).await else {
                error!("[OrderKeeper] Strategy {} not found, userId: {}", strategy_id, wallet.user_id);
                return;
            };
            if !force && !strategy.enable_push_notification {
                return;
            }
        }

        if wallet.user_id == 0 {
            warn!("[OrderKeeper] Wallet {} has no chat user, notification dropped", wallet.account);
            return;
        }

        self.ctx.notifications.push(wallet.user_id, text);
    }
}

pub struct OrderKeeperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl OrderKeeperHandle {
    /// Signals shutdown and waits for the running tick to finish.
    pub async fn stop(self) {
        info!("[OrderKeeper] Stopping service");
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            error!("[OrderKeeper] Task ended abnormally: {}", e);
        }
        info!("[OrderKeeper] Service stopped");
    }
}
