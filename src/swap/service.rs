//! Swap pipeline entry point for one user

use alloy::{
    primitives::{Address, U256},
    signers::{Signer, local::PrivateKeySigner},
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::{
    aggregator::QuoteRequest,
    context::ServiceContext,
    errors::{GridError, GridResult},
    evm::{self, to_base_units, to_decimal},
    swap::{SwapTransaction, resolve_slippage_bps},
    types::{NewOrder, Order, OrderSide, Settings},
};

/// Sell of a token into the chain's stablecoin.
#[derive(Debug, Clone)]
pub struct SellRequest {
    pub token: Address,
    pub symbol: String,
    /// Token units to sell; the whole balance when `None`. Clamped to the balance.
    pub amount: Option<Decimal>,
    /// Cancel when the quoted price falls below this.
    pub min_price: Option<Decimal>,
    pub exit: bool,
    pub strategy_id: Option<String>,
    pub grid_buy_cost: Option<Decimal>,
}

struct Inner {
    ctx: Arc<ServiceContext>,
    user_id: i64,
    signer: OnceCell<PrivateKeySigner>,
    settings: OnceCell<Settings>,
}

/// Cheap to clone; the signing key and settings are loaded once per instance.
#[derive(Clone)]
pub struct SwapService {
    inner: Arc<Inner>,
}

impl SwapService {
    pub fn new(ctx: Arc<ServiceContext>, user_id: i64) -> Self {
        Self {
            inner: Arc::new(Inner {
                ctx,
                user_id,
                signer: OnceCell::new(),
                settings: OnceCell::new(),
            }),
        }
    }

    pub fn user_id(&self) -> i64 {
        self.inner.user_id
    }

    pub(crate) async fn signer(&self) -> GridResult<&PrivateKeySigner> {
        let inner = &self.inner;
        inner
            .signer
            .get_or_try_init(|| async {
                let wallet = inner.ctx.store.find_wallet(inner.user_id).await.ok_or_else(|| {
                    error!("[SwapService] Wallet not found, userId: {}", inner.user_id);
                    GridError::NotFound {
                        entity: "wallet",
                        key: inner.user_id.to_string(),
                    }
                })?;

                inner.ctx.vault.clone().open_signer_async(wallet.private_key).await.map_err(|e| {
                    error!("[SwapService] Failed to open private key, userId: {}, {}", inner.user_id, e);
                    e
                })
            })
            .await
    }

    async fn settings(&self) -> GridResult<&Settings> {
        let inner = &self.inner;
        inner
            .settings
            .get_or_try_init(|| async {
                match inner.ctx.store.find_settings(inner.user_id).await {
                    Some(settings) => Ok(settings),
                    None => {
                        debug!("[SwapService] No settings for user {}, using chain defaults", inner.user_id);
                        Ok(Settings::chain_default(
                            inner.user_id,
                            inner.ctx.config.slippage_bps,
                            inner.ctx.config.dex_aggregator,
                        ))
                    }
                }
            })
            .await
    }

    /// Quotes an exact-input swap with the user's slippage policy and aggregator.
    pub async fn quote(
        &self,
        input_token: Address,
        output_token: Address,
        amount: U256,
        exit: bool,
    ) -> GridResult<SwapTransaction> {
        let signer = self.signer().await?.address();
        let settings = self.settings().await?;
        let ctx = &self.inner.ctx;

        let slippage_bps = resolve_slippage_bps(settings, output_token, ctx.stablecoin.address, exit);
        let aggregator = ctx.aggregators.get(settings.dex_aggregator)?;

        let request = QuoteRequest {
            chain_id: ctx.config.chain_id,
            user: signer,
            input_token,
            output_token,
            amount,
            slippage_bps,
            infinite_approval: settings.infinite_approval(),
        };
        let quote = aggregator.quote(&request).await?;

        debug!(
            "[SwapService] Quoted {} {} -> {} via {}, out {}, slippage {} bps",
            amount,
            input_token,
            output_token,
            settings.dex_aggregator,
            quote.out_amount(),
            slippage_bps
        );

        Ok(SwapTransaction::new(quote, self.clone(), signer))
    }

    /// Sells `request.token` for the stablecoin and records the pending order.
    pub async fn sell_token(&self, request: SellRequest) -> GridResult<Order> {
        let ctx = &self.inner.ctx;
        let account = self.signer().await?.address();

        let meta = ctx.token_meta.get_token_meta(request.token).await?;
        let raw_balance = evm::token_balance(ctx.chain.as_ref(), request.token, account).await?;
        let balance = to_decimal(raw_balance, meta.decimals);

        let amount = match request.amount {
            Some(amount) if amount > balance => {
                warn!(
                    "[SwapService] Sell amount {} exceeds balance {} of {}, selling balance",
                    amount, balance, request.symbol
                );
                balance
            }
            Some(amount) => amount,
            None => balance,
        };
        if amount <= Decimal::ZERO {
            return Err(GridError::insufficient(request.token, raw_balance, U256::from(1)));
        }

        let tx = self
            .quote(request.token, ctx.stablecoin.address, to_base_units(amount, meta.decimals), request.exit)
            .await?;

        let out_amount = to_decimal(tx.out_amount(), ctx.stablecoin.decimals);
        let quoted_price = out_amount.checked_div(amount).unwrap_or(Decimal::ZERO);
        if let Some(floor) = request.min_price {
            if quoted_price < floor {
                debug!(
                    "[SwapService] Quote for {} below floor, price {}, floor {}",
                    request.symbol, quoted_price, floor
                );
                return Err(GridError::PriceTooLow {
                    quoted: quoted_price.to_string(),
                    floor: floor.to_string(),
                });
            }
        }

        let (tx_hash, nonce) = tx.swap().await?;
        info!(
            "[SwapService] Sell submitted, user: {}, token: {}, amount: {}, out: {}, hash: {}",
            self.user_id(),
            request.symbol,
            amount,
            out_amount,
            tx_hash
        );

        ctx.store
            .insert_order(NewOrder {
                account: tx.signer(),
                token: request.token,
                symbol: request.symbol,
                strategy_id: request.strategy_id,
                side: OrderSide::Sell,
                quoted_price,
                in_amount: amount,
                out_amount,
                nonce,
                tx_hash,
                grid_id: None,
                grid_number: None,
                grid_buy_cost: request.grid_buy_cost,
            })
            .await
    }
}
