//! Order records written by the swap pipeline and settled by the order keeper

use alloy::primitives::{Address, TxHash};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

/// `Pending` moves to exactly one of the two terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Closed,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub account: Address,
    pub token: Address,
    pub symbol: String,
    pub strategy_id: Option<String>,
    pub side: OrderSide,
    pub quoted_price: Decimal,
    /// Meaningless until the order is `Closed`.
    pub final_price: Decimal,
    pub in_amount: Decimal,
    /// Quoted output while pending, realized output once closed.
    pub out_amount: Decimal,
    pub status: OrderStatus,
    pub reason: Option<String>,
    pub nonce: u64,
    pub tx_hash: TxHash,
    pub grid_id: Option<String>,
    pub grid_number: Option<u32>,
    pub grid_buy_cost: Option<Decimal>,
    pub profit: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_grid_order(&self) -> bool {
        self.grid_id.is_some()
    }

    /// A sell with no grid behind it is a manual "liquidate all" trade.
    pub fn is_liquidation(&self) -> bool {
        self.side == OrderSide::Sell && self.grid_id.is_none()
    }
}

/// Insert form of [`Order`]; the store assigns id, status and timestamps.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub account: Address,
    pub token: Address,
    pub symbol: String,
    pub strategy_id: Option<String>,
    pub side: OrderSide,
    pub quoted_price: Decimal,
    pub in_amount: Decimal,
    pub out_amount: Decimal,
    pub nonce: u64,
    pub tx_hash: TxHash,
    pub grid_id: Option<String>,
    pub grid_number: Option<u32>,
    pub grid_buy_cost: Option<Decimal>,
}

impl NewOrder {
    pub fn into_order(self, id: u64, now: DateTime<Utc>) -> Order {
        Order {
            id,
            account: self.account,
            token: self.token,
            symbol: self.symbol,
            strategy_id: self.strategy_id,
            side: self.side,
            quoted_price: self.quoted_price,
            final_price: self.quoted_price,
            in_amount: self.in_amount,
            out_amount: self.out_amount,
            status: OrderStatus::Pending,
            reason: None,
            nonce: self.nonce,
            tx_hash: self.tx_hash,
            grid_id: self.grid_id,
            grid_number: self.grid_number,
            grid_buy_cost: self.grid_buy_cost,
            profit: None,
            created_at: now,
            updated_at: now,
        }
    }
}
