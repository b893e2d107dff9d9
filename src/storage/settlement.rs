//! Multi-row units of work applied atomically by the store

use rust_decimal::Decimal;

use crate::types::GridTransition;

/// Settles a pending order as filled.
#[derive(Debug, Clone)]
pub struct OrderClosing {
    pub order_id: u64,
    pub final_price: Decimal,
    pub out_amount: Decimal,
    /// `out_amount - cost` when a cost basis was known.
    pub profit: Option<Decimal>,
    pub grid: Option<GridTransition>,
    /// Strategy whose first closed order this may be.
    pub strategy_id: Option<String>,
}

/// Settles a pending order as failed.
#[derive(Debug, Clone)]
pub struct OrderRejection {
    pub order_id: u64,
    pub reason: String,
    pub grid: Option<GridTransition>,
}
