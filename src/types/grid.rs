//! Grid position slots

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridStatus {
    PendingBuy,
    Bought,
    PendingSell,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    pub guid: String,
    pub strategy_id: String,
    pub grid_number: u32,
    /// Stablecoin spent opening the slot; the cost basis for its sell.
    pub amount: Decimal,
    /// Realized fill price of the buy.
    pub price: Decimal,
    /// Tokens held by the slot after the buy filled.
    pub quantity: Decimal,
    pub status: GridStatus,
    pub updated_at: DateTime<Utc>,
}

impl Grid {
    pub fn new(strategy_id: impl Into<String>, grid_number: u32, amount: Decimal) -> Self {
        Self {
            guid: uuid::Uuid::new_v4().to_string(),
            strategy_id: strategy_id.into(),
            grid_number,
            amount,
            price: Decimal::ZERO,
            quantity: Decimal::ZERO,
            status: GridStatus::PendingBuy,
            updated_at: Utc::now(),
        }
    }
}

/// Grid side effect of settling an order, applied in the same unit of work.
#[derive(Debug, Clone, PartialEq)]
pub enum GridTransition {
    MarkBought {
        guid: String,
        price: Decimal,
        quantity: Decimal,
    },
    RevertToBought {
        guid: String,
    },
    Delete {
        guid: String,
    },
}

impl GridTransition {
    pub fn guid(&self) -> &str {
        match self {
            GridTransition::MarkBought { guid, .. }
            | GridTransition::RevertToBought { guid }
            | GridTransition::Delete { guid } => guid,
        }
    }
}
