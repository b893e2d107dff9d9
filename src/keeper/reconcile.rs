//! Realized fill math and grid transitions for settled orders

use alloy::primitives::{Address, I256};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::{
    evm::signed_to_decimal,
    types::{Grid, GridTransition, Order, OrderSide},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub final_price: Decimal,
    pub out_amount: Decimal,
    /// Stablecoin moved by the transaction, signed from the owner's view.
    pub stable_delta: Decimal,
}

fn delta_of(deltas: &HashMap<Address, I256>, token: Address, decimals: u8) -> Option<Decimal> {
    deltas.get(&token).map(|d| signed_to_decimal(*d, decimals))
}

/// Buys are priced as stablecoin spent per token received, sells as stablecoin
/// received per token sold. A zero divisor leaves the price at zero.
pub fn settle_fill(
    order: &Order,
    deltas: &HashMap<Address, I256>,
    token_decimals: u8,
    stablecoin: Address,
    stable_decimals: u8,
) -> Fill {
    let stable_delta = delta_of(deltas, stablecoin, stable_decimals).unwrap_or(Decimal::ZERO);

    let (final_price, out_amount) = match order.side {
        OrderSide::Buy => {
            let received = delta_of(deltas, order.token, token_decimals).unwrap_or(Decimal::ZERO);
            let price = order.in_amount.checked_div(received).unwrap_or(Decimal::ZERO);
            (price, received)
        }
        OrderSide::Sell => {
            let price = stable_delta.checked_div(order.in_amount).unwrap_or(Decimal::ZERO);
            (price, stable_delta)
        }
    };

    Fill {
        final_price,
        out_amount,
        stable_delta,
    }
}

/// Cost basis of a sell: the order's own record first, then the grid's amount.
pub fn cost_basis(order: &Order, grid: Option<&Grid>) -> Option<Decimal> {
    if order.side != OrderSide::Sell {
        return None;
    }
    order
        .grid_buy_cost
        .or_else(|| grid.map(|g| g.amount))
        .filter(|cost| !cost.is_zero())
}

pub fn closing_transition(order: &Order, fill: &Fill) -> Option<GridTransition> {
    let guid = order.grid_id.clone()?;
    Some(match order.side {
        OrderSide::Buy => GridTransition::MarkBought {
            guid,
            price: fill.final_price,
            quantity: fill.out_amount,
        },
        OrderSide::Sell => GridTransition::Delete { guid },
    })
}

pub fn rejection_transition(order: &Order) -> Option<GridTransition> {
    let guid = order.grid_id.clone()?;
    Some(match order.side {
        OrderSide::Buy => GridTransition::Delete { guid },
        OrderSide::Sell => GridTransition::RevertToBought { guid },
    })
}
