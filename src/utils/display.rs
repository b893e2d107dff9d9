//! Notification texts (Telegram Markdown)

use rust_decimal::Decimal;

use crate::{
    types::{Order, OrderSide},
    utils::links::{explorer_tx_link, gmgn_token_link},
};

/// Markdown link, or the bare text when no URL exists for the chain.
fn link(text: &str, url: Option<String>) -> String {
    match url {
        Some(url) => format!("[{text}]({url})"),
        None => text.to_string(),
    }
}

fn tx_suffix(chain_id: u64, order: &Order) -> String {
    link(">>", explorer_tx_link(chain_id, order.tx_hash))
}

fn usd(value: Decimal) -> String {
    format!("{}U", value.trunc_with_scale(2).normalize())
}

fn balance(value: Option<Decimal>) -> String {
    value.map(usd).unwrap_or_else(|| "n/a".to_string())
}

fn grid_label(order: &Order) -> String {
    match order.grid_number {
        Some(n) => format!("`#{n}`"),
        None => "`#?`".to_string(),
    }
}

/// Price with five significant digits.
pub fn format_price(price: Decimal) -> String {
    price.round_sf(5).unwrap_or(price).normalize().to_string()
}

/// Filled order. `stable_delta` is the stablecoin moved by the transaction.
pub fn fill_message(
    chain_id: u64,
    order: &Order,
    stable_delta: Decimal,
    stable_balance: Option<Decimal>,
) -> String {
    let token = link(&order.symbol, gmgn_token_link(chain_id, order.token));

    match order.side {
        OrderSide::Buy => format!(
            "🟢 Grid {} bought {} {} 💰 Balance: {} {}",
            grid_label(order),
            usd(stable_delta.abs()),
            token,
            balance(stable_balance),
            tx_suffix(chain_id, order)
        ),
        OrderSide::Sell if order.is_grid_order() => format!(
            "🔴 Grid {} sold {} {} 💰 Balance: {} {}",
            grid_label(order),
            usd(stable_delta.abs()),
            token,
            balance(stable_balance),
            tx_suffix(chain_id, order)
        ),
        OrderSide::Sell => format!(
            "✅ Liquidated *{}*, price: {}, 💰 amount: {}, 💰 balance: {} {}",
            order.symbol,
            format_price(order.final_price),
            usd(order.out_amount),
            balance(stable_balance),
            tx_suffix(chain_id, order)
        ),
    }
}

pub fn reject_message(chain_id: u64, order: &Order) -> String {
    let token = link(&order.symbol, gmgn_token_link(chain_id, order.token));

    match order.side {
        OrderSide::Buy => format!(
            "❌ Grid {} buy of {} {} failed, reason: insufficient liquidity or slippage {}",
            grid_label(order),
            usd(order.in_amount),
            token,
            tx_suffix(chain_id, order)
        ),
        OrderSide::Sell if order.is_grid_order() => format!(
            "❌ Grid {} sell of {} {} failed, reason: insufficient liquidity or slippage {}",
            grid_label(order),
            order.in_amount.normalize(),
            token,
            tx_suffix(chain_id, order)
        ),
        OrderSide::Sell => format!(
            "❌ Liquidation of *{}* failed, reason: insufficient liquidity or slippage {}",
            order.symbol,
            tx_suffix(chain_id, order)
        ),
    }
}

pub fn retry_message(symbol: &str) -> String {
    format!("♻️ Retrying liquidation of *{symbol}*")
}

pub fn retry_failed_message(symbol: &str) -> String {
    format!("❌ Retrying liquidation of *{symbol}* failed, please sell manually")
}
