//! Relay API wire types

use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// Amounts arrive as decimal strings; absent or empty means zero.
fn u256_from_str<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(U256::ZERO),
        Some(s) => U256::from_str(s).map_err(serde::de::Error::custom),
    }
}

fn decimal_from_str<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => Decimal::from_str(s).map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chain {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chains {
    pub chains: Vec<Chain>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteParams {
    pub user: String,
    pub origin_chain_id: u64,
    pub destination_chain_id: u64,
    pub origin_currency: String,
    pub destination_currency: String,
    pub amount: String,
    pub trade_type: String,
    pub slippage_tolerance: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub error_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteResponse {
    pub steps: Vec<Step>,
    pub fees: Fees,
    pub details: Details,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub id: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub kind: String,
    pub items: Vec<StepItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StepItem {
    #[serde(default)]
    pub status: String,
    pub data: TxData,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxData {
    #[serde(default)]
    pub from: Option<Address>,
    pub to: Address,
    pub data: String,
    #[serde(default, deserialize_with = "u256_from_str")]
    pub value: U256,
    #[serde(default)]
    pub chain_id: u64,
    #[serde(default, deserialize_with = "u256_from_str")]
    pub gas: U256,
    #[serde(default, deserialize_with = "u256_from_str")]
    pub max_fee_per_gas: U256,
    #[serde(default, deserialize_with = "u256_from_str")]
    pub max_priority_fee_per_gas: U256,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Fees {
    pub gas: Fee,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Fee {
    #[serde(default, deserialize_with = "u256_from_str")]
    pub amount: U256,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Details {
    pub currency_in: CurrencyAmount,
    pub currency_out: CurrencyAmount,
    #[serde(default)]
    pub slippage_tolerance: Option<SlippageTolerance>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrencyAmount {
    pub currency: Currency,
    #[serde(default, deserialize_with = "u256_from_str")]
    pub amount: U256,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Currency {
    pub chain_id: u64,
    pub address: Address,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub decimals: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlippageTolerance {
    pub origin: SlippageValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlippageValue {
    #[serde(default, deserialize_with = "decimal_from_str")]
    pub percent: Option<Decimal>,
}

impl QuoteResponse {
    /// Declared origin slippage, rounded up to whole basis points.
    pub fn slippage_bps(&self) -> u32 {
        use rust_decimal::prelude::ToPrimitive;

        self.details
            .slippage_tolerance
            .as_ref()
            .and_then(|s| s.origin.percent)
            .map(|percent| (percent * Decimal::ONE_HUNDRED).ceil())
            .and_then(|bps| bps.to_u32())
            .unwrap_or(0)
    }

    pub fn transaction_count(&self) -> usize {
        self.steps.iter().map(|s| s.items.len()).sum()
    }
}
