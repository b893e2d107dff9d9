//! Per-user trade settings

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregatorKind {
    Relay,
}

impl fmt::Display for AggregatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregatorKind::Relay => write!(f, "relay"),
        }
    }
}

impl FromStr for AggregatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relay" => Ok(AggregatorKind::Relay),
            other => Err(format!("unknown aggregator: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub user_id: i64,
    pub slippage_bps: u32,
    pub sell_slippage_bps: Option<u32>,
    pub exit_slippage_bps: Option<u32>,
    pub dex_aggregator: AggregatorKind,
    pub enable_infinite_approval: Option<bool>,
}

impl Settings {
    /// Chain-level defaults for a user with no stored record.
    pub fn chain_default(user_id: i64, slippage_bps: u32, dex_aggregator: AggregatorKind) -> Self {
        Self {
            user_id,
            slippage_bps,
            sell_slippage_bps: None,
            exit_slippage_bps: None,
            dex_aggregator,
            enable_infinite_approval: None,
        }
    }

    pub fn infinite_approval(&self) -> bool {
        self.enable_infinite_approval.unwrap_or(false)
    }
}

/// Single-field updates applied to a stored [`Settings`] record.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsUpdate {
    SlippageBps(u32),
    SellSlippageBps(Option<u32>),
    ExitSlippageBps(Option<u32>),
    DexAggregator(AggregatorKind),
    EnableInfiniteApproval(bool),
}

impl SettingsUpdate {
    pub fn apply(&self, settings: &mut Settings) {
        match self {
            SettingsUpdate::SlippageBps(v) => settings.slippage_bps = *v,
            SettingsUpdate::SellSlippageBps(v) => settings.sell_slippage_bps = *v,
            SettingsUpdate::ExitSlippageBps(v) => settings.exit_slippage_bps = *v,
            SettingsUpdate::DexAggregator(v) => settings.dex_aggregator = *v,
            SettingsUpdate::EnableInfiniteApproval(v) => {
                settings.enable_infinite_approval = Some(*v)
            }
        }
    }
}
