//! Effective slippage for a trade

use alloy::primitives::Address;

use crate::types::Settings;

/// Base slippage, replaced by the sell override when the trade pays out in the
/// stablecoin. An exit override only refines a sell override that is set.
pub fn resolve_slippage_bps(settings: &Settings, output_token: Address, stablecoin: Address, exit: bool) -> u32 {
    let mut bps = settings.slippage_bps;

    if output_token == stablecoin {
        if let Some(sell) = settings.sell_slippage_bps {
            bps = sell;
            if exit {
                if let Some(exit_bps) = settings.exit_slippage_bps {
                    bps = exit_bps;
                }
            }
        }
    }

    bps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AggregatorKind;
    use alloy::primitives::address;

    const USDC: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
    const TOKEN: Address = address!("4200000000000000000000000000000000000006");

    fn settings(sell: Option<u32>, exit: Option<u32>) -> Settings {
        Settings {
            sell_slippage_bps: sell,
            exit_slippage_bps: exit,
            ..Settings::chain_default(1, 50, AggregatorKind::Relay)
        }
    }

    #[test]
    fn buys_use_base_slippage() {
        let s = settings(Some(100), Some(300));
        assert_eq!(resolve_slippage_bps(&s, TOKEN, USDC, false), 50);
        assert_eq!(resolve_slippage_bps(&s, TOKEN, USDC, true), 50);
    }

    #[test]
    fn sells_use_sell_override() {
        assert_eq!(resolve_slippage_bps(&settings(Some(100), None), USDC, USDC, false), 100);
        assert_eq!(resolve_slippage_bps(&settings(None, None), USDC, USDC, false), 50);
    }

    #[test]
    fn exits_use_exit_override() {
        assert_eq!(resolve_slippage_bps(&settings(Some(100), Some(300)), USDC, USDC, true), 300);
        assert_eq!(resolve_slippage_bps(&settings(Some(100), None), USDC, USDC, true), 100);
    }

    #[test]
    fn exit_override_needs_sell_override() {
        assert_eq!(resolve_slippage_bps(&settings(None, Some(300)), USDC, USDC, true), 50);
        assert_eq!(resolve_slippage_bps(&settings(None, Some(300)), USDC, USDC, false), 50);
    }
}
