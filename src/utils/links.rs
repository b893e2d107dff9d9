//! Block explorer and token page links

use alloy::primitives::{Address, TxHash};

pub fn network_name(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        56 => Some("BSC"),
        8453 => Some("Base"),
        _ => None,
    }
}

fn explorer(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        56 => Some("https://bscscan.com"),
        8453 => Some("https://basescan.org"),
        _ => None,
    }
}

fn gmgn_network(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        56 => Some("bsc"),
        8453 => Some("base"),
        _ => None,
    }
}

pub fn explorer_tx_link(chain_id: u64, hash: TxHash) -> Option<String> {
    explorer(chain_id).map(|base| format!("{base}/tx/{hash}"))
}

pub fn gmgn_token_link(chain_id: u64, token: Address) -> Option<String> {
    gmgn_network(chain_id).map(|net| format!("https://gmgn.ai/{net}/token/{token}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_per_chain() {
        let hash = TxHash::repeat_byte(0x11);
        assert_eq!(
            explorer_tx_link(8453, hash).unwrap(),
            format!("https://basescan.org/tx/{hash}")
        );
        assert!(explorer_tx_link(56, hash).unwrap().starts_with("https://bscscan.com/tx/0x"));
        assert!(explorer_tx_link(1, hash).is_none());
        assert_eq!(network_name(56), Some("BSC"));
        assert!(gmgn_token_link(8453, Address::ZERO).unwrap().starts_with("https://gmgn.ai/base/token/"));
    }
}
