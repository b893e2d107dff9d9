//! ERC-20 balance movements recovered from transaction logs

use alloy::primitives::{Address, B256, I256, Log, U256, b256};
use std::collections::HashMap;

/// keccak256("Transfer(address,address,uint256)")
pub const TRANSFER_TOPIC: B256 =
    b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef");

/// Signed per-token balance change of `owner`, keyed by the emitting contract.
///
/// Transfers out of `owner` count negative, transfers in count positive,
/// and repeated transfers of one token are summed.
pub fn extract_balance_deltas(logs: &[Log], owner: Address) -> HashMap<Address, I256> {
    let mut changes: HashMap<Address, I256> = HashMap::new();

    for log in logs {
        let topics = log.topics();
        if topics.len() < 3 || topics[0] != TRANSFER_TOPIC {
            continue;
        }

        let from = Address::from_word(topics[1]);
        let to = Address::from_word(topics[2]);
        if from != owner && to != owner {
            continue;
        }

        let Some(amount) = U256::try_from_be_slice(&log.data.data) else {
            continue;
        };
        let amount = I256::from_raw(amount);

        let entry = changes.entry(log.address).or_insert(I256::ZERO);
        // A self-transfer nets to zero.
        if from == owner {
            *entry = entry.saturating_sub(amount);
        }
        if to == owner {
            *entry = entry.saturating_add(amount);
        }
    }

    changes
}
