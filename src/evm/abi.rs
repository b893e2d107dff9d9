//! ERC-20 call data encoding and read-only contract calls

use alloy::{
    primitives::{Address, Bytes, U256, keccak256},
    sol_types::SolValue,
};

use crate::{
    errors::{GridError, GridResult},
    network::ChainClient,
    types::TokenMeta,
};

pub const APPROVE_SIGNATURE: &str = "approve(address,uint256)";

pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature);
    [hash[0], hash[1], hash[2], hash[3]]
}

pub fn encode_approve(spender: Address, amount: U256) -> Bytes {
    let mut encoded = selector(APPROVE_SIGNATURE).to_vec();
    encoded.extend_from_slice(&(spender, amount).abi_encode_params());
    encoded.into()
}

pub fn decode_approve(input: &[u8]) -> GridResult<(Address, U256)> {
    if input.len() < 4 {
        return Err(GridError::malformed("input data too short"));
    }
    if input[..4] != selector(APPROVE_SIGNATURE) {
        return Err(GridError::malformed("input data is not for approve function"));
    }

    <(Address, U256)>::abi_decode_params(&input[4..], true)
        .map_err(|e| GridError::malformed(format!("failed to unpack approve input: {e}")))
}

async fn call_token(chain: &dyn ChainClient, token: Address, data: Vec<u8>) -> GridResult<Bytes> {
    chain.call(token, data.into()).await
}

fn unpack_err(method: &str, token: Address) -> impl FnOnce(alloy::sol_types::Error) -> GridError {
    let context = format!("failed to unpack {method} of {token}");
    move |e| GridError::parsing(context, e)
}

pub async fn token_balance(chain: &dyn ChainClient, token: Address, owner: Address) -> GridResult<U256> {
    let mut data = selector("balanceOf(address)").to_vec();
    data.extend_from_slice(&owner.abi_encode());
    let raw = call_token(chain, token, data).await?;
    U256::abi_decode(&raw, true).map_err(unpack_err("balanceOf", token))
}

pub async fn token_meta(chain: &dyn ChainClient, token: Address) -> GridResult<TokenMeta> {
    let raw = call_token(chain, token, selector("name()").to_vec()).await?;
    let name = String::abi_decode(&raw, true).map_err(unpack_err("name", token))?;

    let raw = call_token(chain, token, selector("symbol()").to_vec()).await?;
    let symbol = String::abi_decode(&raw, true).map_err(unpack_err("symbol", token))?;

    let raw = call_token(chain, token, selector("decimals()").to_vec()).await?;
    let decimals = U256::abi_decode(&raw, true).map_err(unpack_err("decimals", token))?;

    Ok(TokenMeta {
        name,
        symbol,
        decimals: decimals.saturating_to::<u8>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;
    use proptest::prelude::*;

    const ROUTER: Address = address!("a5F565650890fBA1824Ee0F21EbBbF660a179934");

    #[test]
    fn approve_selector_matches_erc20() {
        assert_eq!(selector(APPROVE_SIGNATURE), [0x09, 0x5e, 0xa7, 0xb3]);
    }

    #[test]
    fn approve_call_data_layout() {
        let data = encode_approve(ROUTER, U256::from(1_000u64));
        assert_eq!(data.len(), 4 + 32 + 32);
        assert_eq!(&data[16..36], ROUTER.as_slice());
        assert_eq!(decode_approve(&data).unwrap(), (ROUTER, U256::from(1_000u64)));
    }

    #[test]
    fn rejects_short_input() {
        let err = decode_approve(&[0x09, 0x5e]).unwrap_err();
        assert!(matches!(err, GridError::MalformedCallData { .. }));
    }

    #[test]
    fn rejects_foreign_selector() {
        let mut data = encode_approve(ROUTER, U256::MAX).to_vec();
        data[0] = 0xa9; // transfer(address,uint256) starts 0xa9059cbb
        let err = decode_approve(&data).unwrap_err();
        assert!(matches!(err, GridError::MalformedCallData { .. }));
    }

    proptest! {
        #[test]
        fn approve_round_trip(spender in any::<[u8; 20]>(), limbs in any::<[u64; 4]>()) {
            let spender = Address::from(spender);
            let amount = U256::from_limbs(limbs);
            prop_assert_eq!(decode_approve(&encode_approve(spender, amount)).unwrap(), (spender, amount));
        }
    }
}
