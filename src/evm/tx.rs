//! EIP-1559 transaction signing

use alloy::{
    eips::eip2718::Encodable2718,
    network::{Ethereum, EthereumWallet, TransactionBuilder},
    primitives::{Address, Bytes, U256},
    rpc::types::eth::TransactionRequest,
    signers::local::PrivateKeySigner,
};

use crate::errors::{GridError, GridResult};

/// Fully specified dynamic-fee call; nothing is estimated or filled in.
#[derive(Debug, Clone)]
pub struct Eip1559Call {
    pub chain_id: u64,
    pub nonce: u64,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub gas_limit: u64,
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

/// Signs the call and returns its EIP-2718 envelope bytes, ready for `eth_sendRawTransaction`.
pub async fn sign_eip1559(signer: &PrivateKeySigner, call: &Eip1559Call) -> GridResult<Bytes> {
    let wallet = EthereumWallet::from(signer.clone());

    let request = TransactionRequest::default()
        .with_chain_id(call.chain_id)
        .with_nonce(call.nonce)
        .with_to(call.to)
        .with_value(call.value)
        .with_input(call.data.clone())
        .with_gas_limit(call.gas_limit)
        .with_max_fee_per_gas(call.max_fee_per_gas)
        .with_max_priority_fee_per_gas(call.max_priority_fee_per_gas);

    let envelope = <TransactionRequest as TransactionBuilder<Ethereum>>::build(request, &wallet)
        .await
        .map_err(|e| GridError::Signing {
            message: format!("failed to sign nonce {} for {}: {}", call.nonce, call.to, e),
        })?;

    Ok(envelope.encoded_2718().into())
}

/// Narrows an aggregator-supplied quantity into a transaction field.
pub fn narrow<T: TryFrom<U256>>(value: U256, field: &str) -> GridResult<T> {
    T::try_from(value).map_err(|_| GridError::malformed(format!("{field} out of range: {value}")))
}
