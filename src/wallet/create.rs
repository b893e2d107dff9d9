//! Wallet creation

use alloy::{
    hex,
    signers::{Signer, local::PrivateKeySigner},
};
use std::sync::Arc;
use tracing::info;

use crate::{
    errors::GridResult,
    storage::Store,
    types::Wallet,
    wallet::KeyVault,
};

/// Generates a key for `user_id`, seals it and stores the wallet.
pub async fn create_wallet(store: &Store, vault: &Arc<KeyVault>, user_id: i64) -> GridResult<Wallet> {
    let signer = PrivateKeySigner::random();
    let wallet = Wallet {
        user_id,
        account: signer.address(),
        private_key: vault.clone().seal_async(hex::encode(signer.to_bytes())).await?,
    };

    store.insert_wallet(wallet.clone()).await?;
    info!(user_id, account = %wallet.account, "[Wallet] Created wallet");
    Ok(wallet)
}
