//! Relay HTTP client: chain metadata, quotes and swap submission

use alloy::{
    hex,
    primitives::{Address, Bytes, TxHash, U256},
    signers::{Signer, local::PrivateKeySigner},
};
use chrono::Utc;
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    aggregator::QuoteRequest,
    aggregator::relay::{Chain, Chains, Credential, ErrorResponse, QuoteParams, QuoteResponse, TxData},
    config::Config,
    errors::{GridError, GridResult},
    evm::{self, Eip1559Call},
    network::ChainClient,
    nonce::NonceManager,
};

const HTTP_TIMEOUT_SECS: u64 = 15;
const APPROVE_STEP_ID: &str = "approve";

pub struct RelayClient {
    http: reqwest::Client,
    base_url: String,
    credential: Option<Credential>,
    chain_id: u64,
    chain: Arc<dyn ChainClient>,
    nonces: Arc<NonceManager>,
    chains_cache: Mutex<Option<HashMap<u64, Chain>>>,
}

impl RelayClient {
    pub fn new(
        base_url: impl Into<String>,
        credential: Option<Credential>,
        chain_id: u64,
        chain: Arc<dyn ChainClient>,
        nonces: Arc<NonceManager>,
    ) -> GridResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| GridError::Http {
                message: "Failed to build HTTP client".to_string(),
                source: Some(e.into()),
            })?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credential,
            chain_id,
            chain,
            nonces,
            chains_cache: Mutex::new(None),
        })
    }

    pub fn from_config(config: &Config, chain: Arc<dyn ChainClient>, nonces: Arc<NonceManager>) -> GridResult<Self> {
        let credential = Credential::from_config(config)?;
        if credential.is_none() {
            debug!("[Relay] No API credentials configured, requests are sent unsigned");
        }
        Self::new(config.relay_api_url.clone(), credential, config.chain_id, chain, nonces)
    }

    async fn send<T: DeserializeOwned>(&self, method: Method, path: &str, body: Option<String>) -> GridResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method.clone(), &url);

        if let Some(credential) = &self.credential {
            let headers = credential.headers(Utc::now(), method.as_str(), path, body.as_deref().unwrap_or(""));
            for (name, value) in headers {
                request = request.header(name, value);
            }
        }
        if let Some(body) = body {
            request = request.header(reqwest::header::CONTENT_TYPE, "application/json").body(body);
        }

        let response = request.send().await.map_err(|e| GridError::Http {
            message: format!("{method} {path} failed"),
            source: Some(e.into()),
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| GridError::Http {
            message: format!("failed to read {path} response"),
            source: Some(e.into()),
        })?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| match e.error_code {
                    Some(code) => format!("{} ({})", e.message, code),
                    None => e.message,
                })
                .unwrap_or(text);
            warn!("⚠️ Relay API returned error status {} for {}: {}", status, path, message);
            return Err(GridError::UpstreamApi {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| GridError::parsing(format!("relay {path} response"), e))
    }

    pub async fn get_chains(&self) -> GridResult<Vec<Chain>> {
        let chains: Chains = self.send(Method::GET, "/chains", None).await?;
        Ok(chains.chains)
    }

    /// Chain metadata, fetched once and kept for the process lifetime.
    pub async fn chain_by_id(&self, chain_id: u64) -> GridResult<Chain> {
        let mut cache = self.chains_cache.lock().await;

        if cache.is_none() {
            let chains = self.get_chains().await?;
            info!("[Relay] Cached {} supported chains", chains.len());
            *cache = Some(chains.into_iter().map(|c| (c.id, c)).collect());
        }

        cache
            .as_ref()
            .and_then(|chains| chains.get(&chain_id))
            .cloned()
            .ok_or(GridError::UnsupportedChain { chain_id })
    }

    pub async fn quote(&self, request: &QuoteRequest) -> GridResult<QuoteResponse> {
        let chain = self.chain_by_id(request.chain_id).await?;

        let params = QuoteParams {
            user: request.user.to_checksum(None),
            origin_chain_id: chain.id,
            destination_chain_id: chain.id,
            origin_currency: request.input_token.to_checksum(None),
            destination_currency: request.output_token.to_checksum(None),
            amount: request.amount.to_string(),
            trade_type: "EXACT_INPUT".to_string(),
            slippage_tolerance: request.slippage_bps,
        };
        let body = serde_json::to_string(&params)
            .map_err(|e| GridError::parsing("relay quote params", e))?;
        debug!("[Relay] Quote request: {}", body);

        let mut response: QuoteResponse = self.send(Method::POST, "/quote", Some(body)).await?;

        if request.infinite_approval {
            rewrite_approvals(&mut response)?;
        }

        Ok(response)
    }

    /// Checks balances, then submits every step item in order through the nonce manager.
    pub async fn send_swap_transaction(
        &self,
        signer: &PrivateKeySigner,
        quote: &QuoteResponse,
    ) -> GridResult<(TxHash, u64)> {
        let account = signer.address();

        let native = self.chain.balance(account).await?;
        let gas_cost = quote.fees.gas.amount;
        if native <= gas_cost {
            return Err(GridError::insufficient(Address::ZERO, native, gas_cost));
        }

        let input = &quote.details.currency_in;
        let input_balance = if input.currency.address == Address::ZERO {
            native
        } else {
            evm::token_balance(self.chain.as_ref(), input.currency.address, account).await?
        };
        if input_balance < input.amount {
            return Err(GridError::insufficient(input.currency.address, input_balance, input.amount));
        }

        debug!("[Relay] Submitting {} transactions for {}", quote.transaction_count(), account);
        let mut last = None;
        for step in &quote.steps {
            for item in &step.items {
                let call = self.prepare_call(&item.data)?;
                let chain = self.chain.clone();

                let (hash, nonce) = self
                    .nonces
                    .request(account, |nonce| async move {
                        let raw = evm::sign_eip1559(signer, &Eip1559Call { nonce, ..call }).await?;
                        chain.send_raw_transaction(raw).await
                    })
                    .await?;

                info!(
                    account = %account,
                    nonce,
                    hash = %hash,
                    step = %step.id,
                    "[Relay] Submitted transaction"
                );
                last = Some((hash, nonce));
            }
        }

        last.ok_or_else(|| GridError::malformed("quote contains no transactions"))
    }

    fn prepare_call(&self, data: &TxData) -> GridResult<Eip1559Call> {
        let input = hex::decode(&data.data)
            .map_err(|e| GridError::malformed(format!("invalid step call data: {e}")))?;

        Ok(Eip1559Call {
            chain_id: self.chain_id,
            nonce: 0,
            to: data.to,
            value: data.value,
            data: Bytes::from(input),
            gas_limit: evm::narrow(data.gas, "gas")?,
            max_fee_per_gas: evm::narrow(data.max_fee_per_gas, "maxFeePerGas")?,
            max_priority_fee_per_gas: evm::narrow(data.max_priority_fee_per_gas, "maxPriorityFeePerGas")?,
        })
    }
}

/// Replaces the allowance of every approve step with `2^256 - 1`.
///
/// Items whose call data is not an ERC-20 approve are left alone.
pub fn rewrite_approvals(response: &mut QuoteResponse) -> GridResult<()> {
    for step in response.steps.iter_mut().filter(|s| s.id == APPROVE_STEP_ID) {
        for item in step.items.iter_mut() {
            let input = hex::decode(&item.data.data)
                .map_err(|e| GridError::malformed(format!("invalid approve call data: {e}")))?;

            let Ok((spender, _)) = evm::decode_approve(&input) else {
                continue;
            };

            item.data.data = hex::encode_prefixed(evm::encode_approve(spender, U256::MAX));
        }
    }
    Ok(())
}
