mod common;

use alloy::{
    consensus::{Transaction, TxEnvelope},
    eips::eip2718::Decodable2718,
    hex,
    primitives::{Address, U256, address, keccak256},
    signers::{Signer, local::PrivateKeySigner},
};
use mockito::Matcher;
use serde_json::{Value, json};
use std::sync::Arc;

use common::*;
use evm_grid_executor::{
    GridError,
    aggregator::{
        AggregatorQuote, DexAggregator, QuoteRequest, RelayAggregator,
        relay::{Credential, HEADER_KEY, HEADER_PASSPHRASE, HEADER_SIGN, HEADER_TIMESTAMP, QuoteResponse, RelayClient},
    },
    evm::{decode_approve, encode_approve},
    network::ChainClient,
    nonce::NonceManager,
    storage::Store,
};

const ROUTER: Address = address!("a5F565650890fBA1824Ee0F21EbBbF660a179934");

fn chains_body() -> String {
    json!({
        "chains": [
            { "id": 8453, "name": "base", "displayName": "Base", "disabled": false },
            { "id": 56, "name": "bsc", "displayName": "BNB Chain" }
        ]
    })
    .to_string()
}

fn credential() -> Credential {
    Credential::new("relay-key".to_string(), "relay-secret", "relay-pass".to_string()).unwrap()
}

fn client(url: String, chain: Arc<MockChain>) -> RelayClient {
    let chain: Arc<dyn ChainClient> = chain;
    let nonces = Arc::new(NonceManager::new(chain.clone(), Arc::new(Store::in_memory())));
    RelayClient::new(url, Some(credential()), 8453, chain, nonces).unwrap()
}

fn item(to: Address, data: String, gas: &str) -> Value {
    json!({
        "status": "incomplete",
        "data": {
            "to": to,
            "data": data,
            "value": "0",
            "chainId": 8453,
            "gas": gas,
            "maxFeePerGas": "12000000",
            "maxPriorityFeePerGas": "1000000"
        }
    })
}

fn quote_body(input_amount: &str) -> Value {
    json!({
        "steps": [
            {
                "id": "approve",
                "action": "Approve",
                "kind": "transaction",
                "items": [item(USDC, hex::encode_prefixed(encode_approve(ROUTER, U256::from(10_000_000u64))), "60000")]
            },
            {
                "id": "swap",
                "action": "Confirm transaction",
                "kind": "transaction",
                "items": [item(ROUTER, "0xdeadbeef".to_string(), "350000")]
            }
        ],
        "fees": { "gas": { "amount": "4200000000000" } },
        "details": {
            "currencyIn": {
                "currency": { "chainId": 8453, "address": USDC, "symbol": "USDC", "decimals": 6 },
                "amount": input_amount
            },
            "currencyOut": {
                "currency": { "chainId": 8453, "address": TOKEN, "symbol": "DEGEN", "decimals": 18 },
                "amount": "4000000000000000000"
            },
            "slippageTolerance": { "origin": { "percent": "0.5" } }
        }
    })
}

fn quote_request(user: Address, infinite_approval: bool) -> QuoteRequest {
    QuoteRequest {
        chain_id: 8453,
        user,
        input_token: USDC,
        output_token: TOKEN,
        amount: U256::from(10_000_000u64),
        slippage_bps: 50,
        infinite_approval,
    }
}

#[tokio::test]
async fn caches_chain_list() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/chains")
        .match_header(HEADER_KEY, "relay-key")
        .match_header(HEADER_SIGN, Matcher::Any)
        .match_header(HEADER_TIMESTAMP, Matcher::Any)
        .match_header(HEADER_PASSPHRASE, "relay-pass")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(chains_body())
        .expect(1)
        .create_async()
        .await;

    let relay = client(server.url(), Arc::new(MockChain::new(8453)));
    assert_eq!(relay.chain_by_id(8453).await.unwrap().display_name, "Base");
    assert_eq!(relay.chain_by_id(56).await.unwrap().name, "bsc");

    let err = relay.chain_by_id(1).await.unwrap_err();
    assert!(matches!(err, GridError::UnsupportedChain { chain_id: 1 }));

    mock.assert_async().await;
}

#[tokio::test]
async fn quote_rewrites_approvals_when_infinite() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/chains")
        .with_status(200)
        .with_body(chains_body())
        .create_async()
        .await;
    let quote_mock = server
        .mock("POST", "/quote")
        .match_header(HEADER_KEY, "relay-key")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "originChainId": 8453,
            "destinationChainId": 8453,
            "originCurrency": USDC.to_checksum(None),
            "destinationCurrency": TOKEN.to_checksum(None),
            "amount": "10000000",
            "tradeType": "EXACT_INPUT",
            "slippageTolerance": 50
        })))
        .with_status(200)
        .with_body(quote_body("10000000").to_string())
        .expect(2)
        .create_async()
        .await;

    let relay = client(server.url(), Arc::new(MockChain::new(8453)));
    let user = Address::repeat_byte(0x42);

    let exact = relay.quote(&quote_request(user, false)).await.unwrap();
    let input = hex::decode(&exact.steps[0].items[0].data.data).unwrap();
    assert_eq!(decode_approve(&input).unwrap(), (ROUTER, U256::from(10_000_000u64)));

    let infinite = relay.quote(&quote_request(user, true)).await.unwrap();
    let input = hex::decode(&infinite.steps[0].items[0].data.data).unwrap();
    assert_eq!(decode_approve(&input).unwrap(), (ROUTER, U256::MAX));
    // Swap calls are untouched.
    assert_eq!(infinite.steps[1].items[0].data.data, "0xdeadbeef");
    assert_eq!(infinite.slippage_bps(), 50);
    assert_eq!(infinite.details.currency_out.amount, U256::from(4_000_000_000_000_000_000u64));

    quote_mock.assert_async().await;
}

#[tokio::test]
async fn api_errors_surface_as_upstream_errors() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/chains")
        .with_status(200)
        .with_body(chains_body())
        .create_async()
        .await;
    server
        .mock("POST", "/quote")
        .with_status(400)
        .with_body(json!({ "message": "Amount is too low", "errorCode": "AMOUNT_TOO_LOW" }).to_string())
        .create_async()
        .await;

    let relay = client(server.url(), Arc::new(MockChain::new(8453)));
    let err = relay.quote(&quote_request(Address::repeat_byte(0x42), false)).await.unwrap_err();

    match err {
        GridError::UpstreamApi { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("Amount is too low"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn swap_requires_gas_money() {
    let signer: PrivateKeySigner = ANVIL_KEY.parse().unwrap();
    let chain = Arc::new(MockChain::new(8453));
    chain.add_token(USDC, "USD Coin", "USDC", 6);
    chain.set_native(signer.address(), U256::from(4_200_000_000_000u64));
    chain.set_token_balance(USDC, signer.address(), U256::from(10_000_000u64));

    let relay = client("http://127.0.0.1:9".to_string(), chain.clone());
    let quote: QuoteResponse = serde_json::from_value(quote_body("10000000")).unwrap();

    let err = relay.send_swap_transaction(&signer, &quote).await.unwrap_err();
    assert!(matches!(err, GridError::InsufficientBalance { .. }), "{err}");
    assert!(chain.sent().is_empty());
}

#[tokio::test]
async fn swap_requires_input_balance() {
    let signer: PrivateKeySigner = ANVIL_KEY.parse().unwrap();
    let chain = Arc::new(MockChain::new(8453));
    chain.add_token(USDC, "USD Coin", "USDC", 6);
    chain.set_native(signer.address(), U256::from(10u64).pow(U256::from(18)));
    chain.set_token_balance(USDC, signer.address(), U256::from(9_999_999u64));

    let relay = client("http://127.0.0.1:9".to_string(), chain.clone());
    let quote: QuoteResponse = serde_json::from_value(quote_body("10000000")).unwrap();

    match relay.send_swap_transaction(&signer, &quote).await.unwrap_err() {
        GridError::InsufficientBalance { available, required, .. } => {
            assert_eq!(available, U256::from(9_999_999u64));
            assert_eq!(required, U256::from(10_000_000u64));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(chain.sent().is_empty());
}

#[tokio::test]
async fn swap_submits_every_step_in_nonce_order() {
    let signer: PrivateKeySigner = ANVIL_KEY.parse().unwrap();
    let chain = Arc::new(MockChain::new(8453));
    chain.add_token(USDC, "USD Coin", "USDC", 6);
    chain.set_pending_nonce(signer.address(), 7);
    chain.set_native(signer.address(), U256::from(10u64).pow(U256::from(18)));
    chain.set_token_balance(USDC, signer.address(), U256::from(10_000_000u64));

    let relay = client("http://127.0.0.1:9".to_string(), chain.clone());
    let quote: QuoteResponse = serde_json::from_value(quote_body("10000000")).unwrap();

    let (hash, nonce) = relay.send_swap_transaction(&signer, &quote).await.unwrap();

    let sent = chain.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(nonce, 8);
    assert_eq!(hash, keccak256(&sent[1]));

    let approve = TxEnvelope::decode_2718(&mut sent[0].as_ref()).unwrap();
    let swap = TxEnvelope::decode_2718(&mut sent[1].as_ref()).unwrap();
    assert_eq!(approve.nonce(), 7);
    assert_eq!(approve.to(), Some(USDC));
    assert_eq!(approve.gas_limit(), 60_000);
    assert_eq!(swap.nonce(), 8);
    assert_eq!(swap.to(), Some(ROUTER));
    assert_eq!(swap.input().as_ref(), &[0xde, 0xad, 0xbe, 0xef]);
}

#[tokio::test]
async fn relay_aggregator_exposes_quote_amounts() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/chains")
        .with_status(200)
        .with_body(chains_body())
        .create_async()
        .await;
    server
        .mock("POST", "/quote")
        .with_status(200)
        .with_body(quote_body("10000000").to_string())
        .create_async()
        .await;

    let aggregator = RelayAggregator::new(Arc::new(client(server.url(), Arc::new(MockChain::new(8453)))));
    let quote = aggregator.quote(&quote_request(Address::repeat_byte(0x42), false)).await.unwrap();

    assert_eq!(quote.out_amount(), U256::from(4_000_000_000_000_000_000u64));
    assert_eq!(quote.slippage_bps(), 50);
}
