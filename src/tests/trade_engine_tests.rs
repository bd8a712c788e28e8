//! Trade engine tests against in-memory coin API and RPC stand-ins

use rust_decimal::Decimal;
use solana_sdk::{pubkey::Pubkey, signature::Signer};
use std::sync::Arc;
use zeroize::Zeroizing;

use crate::config::ProtocolConfig;
use crate::test_utils::{encoded_keypair, MockChainClient, MockReserveSource};
use crate::trade_engine::{TradeEngine, TradeOrder};
use crate::tx_builder::{TradeError, BUY_DISCRIMINATOR, SELL_DISCRIMINATOR};
use crate::types::{TradeOutcome, TransactionMode};

fn engine(reserves: MockReserveSource, chain: MockChainClient) -> TradeEngine {
    TradeEngine::new(
        Arc::new(reserves),
        Arc::new(chain),
        Arc::new(ProtocolConfig::default()),
        Decimal::new(25, 2),
    )
}

fn order(private_key: &str, amount_in: u64) -> TradeOrder {
    TradeOrder {
        private_key: Zeroizing::new(private_key.to_string()),
        mint: Pubkey::new_unique().to_string(),
        amount_in,
        priority_fee_lamports: 0,
        slippage: None,
    }
}

/// Swap payload of the last transaction the chain client saw
fn swap_data(tx: &solana_sdk::transaction::VersionedTransaction, program: &Pubkey) -> Vec<u8> {
    let keys = tx.message.static_account_keys();
    tx.message
        .instructions()
        .iter()
        .find(|ix| keys[usize::from(ix.program_id_index)] == *program)
        .map(|ix| ix.data.clone())
        .expect("swap instruction present")
}

#[tokio::test]
async fn test_buy_execution_returns_signature_and_quote() {
    let chain = MockChainClient::new();
    let (keypair, key) = encoded_keypair();
    let engine = engine(MockReserveSource::with_sample_coin(), chain.clone());

    let outcome = engine
        .buy(TransactionMode::Execution, order(&key, 100_000_000))
        .await
        .expect("buy should succeed");

    let TradeOutcome::Executed { signature, quote } = outcome else {
        panic!("expected executed outcome");
    };
    assert_eq!(quote.fee_amount, 500_000);
    assert_eq!(quote.amount_out, 9_950_000_000);
    assert_eq!(quote.bound_amount, 125_000_000);

    let sent = chain.last_sent().await.expect("transaction sent");
    assert_eq!(sent.signatures[0].to_string(), signature);
    assert_eq!(sent.message.static_account_keys()[0], keypair.pubkey());

    let data = swap_data(&sent, &engine.protocol().program);
    assert_eq!(&data[0..8], &BUY_DISCRIMINATOR.to_le_bytes());
    assert_eq!(&data[8..16], &9_950_000_000u64.to_le_bytes());
    assert_eq!(&data[16..24], &125_000_000u64.to_le_bytes());
}

#[tokio::test]
async fn test_sell_simulation_does_not_broadcast() {
    let chain = MockChainClient::new();
    let (_, key) = encoded_keypair();
    let engine = engine(MockReserveSource::with_sample_coin(), chain.clone());

    let mut sell = order(&key, 10_000_000_000);
    sell.slippage = Some(Decimal::new(1, 1));
    let outcome = engine
        .sell(TransactionMode::Simulation, sell)
        .await
        .expect("simulation should succeed");

    let TradeOutcome::Simulated { report, quote } = outcome else {
        panic!("expected simulated outcome");
    };
    assert!(report.succeeded());
    // 10_000_000_000 tokens * 10 SOL / 1e12 tokens = 100_000_000 lamports gross
    assert_eq!(quote.fee_amount, 500_000);
    assert_eq!(quote.amount_out, 99_500_000);
    assert_eq!(quote.bound_amount, 89_550_000);

    assert_eq!(chain.sent_count().await, 0);
    let simulated = chain.last_simulated().await.expect("transaction simulated");
    let data = swap_data(&simulated, &engine.protocol().program);
    assert_eq!(&data[0..8], &SELL_DISCRIMINATOR.to_le_bytes());
    assert_eq!(&data[16..24], &89_550_000u64.to_le_bytes());
}

#[tokio::test]
async fn test_new_token_account_is_created_first() {
    let chain = MockChainClient::new();
    chain.set_token_account_exists(false).await;
    let (_, key) = encoded_keypair();
    let engine = engine(MockReserveSource::with_sample_coin(), chain.clone());

    let mut buy = order(&key, 100_000_000);
    buy.priority_fee_lamports = 5_000;
    engine
        .buy(TransactionMode::Execution, buy)
        .await
        .expect("buy should succeed");

    let sent = chain.last_sent().await.unwrap();
    let keys = sent.message.static_account_keys();
    let programs: Vec<Pubkey> = sent
        .message
        .instructions()
        .iter()
        .map(|ix| keys[usize::from(ix.program_id_index)])
        .collect();
    assert_eq!(
        programs,
        vec![
            solana_sdk::compute_budget::id(),
            solana_sdk::compute_budget::id(),
            spl_associated_token_account::id(),
            solana_sdk::system_program::id(),
            engine.protocol().program,
        ]
    );
}

#[tokio::test]
async fn test_domain_failures() {
    let (_, key) = encoded_keypair();

    // reserves missing from the coin document
    let reserves = MockReserveSource::new(serde_json::json!({ "mint": "x" }));
    let err = engine(reserves, MockChainClient::new())
        .buy(TransactionMode::Execution, order(&key, 1_000))
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::NotFound(_)));

    // zero reserves
    let mut coin = crate::test_utils::sample_coin(&Pubkey::new_unique(), &Pubkey::new_unique());
    coin["virtual_sol_reserves"] = serde_json::json!(0);
    let err = engine(MockReserveSource::new(coin), MockChainClient::new())
        .buy(TransactionMode::Execution, order(&key, 1_000))
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::InvalidReserves { sol: 0, .. }));

    // malformed key
    let err = engine(MockReserveSource::with_sample_coin(), MockChainClient::new())
        .buy(TransactionMode::Execution, order("not-a-key", 1_000))
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::InvalidKey(_)));

    // unfunded wallet
    let chain = MockChainClient::new();
    chain.set_balance(0).await;
    let err = engine(MockReserveSource::with_sample_coin(), chain.clone())
        .sell(TransactionMode::Execution, order(&key, 1_000))
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::InsufficientBalance(_)));
    assert_eq!(chain.sent_count().await, 0);

    // zero amount
    let err = engine(MockReserveSource::with_sample_coin(), MockChainClient::new())
        .buy(TransactionMode::Execution, order(&key, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::InvalidParameter { .. }));
}

#[tokio::test]
async fn test_buy_larger_than_balance_is_rejected() {
    let chain = MockChainClient::new();
    chain.set_balance(50_000_000).await;
    let (_, key) = encoded_keypair();

    let err = engine(MockReserveSource::with_sample_coin(), chain)
        .buy(TransactionMode::Execution, order(&key, 100_000_000))
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::InsufficientBalance(_)));
}

#[tokio::test]
async fn test_upstream_failures_propagate() {
    let (_, key) = encoded_keypair();

    let reserves = MockReserveSource::failing(TradeError::network("coin API returned HTTP 503"));
    let err = engine(reserves.clone(), MockChainClient::new())
        .buy(TransactionMode::Execution, order(&key, 1_000))
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::Network(_)));
    assert!(!err.is_domain());
    assert_eq!(*reserves.fetch_count.lock().await, 1, "no retry");

    let chain = MockChainClient::new();
    chain
        .fail_sends_with(TradeError::UnconfirmedTransaction {
            signature: "sig".to_string(),
            reason: "not confirmed within 60s".to_string(),
        })
        .await;
    let err = engine(MockReserveSource::with_sample_coin(), chain)
        .buy(TransactionMode::Execution, order(&key, 1_000))
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::UnconfirmedTransaction { .. }));
}

#[tokio::test]
async fn test_order_debug_hides_private_key() {
    let (_, key) = encoded_keypair();
    let rendered = format!("{:?}", order(&key, 1));
    assert!(!rendered.contains(&key));
}
