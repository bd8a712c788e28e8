//! Test Utilities Module
//!
//! In-memory stand-ins for the coin API and the RPC node so the trade
//! engine and the HTTP surface can be exercised without network access.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use async_trait::async_trait;
use serde_json::Value;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::VersionedTransaction,
};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::coin_api::{parse_reserves, ReserveSource};
use crate::rpc::ChainClient;
use crate::tx_builder::{SimulationReport, TradeError};

/// Coin document with the reserve figures used across the tests
///
/// 1_000_000_000_000 virtual tokens against 10 SOL of virtual reserves.
pub fn sample_coin(bonding_curve: &Pubkey, associated_bonding_curve: &Pubkey) -> Value {
    serde_json::json!({
        "mint": "FakeMint",
        "name": "Fake Coin",
        "symbol": "FAKE",
        "virtual_token_reserves": 1_000_000_000_000u64,
        "virtual_sol_reserves": 10_000_000_000u64,
        "bonding_curve": bonding_curve.to_string(),
        "associated_bonding_curve": associated_bonding_curve.to_string(),
        "total_supply": 1_000_000_000_000_000u64,
        "market_cap": 30.5,
        "volume_24h": 12.0,
        "price_change_24h": 6.2,
    })
}

/// Base-58 secret for a fresh keypair, as a caller would send it
pub fn encoded_keypair() -> (Keypair, String) {
    let keypair = Keypair::new();
    let encoded = bs58::encode(keypair.to_bytes()).into_string();
    (keypair, encoded)
}

/// `ReserveSource` serving a fixed coin document, or a fixed error
#[derive(Clone)]
pub struct MockReserveSource {
    /// Document served for every mint
    pub coin: Arc<Mutex<Result<Value, TradeError>>>,

    /// Number of fetches served
    pub fetch_count: Arc<Mutex<usize>>,
}

impl MockReserveSource {
    pub fn new(coin: Value) -> Self {
        Self {
            coin: Arc::new(Mutex::new(Ok(coin))),
            fetch_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn failing(error: TradeError) -> Self {
        Self {
            coin: Arc::new(Mutex::new(Err(error))),
            fetch_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Fresh curve accounts with the sample reserves
    pub fn with_sample_coin() -> Self {
        Self::new(sample_coin(&Pubkey::new_unique(), &Pubkey::new_unique()))
    }

    async fn serve(&self) -> Result<Value, TradeError> {
        *self.fetch_count.lock().await += 1;
        self.coin.lock().await.clone()
    }
}

#[async_trait]
impl ReserveSource for MockReserveSource {
    async fn fetch_reserves(&self, mint: &str) -> Result<crate::types::ReserveState, TradeError> {
        let coin = self.serve().await?;
        parse_reserves(mint, &coin)
    }

    async fn fetch_coin(&self, _mint: &str) -> Result<Value, TradeError> {
        self.serve().await
    }
}

/// `ChainClient` with scripted responses that records what it was sent
#[derive(Clone)]
pub struct MockChainClient {
    pub balance: Arc<Mutex<u64>>,
    pub token_account_exists: Arc<Mutex<bool>>,
    pub blockhash: Hash,

    /// Error returned by `send_and_confirm`, if set
    pub send_error: Arc<Mutex<Option<TradeError>>>,

    /// Report returned by `simulate`
    pub simulation: Arc<Mutex<SimulationReport>>,

    /// Transactions passed to `send_and_confirm`
    pub sent: Arc<Mutex<Vec<VersionedTransaction>>>,

    /// Transactions passed to `simulate`
    pub simulated: Arc<Mutex<Vec<VersionedTransaction>>>,
}

impl MockChainClient {
    /// Funded wallet (10 SOL), token account already present
    pub fn new() -> Self {
        Self {
            balance: Arc::new(Mutex::new(10_000_000_000)),
            token_account_exists: Arc::new(Mutex::new(true)),
            blockhash: Hash::new_unique(),
            send_error: Arc::new(Mutex::new(None)),
            simulation: Arc::new(Mutex::new(SimulationReport {
                err: None,
                logs: vec!["Program log: Instruction: Buy".to_string()],
                units_consumed: Some(42_000),
            })),
            sent: Arc::new(Mutex::new(Vec::new())),
            simulated: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn set_balance(&self, lamports: u64) {
        *self.balance.lock().await = lamports;
    }

    pub async fn set_token_account_exists(&self, exists: bool) {
        *self.token_account_exists.lock().await = exists;
    }

    pub async fn fail_sends_with(&self, error: TradeError) {
        *self.send_error.lock().await = Some(error);
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn last_sent(&self) -> Option<VersionedTransaction> {
        self.sent.lock().await.last().cloned()
    }

    pub async fn last_simulated(&self) -> Option<VersionedTransaction> {
        self.simulated.lock().await.last().cloned()
    }
}

impl Default for MockChainClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn get_balance(&self, _owner: &Pubkey) -> Result<u64, TradeError> {
        Ok(*self.balance.lock().await)
    }

    async fn account_exists(&self, _account: &Pubkey) -> Result<bool, TradeError> {
        Ok(*self.token_account_exists.lock().await)
    }

    async fn latest_blockhash(&self) -> Result<Hash, TradeError> {
        Ok(self.blockhash)
    }

    async fn send_and_confirm(&self, tx: &VersionedTransaction) -> Result<Signature, TradeError> {
        if let Some(err) = self.send_error.lock().await.clone() {
            return Err(err);
        }
        self.sent.lock().await.push(tx.clone());
        Ok(tx.signatures.first().copied().unwrap_or_default())
    }

    async fn simulate(&self, tx: &VersionedTransaction) -> Result<SimulationReport, TradeError> {
        self.simulated.lock().await.push(tx.clone());
        Ok(self.simulation.lock().await.clone())
    }
}
