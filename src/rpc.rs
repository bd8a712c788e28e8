//! Solana RPC access
//!
//! [`ChainClient`] is the narrow surface the trade engine needs from a node.
//! [`RpcChainClient`] implements it over the nonblocking `RpcClient` at
//! `confirmed` commitment. No call is retried; failures surface as
//! `TradeError::Network`, and a broadcast transaction that is not confirmed
//! by its deadline surfaces as `TradeError::UnconfirmedTransaction`.

use async_trait::async_trait;
use solana_client::{client_error::ClientError, nonblocking::rpc_client::RpcClient};
use solana_rpc_client_api::config::{RpcSendTransactionConfig, RpcSimulateTransactionConfig};
use solana_sdk::{
    commitment_config::{CommitmentConfig, CommitmentLevel},
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::RpcConfig;
use crate::metrics::{metrics, Timer};
use crate::tx_builder::{SimulationReport, TradeError};

/// Node operations used by the trade pipeline
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Lamport balance of `owner`
    async fn get_balance(&self, owner: &Pubkey) -> Result<u64, TradeError>;

    /// Whether `account` exists on chain
    async fn account_exists(&self, account: &Pubkey) -> Result<bool, TradeError>;

    /// Recent blockhash to compile against
    async fn latest_blockhash(&self) -> Result<Hash, TradeError>;

    /// Broadcast and wait for confirmation
    async fn send_and_confirm(&self, tx: &VersionedTransaction) -> Result<Signature, TradeError>;

    /// Simulate without broadcasting
    async fn simulate(&self, tx: &VersionedTransaction) -> Result<SimulationReport, TradeError>;
}

/// `ChainClient` backed by a single RPC endpoint
pub struct RpcChainClient {
    client: Arc<RpcClient>,
    commitment: CommitmentConfig,
    confirm_timeout: Duration,
}

impl RpcChainClient {
    pub fn new(config: &RpcConfig) -> Self {
        let commitment = CommitmentConfig::confirmed();
        let client = RpcClient::new_with_timeout_and_commitment(
            config.endpoint.clone(),
            Duration::from_secs(config.timeout_secs),
            commitment,
        );

        Self {
            client: Arc::new(client),
            commitment,
            confirm_timeout: Duration::from_secs(config.confirm_timeout_secs),
        }
    }

    /// Endpoint URL this client talks to
    pub fn url(&self) -> String {
        self.client.url()
    }
}

impl std::fmt::Debug for RpcChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcChainClient")
            .field("url", &self.client.url())
            .field("commitment", &self.commitment.commitment)
            .field("confirm_timeout", &self.confirm_timeout)
            .finish()
    }
}

/// Run an RPC call, recording its latency under `method`
async fn timed<T, F>(method: &str, call: F) -> Result<T, ClientError>
where
    F: Future<Output = Result<T, ClientError>>,
{
    let timer = Timer::new();
    let result = call.await;
    metrics()
        .rpc_latency
        .with_label_values(&[method])
        .observe(timer.elapsed_secs());
    if let Err(e) = &result {
        debug!(method = method, error = %e, "RPC call failed");
    }
    result
}

fn network_error(method: &str, err: ClientError) -> TradeError {
    TradeError::network(format!("{} failed: {}", method, err))
}

/// Interval between signature status polls while awaiting confirmation
const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(500);

impl RpcChainClient {
    /// Broadcast once, then poll the signature until it reaches the client
    /// commitment
    ///
    /// Once the transaction has left the node boundary, a failed status poll
    /// is not a definitive failure and keeps the signature.
    async fn submit_and_poll(
        &self,
        tx: &VersionedTransaction,
        config: RpcSendTransactionConfig,
    ) -> Result<Signature, TradeError> {
        let signature = timed(
            "sendTransaction",
            self.client.send_transaction_with_config(tx, config),
        )
        .await
        .map_err(|e| network_error("sendTransaction", e))?;
        debug!(signature = %signature, "Transaction broadcast, awaiting confirmation");

        loop {
            let status = timed(
                "getSignatureStatuses",
                self.client
                    .get_signature_status_with_commitment(&signature, self.commitment),
            )
            .await
            .map_err(|e| TradeError::UnconfirmedTransaction {
                signature: signature.to_string(),
                reason: format!(
                    "status lookup failed: {}; the transaction may still land",
                    e
                ),
            })?;

            match status {
                Some(Ok(())) => return Ok(signature),
                Some(Err(e)) => {
                    return Err(TradeError::network(format!(
                        "transaction {} failed on chain: {}",
                        signature, e
                    )))
                }
                None => tokio::time::sleep(STATUS_POLL_INTERVAL).await,
            }
        }
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn get_balance(&self, owner: &Pubkey) -> Result<u64, TradeError> {
        timed("getBalance", self.client.get_balance(owner))
            .await
            .map_err(|e| network_error("getBalance", e))
    }

    async fn account_exists(&self, account: &Pubkey) -> Result<bool, TradeError> {
        let response = timed(
            "getAccountInfo",
            self.client
                .get_account_with_commitment(account, self.commitment),
        )
        .await
        .map_err(|e| network_error("getAccountInfo", e))?;
        Ok(response.value.is_some())
    }

    async fn latest_blockhash(&self) -> Result<Hash, TradeError> {
        timed("getLatestBlockhash", self.client.get_latest_blockhash())
            .await
            .map_err(|e| network_error("getLatestBlockhash", e))
    }

    async fn send_and_confirm(&self, tx: &VersionedTransaction) -> Result<Signature, TradeError> {
        let signature = tx.signatures.first().copied().unwrap_or_default();
        let config = RpcSendTransactionConfig {
            skip_preflight: true,
            preflight_commitment: Some(CommitmentLevel::Processed),
            ..RpcSendTransactionConfig::default()
        };

        match tokio::time::timeout(self.confirm_timeout, self.submit_and_poll(tx, config)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    signature = %signature,
                    timeout_secs = self.confirm_timeout.as_secs(),
                    "Confirmation deadline passed"
                );
                Err(TradeError::UnconfirmedTransaction {
                    signature: signature.to_string(),
                    reason: format!(
                        "not confirmed within {}s; the transaction may still land",
                        self.confirm_timeout.as_secs()
                    ),
                })
            }
        }
    }

    async fn simulate(&self, tx: &VersionedTransaction) -> Result<SimulationReport, TradeError> {
        let config = RpcSimulateTransactionConfig {
            sig_verify: true,
            commitment: Some(self.commitment),
            ..RpcSimulateTransactionConfig::default()
        };

        let response = timed(
            "simulateTransaction",
            self.client.simulate_transaction_with_config(tx, config),
        )
        .await
        .map_err(|e| network_error("simulateTransaction", e))?;
        Ok(response.value.into())
    }
}
