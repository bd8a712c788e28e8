//! Simulation results
//!
//! Simulation mode hands the fully signed transaction to the RPC node's
//! `simulateTransaction` instead of broadcasting it. The node's response is
//! reduced to a [`SimulationReport`] so it can be returned over HTTP without
//! exposing RPC client types.

use serde::{Deserialize, Serialize};
use solana_rpc_client_api::response::RpcSimulateTransactionResult;

/// Outcome of a simulated transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    /// Program error, if the simulated transaction failed
    pub err: Option<String>,

    /// Program log lines
    pub logs: Vec<String>,

    /// Compute units consumed
    pub units_consumed: Option<u64>,
}

impl SimulationReport {
    /// Whether the simulated transaction would succeed
    pub fn succeeded(&self) -> bool {
        self.err.is_none()
    }
}

impl From<RpcSimulateTransactionResult> for SimulationReport {
    fn from(result: RpcSimulateTransactionResult) -> Self {
        Self {
            err: result.err.map(|e| format!("{:?}", e)),
            logs: result.logs.unwrap_or_default(),
            units_consumed: result.units_consumed,
        }
    }
}
