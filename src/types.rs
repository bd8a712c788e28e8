//! Common types used throughout the application

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::tx_builder::simulate::SimulationReport;

/// Lamports per SOL
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Trade direction against the bonding curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    /// SOL in, tokens out
    Buy,
    /// Tokens in, SOL out
    Sell,
}

impl std::fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// What to do with an assembled transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionMode {
    /// Sign, broadcast and wait for confirmation
    Execution,
    /// Ask the RPC node to simulate; nothing lands on chain
    Simulation,
}

/// Bonding-curve reserve snapshot for one token
///
/// Fetched fresh for every trade and never cached. The price may move
/// between fetch and submission; the slippage bound covers that window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReserveState {
    pub virtual_token_reserves: u64,
    pub virtual_sol_reserves: u64,
    pub bonding_curve: Pubkey,
    pub associated_bonding_curve: Pubkey,
}

/// Inputs to the quote engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeRequest {
    pub direction: TradeDirection,

    /// Lamports for buys, token base units for sells
    pub amount_in: u64,

    /// Fee fraction routed to the fee collector (0.005 = 0.5%)
    pub fee_rate: Decimal,

    /// Tolerated adverse price movement as a fraction in `[0, 1]`
    pub slippage: Decimal,

    /// Priority fee; zero skips the compute-unit price instruction
    pub priority_fee_lamports: u64,
}

/// Result of pricing a trade against a reserve snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Tokens received (buy) or net lamports expected (sell)
    pub amount_out: u64,

    /// Max SOL cost (buy) or min SOL output (sell) passed to the program
    pub bound_amount: u64,

    /// Lamports transferred to the fee collector
    pub fee_amount: u64,
}

/// Result of a buy or sell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum TradeOutcome {
    /// Transaction confirmed on chain
    Executed { signature: String, quote: Quote },
    /// Transaction simulated by the RPC node
    Simulated {
        report: SimulationReport,
        quote: Quote,
    },
}

impl TradeOutcome {
    /// Quote the outcome was built from
    pub fn quote(&self) -> &Quote {
        match self {
            Self::Executed { quote, .. } | Self::Simulated { quote, .. } => quote,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_display() {
        assert_eq!(TradeDirection::Buy.to_string(), "buy");
        assert_eq!(TradeDirection::Sell.to_string(), "sell");
    }

    #[test]
    fn test_outcome_serializes_with_mode_tag() {
        let outcome = TradeOutcome::Executed {
            signature: "5sig".to_string(),
            quote: Quote {
                amount_out: 10,
                bound_amount: 20,
                fee_amount: 1,
            },
        };

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["mode"], "executed");
        assert_eq!(json["signature"], "5sig");
        assert_eq!(json["quote"]["boundAmount"], 20);
        assert_eq!(outcome.quote().fee_amount, 1);
    }
}
