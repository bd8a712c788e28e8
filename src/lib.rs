//! pump.fun trading gateway library
//!
//! HTTP gateway for buying and selling tokens on the pump.fun bonding
//! curve. The library exposes every layer so the binary, the integration
//! tests and the benches share one implementation.

pub mod analysis;
pub mod coin_api;
pub mod config;
pub mod endpoints;
pub mod metrics;
pub mod rpc;
pub mod security;
pub mod structured_logging;
pub mod trade_engine;
pub mod types;
pub mod wallet;

// Modular transaction builder: quote, instruction plan, signing
pub mod tx_builder;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

// Re-export commonly used types
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
pub use tx_builder::TradeError;
pub use types::{Quote, ReserveState, TradeDirection, TradeOutcome, TradeRequest, TransactionMode};
