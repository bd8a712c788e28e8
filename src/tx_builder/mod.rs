//! pump.fun transaction builder
//!
//! This module turns a reserve snapshot and a trade request into a signed
//! transaction for the pump.fun bonding-curve program.
//!
//! ## Architecture
//!
//! The builder is split into focused modules:
//! - **errors**: Error taxonomy shared by the whole trade pipeline
//! - **quote**: Bonding-curve pricing, fee extraction and slippage bounds
//! - **context**: Per-trade addressing (trader, mint, curve, token account)
//! - **instructions**: Instruction planning and ordering validation
//! - **output**: Compilation and signing into a v0 transaction
//! - **simulate**: Simulation report returned in simulation mode
//!
//! Every stage is a pure, stateless transform; only the trade engine talks
//! to the network.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use pump_gateway::config::ProtocolConfig;
//! use pump_gateway::tx_builder::{compute_quote, plan_trade_instructions, TradeContext};
//! use pump_gateway::types::{ReserveState, TradeDirection, TradeRequest};
//! # fn example(reserves: ReserveState, ctx: TradeContext, request: TradeRequest)
//! #     -> Result<(), pump_gateway::tx_builder::TradeError> {
//! let protocol = ProtocolConfig::default();
//! let quote = compute_quote(&reserves, &request)?;
//! let plan = plan_trade_instructions(
//!     &protocol,
//!     &ctx,
//!     TradeDirection::Buy,
//!     request.amount_in,
//!     &quote,
//!     request.priority_fee_lamports,
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub use errors::TradeError;

pub mod context;
pub mod instructions;
pub mod output;
pub mod quote;
pub mod simulate;

// Re-export key types for convenience
pub use context::TradeContext;
pub use instructions::{
    plan_trade_instructions, sanity_check_ix_order, InstructionPlan, BUY_DISCRIMINATOR,
    SELL_DISCRIMINATOR,
};
pub use output::TxBuildOutput;
pub use quote::compute_quote;
pub use simulate::SimulationReport;
