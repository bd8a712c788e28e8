//! Security and validation module
//!
//! Caller-supplied values cross into the trade pipeline through these
//! validators. Each one either yields a well-typed value or a
//! `TradeError::InvalidParameter` naming the offending field.

use solana_sdk::{pubkey::Pubkey, transaction::VersionedTransaction};

/// Validator for request parameters and outgoing transactions
pub mod validator {
    use super::*;
    use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    use crate::tx_builder::TradeError;
    use crate::types::LAMPORTS_PER_SOL;

    /// Convert a SOL amount to lamports, rounding down
    ///
    /// The conversion goes through `Decimal` so `0.1` SOL is exactly
    /// `100_000_000` lamports rather than whatever the binary float
    /// representation multiplies out to.
    pub fn sol_to_lamports(sol: f64, name: &str) -> Result<u64, TradeError> {
        if !sol.is_finite() {
            return Err(TradeError::invalid_parameter(name, "must be a finite number"));
        }
        if sol < 0.0 {
            return Err(TradeError::invalid_parameter(
                name,
                format!("must not be negative, got {}", sol),
            ));
        }

        let sol = Decimal::from_f64(sol)
            .ok_or_else(|| TradeError::invalid_parameter(name, "not representable"))?;
        sol.checked_mul(Decimal::from(LAMPORTS_PER_SOL))
            .map(|lamports| lamports.floor())
            .and_then(|lamports| lamports.to_u64())
            .ok_or_else(|| TradeError::invalid_parameter(name, "amount too large"))
    }

    /// Validate a slippage fraction in `[0, 1]`
    pub fn validate_slippage(slippage: f64) -> Result<Decimal, TradeError> {
        if !slippage.is_finite() {
            return Err(TradeError::invalid_parameter(
                "slippageDecimal",
                "must be a finite number",
            ));
        }
        if !(0.0..=1.0).contains(&slippage) {
            return Err(TradeError::invalid_parameter(
                "slippageDecimal",
                format!("must be between 0 and 1, got {}", slippage),
            ));
        }
        Decimal::from_f64(slippage)
            .ok_or_else(|| TradeError::invalid_parameter("slippageDecimal", "not representable"))
    }

    /// Parse and validate a mint address
    pub fn parse_mint(mint: &str) -> Result<Pubkey, TradeError> {
        let pubkey = Pubkey::from_str(mint.trim()).map_err(|e| {
            TradeError::invalid_parameter("mintAddress", format!("invalid address: {}", e))
        })?;
        if !validate_mint(&pubkey) {
            return Err(TradeError::invalid_parameter(
                "mintAddress",
                format!("{} is a program address, not a mint", pubkey),
            ));
        }
        Ok(pubkey)
    }

    /// Validate a mint address
    pub fn validate_mint(mint: &Pubkey) -> bool {
        *mint != Pubkey::default() && !is_system_address(mint)
    }

    /// Check if address is a system address
    pub fn is_system_address(pubkey: &Pubkey) -> bool {
        *pubkey == solana_sdk::system_program::id()
            || *pubkey == spl_token::id()
            || *pubkey == spl_associated_token_account::id()
    }

    /// Validate a transaction before sending
    pub fn validate_transaction(tx: &VersionedTransaction) -> Result<(), TradeError> {
        if tx.signatures.is_empty() {
            return Err(TradeError::internal("Transaction has no signatures"));
        }
        let required = usize::from(tx.message.header().num_required_signatures);
        if tx.signatures.len() != required {
            return Err(TradeError::internal(format!(
                "Transaction carries {} signatures, message requires {}",
                tx.signatures.len(),
                required
            )));
        }
        Ok(())
    }
}
