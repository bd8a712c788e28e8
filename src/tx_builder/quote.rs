//! Bonding-curve quote engine
//!
//! Prices a buy or sell against a virtual-reserve snapshot using the
//! constant-product ratio the pump.fun program itself uses for quoting:
//!
//! - **Buy**: the fee is taken from the gross SOL input before pricing,
//!   tokens out are `net_in * token_reserves / sol_reserves`, and the max
//!   cost is the gross input widened by slippage.
//! - **Sell**: SOL out is `tokens_in * sol_reserves / token_reserves`, the fee
//!   is taken from those proceeds, and the min output is the net proceeds
//!   narrowed by slippage.
//!
//! The ratio is evaluated on the pre-trade snapshot and does not simulate
//! reserve depletion during the trade.
//!
//! All rounding is floor. Integer ratios use `u128`; fractional factors
//! (fee rate, slippage) use `rust_decimal` so no binary float ever decides
//! a lamport.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::tx_builder::errors::TradeError;
use crate::types::{Quote, ReserveState, TradeDirection, TradeRequest};

/// Compute the quote for a trade
///
/// # Errors
///
/// - `InvalidReserves` if either virtual reserve is zero
/// - `InvalidParameter` if the amount is zero, the slippage is outside
///   `[0, 1]`, the fee rate is outside `[0, 1)`, or a result does not fit
///   in a `u64`
pub fn compute_quote(reserves: &ReserveState, request: &TradeRequest) -> Result<Quote, TradeError> {
    validate(reserves, request)?;

    match request.direction {
        TradeDirection::Buy => quote_buy(reserves, request),
        TradeDirection::Sell => quote_sell(reserves, request),
    }
}

fn validate(reserves: &ReserveState, request: &TradeRequest) -> Result<(), TradeError> {
    if reserves.virtual_sol_reserves == 0 || reserves.virtual_token_reserves == 0 {
        return Err(TradeError::InvalidReserves {
            sol: reserves.virtual_sol_reserves,
            token: reserves.virtual_token_reserves,
        });
    }

    if request.amount_in == 0 {
        return Err(TradeError::invalid_parameter(
            "amount_in",
            "must be greater than zero",
        ));
    }

    if request.slippage < Decimal::ZERO || request.slippage > Decimal::ONE {
        return Err(TradeError::invalid_parameter(
            "slippage",
            format!("must be within [0, 1], got {}", request.slippage),
        ));
    }

    if request.fee_rate < Decimal::ZERO || request.fee_rate >= Decimal::ONE {
        return Err(TradeError::invalid_parameter(
            "fee_rate",
            format!("must be within [0, 1), got {}", request.fee_rate),
        ));
    }

    Ok(())
}

fn quote_buy(reserves: &ReserveState, request: &TradeRequest) -> Result<Quote, TradeError> {
    let gross_in = Decimal::from(request.amount_in);

    let fee_amount = floor_u64(gross_in.checked_mul(request.fee_rate), "fee_amount")?;
    // fee_rate < 1 keeps the fee strictly below the input
    let net_in = request.amount_in - fee_amount;

    let amount_out = u128::from(net_in) * u128::from(reserves.virtual_token_reserves)
        / u128::from(reserves.virtual_sol_reserves);
    let amount_out = u64::try_from(amount_out).map_err(|_| {
        TradeError::invalid_parameter("amount_out", "token output exceeds u64 range")
    })?;

    let max_sol_cost = floor_u64(
        Decimal::ONE
            .checked_add(request.slippage)
            .and_then(|factor| gross_in.checked_mul(factor)),
        "max_sol_cost",
    )?;

    Ok(Quote {
        amount_out,
        bound_amount: max_sol_cost,
        fee_amount,
    })
}

fn quote_sell(reserves: &ReserveState, request: &TradeRequest) -> Result<Quote, TradeError> {
    let expected_out = Decimal::from(request.amount_in)
        .checked_mul(Decimal::from(reserves.virtual_sol_reserves))
        .and_then(|v| v.checked_div(Decimal::from(reserves.virtual_token_reserves)))
        .ok_or_else(|| {
            TradeError::invalid_parameter("expected_out", "SOL output exceeds decimal range")
        })?;

    let fee_amount = floor_u64(expected_out.checked_mul(request.fee_rate), "fee_amount")?;

    let net_out = expected_out
        .checked_sub(Decimal::from(fee_amount))
        .ok_or_else(|| TradeError::internal("fee exceeds expected output"))?;

    let amount_out = floor_u64(Some(net_out), "amount_out")?;

    let min_sol_output = floor_u64(
        Decimal::ONE
            .checked_sub(request.slippage)
            .and_then(|factor| net_out.checked_mul(factor)),
        "min_sol_output",
    )?;

    Ok(Quote {
        amount_out,
        bound_amount: min_sol_output,
        fee_amount,
    })
}

/// Floor a non-negative decimal into a `u64`, rejecting overflow
fn floor_u64(value: Option<Decimal>, name: &str) -> Result<u64, TradeError> {
    value
        .and_then(|v| v.floor().to_u64())
        .ok_or_else(|| TradeError::invalid_parameter(name, "value out of u64 range"))
}
