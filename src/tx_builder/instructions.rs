//! Instruction planning and ordering validation
//!
//! This module turns a [`Quote`] into the ordered instruction list for a
//! pump.fun buy or sell:
//! 1. Compute budget instructions (CU limit, priority fee)
//! 2. Create associated token account (only if the trader has none)
//! 3. Business instructions:
//!    - buy: fee transfer, then swap
//!    - sell: swap, then fee transfer
//!
//! The account list and payload of the swap instruction are the wire
//! contract with the on-chain program and are reproduced exactly.

use solana_sdk::{
    compute_budget::{self, ComputeBudgetInstruction},
    instruction::{AccountMeta, Instruction},
    system_instruction, system_program, sysvar,
};
use spl_associated_token_account::instruction::create_associated_token_account;

use crate::config::ProtocolConfig;
use crate::tx_builder::context::TradeContext;
use crate::tx_builder::errors::TradeError;
use crate::types::{Quote, TradeDirection};

/// Anchor discriminant of the program's `buy` method
pub const BUY_DISCRIMINATOR: u64 = 16_927_863_322_537_952_870;

/// Anchor discriminant of the program's `sell` method
pub const SELL_DISCRIMINATOR: u64 = 12_502_976_635_542_562_355;

/// Ordered instructions for one trade
#[derive(Debug, Clone)]
pub struct InstructionPlan {
    /// The ordered list of instructions for the transaction
    pub instructions: Vec<Instruction>,

    /// Direction the plan trades in
    pub direction: TradeDirection,
}

impl InstructionPlan {
    /// Create a new InstructionPlan
    pub fn new(instructions: Vec<Instruction>, direction: TradeDirection) -> Self {
        Self {
            instructions,
            direction,
        }
    }

    /// The pump.fun swap instruction, if present
    #[cfg(test)]
    pub fn swap_instruction(&self, program: &solana_sdk::pubkey::Pubkey) -> Option<&Instruction> {
        self.instructions.iter().find(|ix| ix.program_id == *program)
    }
}

/// Encode the swap payload: discriminant, primary amount, bound amount
///
/// Each value is an 8-byte little-endian u64.
pub fn encode_swap_data(discriminator: u64, amount: u64, bound: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(24);
    data.extend_from_slice(&discriminator.to_le_bytes());
    data.extend_from_slice(&amount.to_le_bytes());
    data.extend_from_slice(&bound.to_le_bytes());
    data
}

/// Build the `buy` instruction
///
/// `token_amount` is the quoted token output, `max_sol_cost` the slippage
/// ceiling in lamports.
pub fn build_buy_instruction(
    protocol: &ProtocolConfig,
    ctx: &TradeContext,
    token_amount: u64,
    max_sol_cost: u64,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(protocol.global, false),
        AccountMeta::new(protocol.fee_recipient, false),
        AccountMeta::new_readonly(ctx.mint, false),
        AccountMeta::new(ctx.bonding_curve, false),
        AccountMeta::new(ctx.associated_bonding_curve, false),
        AccountMeta::new(ctx.token_account, false),
        AccountMeta::new(ctx.owner, false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
        AccountMeta::new_readonly(protocol.event_authority, false),
        AccountMeta::new_readonly(protocol.program, false),
    ];

    Instruction::new_with_bytes(
        protocol.program,
        &encode_swap_data(BUY_DISCRIMINATOR, token_amount, max_sol_cost),
        accounts,
    )
}

/// Build the `sell` instruction
///
/// `token_amount` is the number of tokens sold, `min_sol_output` the
/// slippage floor in lamports. The fee collector is appended as the last
/// account.
pub fn build_sell_instruction(
    protocol: &ProtocolConfig,
    ctx: &TradeContext,
    token_amount: u64,
    min_sol_output: u64,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(protocol.global, false),
        AccountMeta::new(protocol.fee_recipient, false),
        AccountMeta::new_readonly(ctx.mint, false),
        AccountMeta::new(ctx.bonding_curve, false),
        AccountMeta::new(ctx.associated_bonding_curve, false),
        AccountMeta::new(ctx.token_account, false),
        AccountMeta::new(ctx.owner, false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(spl_associated_token_account::id(), false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(protocol.event_authority, false),
        AccountMeta::new_readonly(protocol.program, false),
        AccountMeta::new(protocol.fee_collector, false),
    ];

    Instruction::new_with_bytes(
        protocol.program,
        &encode_swap_data(SELL_DISCRIMINATOR, token_amount, min_sol_output),
        accounts,
    )
}

/// Plan the full instruction list for a trade
///
/// # Arguments
///
/// * `protocol` - Program addresses, fee collector and CU limit
/// * `ctx` - Per-trade addresses
/// * `direction` - Buy or sell
/// * `amount_in` - Lamports (buy) or tokens (sell) going in
/// * `quote` - Output of the quote engine for the same trade
/// * `priority_fee` - Compute-unit price in micro-lamports (0 = skip)
///
/// # Errors
///
/// Returns `TradeError::Internal` if the resulting plan fails the ordering
/// sanity check. No partial plan is ever returned.
pub fn plan_trade_instructions(
    protocol: &ProtocolConfig,
    ctx: &TradeContext,
    direction: TradeDirection,
    amount_in: u64,
    quote: &Quote,
    priority_fee: u64,
) -> Result<InstructionPlan, TradeError> {
    // Maximum: compute_budget (2) + create_ata (1) + fee transfer (1) + swap (1) = 5
    let mut instructions = Vec::with_capacity(5);

    // 1. Compute budget instructions
    instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(
        protocol.compute_unit_limit,
    ));
    if priority_fee > 0 {
        instructions.push(ComputeBudgetInstruction::set_compute_unit_price(priority_fee));
    }

    // 2. Trader token account
    if !ctx.token_account_exists {
        instructions.push(create_associated_token_account(
            &ctx.owner,
            &ctx.owner,
            &ctx.mint,
            &spl_token::id(),
        ));
    }

    // 3. Fee transfer and swap
    let fee_transfer =
        system_instruction::transfer(&ctx.owner, &protocol.fee_collector, quote.fee_amount);

    match direction {
        TradeDirection::Buy => {
            instructions.push(fee_transfer);
            instructions.push(build_buy_instruction(
                protocol,
                ctx,
                quote.amount_out,
                quote.bound_amount,
            ));
        }
        TradeDirection::Sell => {
            instructions.push(build_sell_instruction(
                protocol,
                ctx,
                amount_in,
                quote.bound_amount,
            ));
            instructions.push(fee_transfer);
        }
    }

    sanity_check_ix_order(&instructions, &protocol.program)?;

    Ok(InstructionPlan::new(instructions, direction))
}

/// Validate instruction ordering
///
/// Expected layout:
/// 1. Compute budget instructions, before anything else
/// 2. Exactly one instruction for the swap program
///
/// # Errors
///
/// Returns `TradeError::Internal` if the list is empty, a compute budget
/// instruction follows a business instruction, or the swap instruction is
/// missing or duplicated.
pub fn sanity_check_ix_order(
    instructions: &[Instruction],
    swap_program: &solana_sdk::pubkey::Pubkey,
) -> Result<(), TradeError> {
    if instructions.is_empty() {
        return Err(TradeError::internal("Instruction list is empty"));
    }

    let mut seen_business = false;
    for (idx, ix) in instructions.iter().enumerate() {
        if ix.program_id == compute_budget::id() {
            if seen_business {
                return Err(TradeError::internal(format!(
                    "Compute budget instruction at position {} follows a business instruction",
                    idx
                )));
            }
        } else {
            seen_business = true;
        }
    }

    let swaps = instructions
        .iter()
        .filter(|ix| ix.program_id == *swap_program)
        .count();
    if swaps != 1 {
        return Err(TradeError::internal(format!(
            "Expected exactly one swap instruction, found {}",
            swaps
        )));
    }

    Ok(())
}
