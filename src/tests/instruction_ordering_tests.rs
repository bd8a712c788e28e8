//! Instruction Ordering Tests
//!
//! End-to-end ordering checks from a reserve snapshot to a signed message:
//! - Compute budget first, CU price only with a priority fee
//! - Token account creation only when the trader has none
//! - Buy pays the fee before the swap, sell after it
//! - Compilation preserves the planned order

#[cfg(test)]
mod instruction_ordering_tests {
    use rust_decimal::Decimal;
    use solana_sdk::{
        compute_budget, hash::Hash, pubkey::Pubkey, signature::Keypair, signer::Signer,
        system_program,
    };
    use spl_associated_token_account::get_associated_token_address;

    use crate::config::ProtocolConfig;
    use crate::tx_builder::{
        compute_quote, plan_trade_instructions, TradeContext, TxBuildOutput, BUY_DISCRIMINATOR,
        SELL_DISCRIMINATOR,
    };
    use crate::types::{ReserveState, TradeDirection, TradeRequest};

    fn reserves() -> ReserveState {
        ReserveState {
            virtual_token_reserves: 1_000_000_000_000,
            virtual_sol_reserves: 10_000_000_000,
            bonding_curve: Pubkey::new_unique(),
            associated_bonding_curve: Pubkey::new_unique(),
        }
    }

    /// Program ids of a plan, in order
    fn plan_programs(
        direction: TradeDirection,
        account_exists: bool,
        priority_fee: u64,
    ) -> (Vec<Pubkey>, ProtocolConfig) {
        let protocol = ProtocolConfig::default();
        let reserves = reserves();
        let ctx = TradeContext::new(
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            &reserves,
            account_exists,
        );
        let request = TradeRequest {
            direction,
            amount_in: 100_000_000,
            fee_rate: protocol.fee_rate,
            slippage: Decimal::new(25, 2),
            priority_fee_lamports: priority_fee,
        };
        let quote = compute_quote(&reserves, &request).unwrap();
        let plan = plan_trade_instructions(
            &protocol,
            &ctx,
            direction,
            request.amount_in,
            &quote,
            priority_fee,
        )
        .unwrap();

        (
            plan.instructions.iter().map(|ix| ix.program_id).collect(),
            protocol,
        )
    }

    #[test]
    fn test_full_ordering_matrix() {
        let cb = compute_budget::id();
        let ata = spl_associated_token_account::id();
        let sys = system_program::id();

        for direction in [TradeDirection::Buy, TradeDirection::Sell] {
            for account_exists in [true, false] {
                for priority_fee in [0u64, 25_000] {
                    let (programs, protocol) =
                        plan_programs(direction, account_exists, priority_fee);
                    let swap = protocol.program;

                    let mut expected = vec![cb];
                    if priority_fee > 0 {
                        expected.push(cb);
                    }
                    if !account_exists {
                        expected.push(ata);
                    }
                    match direction {
                        TradeDirection::Buy => expected.extend([sys, swap]),
                        TradeDirection::Sell => expected.extend([swap, sys]),
                    }

                    assert_eq!(
                        programs, expected,
                        "direction={} exists={} priority={}",
                        direction, account_exists, priority_fee
                    );
                }
            }
        }
    }

    #[test]
    fn test_context_derives_trader_token_account() {
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let reserves = reserves();
        let ctx = TradeContext::new(owner, mint, &reserves, false);

        assert_eq!(ctx.token_account, get_associated_token_address(&owner, &mint));
        assert_eq!(ctx.bonding_curve, reserves.bonding_curve);
        assert_eq!(ctx.associated_bonding_curve, reserves.associated_bonding_curve);
    }

    #[test]
    fn test_compiled_message_preserves_order() {
        let payer = Keypair::new();
        let protocol = ProtocolConfig::default();
        let reserves = reserves();
        let ctx = TradeContext::new(payer.pubkey(), Pubkey::new_unique(), &reserves, false);

        for (direction, discriminator) in [
            (TradeDirection::Buy, BUY_DISCRIMINATOR),
            (TradeDirection::Sell, SELL_DISCRIMINATOR),
        ] {
            let request = TradeRequest {
                direction,
                amount_in: 50_000_000,
                fee_rate: protocol.fee_rate,
                slippage: Decimal::ZERO,
                priority_fee_lamports: 1_000,
            };
            let quote = compute_quote(&reserves, &request).unwrap();
            let plan = plan_trade_instructions(
                &protocol,
                &ctx,
                direction,
                request.amount_in,
                &quote,
                1_000,
            )
            .unwrap();
            let output = TxBuildOutput::sign(&plan, &payer, Hash::new_unique()).unwrap();

            let keys = output.tx.message.static_account_keys();
            let compiled: Vec<Pubkey> = output
                .tx
                .message
                .instructions()
                .iter()
                .map(|ix| keys[usize::from(ix.program_id_index)])
                .collect();
            let planned: Vec<Pubkey> = plan.instructions.iter().map(|ix| ix.program_id).collect();
            assert_eq!(compiled, planned);

            let swap = output
                .tx
                .message
                .instructions()
                .iter()
                .find(|ix| keys[usize::from(ix.program_id_index)] == protocol.program)
                .expect("swap instruction compiled");
            assert_eq!(&swap.data[0..8], &discriminator.to_le_bytes());
            assert_eq!(keys[0], payer.pubkey());
        }
    }
}
