//! Addressing context for one trade
//!
//! Collects every per-trade address the assembler needs: the trader, the
//! mint, the bonding-curve accounts from the reserve snapshot, and the
//! trader's associated token account together with whether it already
//! exists on chain. Program-level addresses live in
//! [`ProtocolConfig`](crate::config::ProtocolConfig) instead.

use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address;

use crate::types::ReserveState;

/// Per-trade addresses resolved before assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeContext {
    /// Trader wallet; also the fee payer and the only signer
    pub owner: Pubkey,

    /// Token mint being traded
    pub mint: Pubkey,

    /// Bonding curve account from the reserve snapshot
    pub bonding_curve: Pubkey,

    /// Bonding curve's token vault from the reserve snapshot
    pub associated_bonding_curve: Pubkey,

    /// Trader's associated token account for `mint`
    pub token_account: Pubkey,

    /// Whether `token_account` already exists; `false` prepends a create
    pub token_account_exists: bool,
}

impl TradeContext {
    /// Build a context, deriving the trader's associated token account
    pub fn new(
        owner: Pubkey,
        mint: Pubkey,
        reserves: &ReserveState,
        token_account_exists: bool,
    ) -> Self {
        Self {
            owner,
            mint,
            bonding_curve: reserves.bonding_curve,
            associated_bonding_curve: reserves.associated_bonding_curve,
            token_account: get_associated_token_address(&owner, &mint),
            token_account_exists,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_derives_token_account() {
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let reserves = ReserveState {
            virtual_token_reserves: 1,
            virtual_sol_reserves: 1,
            bonding_curve: Pubkey::new_unique(),
            associated_bonding_curve: Pubkey::new_unique(),
        };

        let ctx = TradeContext::new(owner, mint, &reserves, false);

        assert_eq!(ctx.token_account, get_associated_token_address(&owner, &mint));
        assert_eq!(ctx.bonding_curve, reserves.bonding_curve);
        assert!(!ctx.token_account_exists);
    }
}
