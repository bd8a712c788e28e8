//! Signed transaction output
//!
//! This module provides TxBuildOutput, which compiles an
//! [`InstructionPlan`] into a v0 message against a recent blockhash and
//! signs it with the trader's keypair. The same output feeds both execution
//! and simulation, so a simulated transaction is byte-identical to the one
//! that would be broadcast.

use solana_sdk::{
    hash::Hash,
    message::{v0::Message as MessageV0, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::VersionedTransaction,
};

use crate::tx_builder::errors::TradeError;
use crate::tx_builder::instructions::InstructionPlan;

/// Signed transaction ready for broadcast or simulation
#[derive(Debug, Clone)]
pub struct TxBuildOutput {
    /// The signed transaction
    pub tx: VersionedTransaction,

    /// List of required signers for this transaction
    /// Extracted from message.header.num_required_signatures
    pub required_signers: Vec<Pubkey>,
}

impl TxBuildOutput {
    /// Compile and sign a plan with `payer` as fee payer and sole signer
    ///
    /// # Errors
    ///
    /// Returns `TradeError::Internal` if the message cannot be compiled or
    /// signed; both indicate a malformed plan.
    pub fn sign(
        plan: &InstructionPlan,
        payer: &Keypair,
        blockhash: Hash,
    ) -> Result<Self, TradeError> {
        let message = MessageV0::try_compile(&payer.pubkey(), &plan.instructions, &[], blockhash)
            .map_err(|e| TradeError::internal(format!("Failed to compile message: {}", e)))?;

        let tx = VersionedTransaction::try_new(VersionedMessage::V0(message), &[payer])
            .map_err(|e| TradeError::internal(format!("Failed to sign transaction: {}", e)))?;

        let required = usize::from(tx.message.header().num_required_signatures);
        let required_signers = tx.message.static_account_keys()[..required].to_vec();

        Ok(Self {
            tx,
            required_signers,
        })
    }

    /// Get reference to the transaction
    pub fn tx_ref(&self) -> &VersionedTransaction {
        &self.tx
    }

    /// Fee payer signature, which is also the transaction id
    pub fn signature(&self) -> Signature {
        self.tx.signatures.first().copied().unwrap_or_default()
    }

    /// Get slice of required signers
    pub fn required_signers(&self) -> &[Pubkey] {
        &self.required_signers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProtocolConfig;
    use crate::tx_builder::context::TradeContext;
    use crate::tx_builder::instructions::plan_trade_instructions;
    use crate::types::{Quote, TradeDirection};

    #[test]
    fn test_sign_sets_payer_as_only_signer() {
        let payer = Keypair::new();
        let protocol = ProtocolConfig::default();
        let ctx = TradeContext {
            owner: payer.pubkey(),
            mint: Pubkey::new_unique(),
            bonding_curve: Pubkey::new_unique(),
            associated_bonding_curve: Pubkey::new_unique(),
            token_account: Pubkey::new_unique(),
            token_account_exists: false,
        };
        let quote = Quote {
            amount_out: 1_000,
            bound_amount: 2_000,
            fee_amount: 10,
        };

        let plan =
            plan_trade_instructions(&protocol, &ctx, TradeDirection::Buy, 1_500, &quote, 0)
                .unwrap();
        let output = TxBuildOutput::sign(&plan, &payer, Hash::new_unique()).unwrap();

        assert_eq!(output.required_signers(), &[payer.pubkey()]);
        assert_eq!(output.tx_ref().signatures.len(), 1);
        assert_ne!(output.signature(), Signature::default());
        assert!(output.tx_ref().verify_with_results().iter().all(|ok| *ok));
    }
}
