//! Wallet management module
//!
//! Callers hand the gateway a base-58 encoded 64-byte secret with every
//! trade. The decoded bytes are wiped as soon as the keypair is built and
//! the secret never reaches a log line.

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::sync::Arc;
use zeroize::Zeroizing;

use crate::tx_builder::TradeError;

/// Expected length of an ed25519 keypair (secret + public half)
const KEYPAIR_LEN: usize = 64;

/// Wallet manager for handling keypairs and signing
pub struct WalletManager {
    keypair: Arc<Keypair>,
}

impl WalletManager {
    /// Decode a base-58 secret key
    ///
    /// # Errors
    ///
    /// Returns `TradeError::InvalidKey` for non-base-58 input, a length
    /// other than 64 bytes, an all-zero key, or bytes that are not a valid
    /// ed25519 keypair.
    pub fn from_base58(secret: &str) -> Result<Self, TradeError> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(TradeError::InvalidKey("private key is empty".to_string()));
        }

        let bytes = Zeroizing::new(
            bs58::decode(secret)
                .into_vec()
                .map_err(|e| TradeError::InvalidKey(format!("not valid base-58: {}", e)))?,
        );

        if bytes.len() != KEYPAIR_LEN {
            return Err(TradeError::InvalidKey(format!(
                "expected {} bytes, got {}",
                KEYPAIR_LEN,
                bytes.len()
            )));
        }
        if bytes.iter().all(|&b| b == 0) {
            return Err(TradeError::InvalidKey("all-zero key rejected".to_string()));
        }

        let keypair = Keypair::try_from(bytes.as_slice())
            .map_err(|e| TradeError::InvalidKey(format!("invalid keypair bytes: {}", e)))?;

        Ok(Self::from_keypair(keypair))
    }

    /// Create a new wallet manager from a keypair
    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    /// Get the public key
    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Get a reference to the keypair
    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl Clone for WalletManager {
    fn clone(&self) -> Self {
        Self {
            keypair: Arc::clone(&self.keypair),
        }
    }
}

impl std::fmt::Debug for WalletManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletManager")
            .field("pubkey", &self.pubkey())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_base58() {
        let keypair = Keypair::new();
        let encoded = bs58::encode(keypair.to_bytes()).into_string();

        let wallet = WalletManager::from_base58(&encoded).expect("valid key");
        assert_eq!(wallet.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_rejects_malformed_keys() {
        let cases = [
            String::new(),
            "0OIl".to_string(), // not in the base-58 alphabet
            bs58::encode([7u8; 32]).into_string(),
            bs58::encode([0u8; 64]).into_string(),
        ];

        for case in cases {
            let result = WalletManager::from_base58(&case);
            assert!(
                matches!(result, Err(TradeError::InvalidKey(_))),
                "expected InvalidKey for {:?}",
                case
            );
        }
    }

    #[test]
    fn test_debug_hides_secret() {
        let wallet = WalletManager::from_keypair(Keypair::new());
        let rendered = format!("{:?}", wallet);
        assert!(rendered.contains(&wallet.pubkey().to_string()));
        assert!(!rendered.contains(&bs58::encode(wallet.keypair().to_bytes()).into_string()));
    }
}
