//! Error types for the trade pipeline
//!
//! Every stage of a buy or sell (reserve fetch, key decoding, quoting,
//! instruction assembly, submission) reports failures through
//! [`TradeError`]. Errors are designed to be:
//! - Descriptive: the message is surfaced verbatim to HTTP callers
//! - Classifiable: `is_domain()` separates caller mistakes from upstream faults
//! - Observable: `category()` feeds the `trade_errors_total` metric

use thiserror::Error;

/// Error type for all trade operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TradeError {
    /// Token, bonding curve or account is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Virtual reserves are zero, pricing would divide by zero
    #[error("Invalid reserves: virtual_sol_reserves={sol}, virtual_token_reserves={token}")]
    InvalidReserves {
        /// Virtual SOL reserves reported for the curve
        sol: u64,
        /// Virtual token reserves reported for the curve
        token: u64,
    },

    /// Out-of-range slippage, amount, fee rate or address
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter
        name: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Malformed base-58 secret key
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Payer has no SOL or not enough to cover the trade
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    /// Upstream fetch or broadcast failure
    #[error("Network error: {0}")]
    Network(String),

    /// Submission did not confirm; the transaction may still land
    #[error("Transaction {signature} not confirmed: {reason}")]
    UnconfirmedTransaction {
        /// Signature of the submitted transaction
        signature: String,
        /// Why confirmation was not observed
        reason: String,
    },

    /// Internal invariant violation (compile/sign failures, malformed plans)
    ///
    /// These errors should be rare and typically indicate bugs
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TradeError {
    /// Whether the error was caused by the caller's input or the token's state
    ///
    /// Domain errors map to HTTP 400, everything else to 500.
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::InvalidReserves { .. }
                | Self::InvalidParameter { .. }
                | Self::InvalidKey(_)
                | Self::InsufficientBalance(_)
        )
    }

    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidReserves { .. } => "reserves",
            Self::InvalidParameter { .. } => "parameter",
            Self::InvalidKey(_) => "key",
            Self::InsufficientBalance(_) => "balance",
            Self::Network(_) => "network",
            Self::UnconfirmedTransaction { .. } => "unconfirmed",
            Self::Internal(_) => "internal",
        }
    }
}

// Convenience constructors for common error scenarios
impl TradeError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create a network error
    pub fn network(reason: impl Into<String>) -> Self {
        Self::Network(reason.into())
    }

    /// Create an internal error
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }
}
