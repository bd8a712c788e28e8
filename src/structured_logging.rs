//! Structured logging and request context

use solana_sdk::pubkey::Pubkey;
use uuid::Uuid;

use crate::tx_builder::TradeError;
use crate::types::{Quote, TradeDirection, TransactionMode};

/// Structured logger for trade pipeline events
#[derive(Debug, Clone)]
pub struct TradeLogger {
    request_id: String,
}

impl TradeLogger {
    pub fn new(request_id: String) -> Self {
        Self { request_id }
    }

    pub fn log_trade_start(&self, direction: TradeDirection, mint: &str, mode: TransactionMode) {
        tracing::info!(
            request_id = %self.request_id,
            direction = %direction,
            mint = %mint,
            mode = ?mode,
            "Trade requested"
        );
    }

    pub fn log_reserves(&self, mint: &str, virtual_sol: u64, virtual_token: u64) {
        tracing::debug!(
            request_id = %self.request_id,
            mint = %mint,
            virtual_sol_reserves = virtual_sol,
            virtual_token_reserves = virtual_token,
            "Reserves fetched"
        );
    }

    pub fn log_quote(&self, direction: TradeDirection, amount_in: u64, quote: &Quote) {
        tracing::info!(
            request_id = %self.request_id,
            direction = %direction,
            amount_in = amount_in,
            amount_out = quote.amount_out,
            bound_amount = quote.bound_amount,
            fee_amount = quote.fee_amount,
            "Quote computed"
        );
    }

    pub fn log_submission(&self, instruction_count: usize, signers: &[Pubkey], signature: &str) {
        tracing::debug!(
            request_id = %self.request_id,
            instruction_count = instruction_count,
            signers = ?signers,
            signature = %signature,
            "Submitting transaction"
        );
    }

    pub fn log_trade_success(&self, direction: TradeDirection, signature: &str, latency_ms: u64) {
        tracing::info!(
            request_id = %self.request_id,
            direction = %direction,
            signature = %signature,
            latency_ms = latency_ms,
            "Trade confirmed"
        );
    }

    pub fn log_simulation(&self, direction: TradeDirection, succeeded: bool, units: Option<u64>) {
        tracing::info!(
            request_id = %self.request_id,
            direction = %direction,
            succeeded = succeeded,
            units_consumed = ?units,
            "Trade simulated"
        );
    }

    pub fn log_trade_failure(&self, direction: TradeDirection, error: &TradeError, latency_ms: u64) {
        if error.is_domain() {
            tracing::info!(
                request_id = %self.request_id,
                direction = %direction,
                category = error.category(),
                error = %error,
                latency_ms = latency_ms,
                "Trade rejected"
            );
        } else {
            tracing::warn!(
                request_id = %self.request_id,
                direction = %direction,
                category = error.category(),
                error = %error,
                latency_ms = latency_ms,
                "Trade failed"
            );
        }
    }
}

/// Per-request context for correlating log lines
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique request ID
    pub request_id: String,

    /// Operation name
    pub operation: String,

    /// Unix timestamp (seconds) when the request was received
    pub timestamp: i64,

    /// Structured logger instance
    pub logger: TradeLogger,
}

impl RequestContext {
    /// Create a new request context
    pub fn new(operation: &str) -> Self {
        let request_id = Uuid::new_v4().to_string();

        Self {
            request_id: request_id.clone(),
            operation: operation.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
            logger: TradeLogger::new(request_id),
        }
    }

    /// Tracing span carrying the request id
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "request",
            request_id = %self.request_id,
            operation = %self.operation,
            received_at = self.timestamp
        )
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new("default")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_are_unique() {
        let a = RequestContext::new("buy");
        let b = RequestContext::new("buy");
        assert_ne!(a.request_id, b.request_id);
        assert_eq!(a.operation, "buy");
        assert!(Uuid::parse_str(&a.request_id).is_ok());
    }

    #[test]
    fn test_context_records_receipt_time() {
        let before = chrono::Utc::now().timestamp();
        let ctx = RequestContext::new("sell");
        let after = chrono::Utc::now().timestamp();

        assert!(ctx.timestamp >= before && ctx.timestamp <= after);
    }
}
