//! Trade orchestration
//!
//! One buy or sell runs these stages in order, stopping at the first error:
//!
//! 1. Fetch the reserve snapshot for the mint
//! 2. Decode the caller's key and parse the mint
//! 3. Check the payer has SOL and look up its token account
//! 4. Quote, plan instructions, compile and sign
//! 5. Broadcast and confirm, or simulate, depending on the mode
//!
//! Nothing is retried and nothing is cached between trades.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::Instrument;
use zeroize::Zeroizing;

use crate::coin_api::ReserveSource;
use crate::config::ProtocolConfig;
use crate::metrics::{metrics, Timer};
use crate::rpc::ChainClient;
use crate::security::validator;
use crate::structured_logging::{RequestContext, TradeLogger};
use crate::tx_builder::{
    compute_quote, plan_trade_instructions, TradeContext, TradeError, TxBuildOutput,
};
use crate::types::{TradeDirection, TradeOutcome, TradeRequest, TransactionMode};
use crate::wallet::WalletManager;

/// Caller-side parameters of one trade
pub struct TradeOrder {
    /// Base-58 secret key; wiped on drop
    pub private_key: Zeroizing<String>,

    /// Mint address as sent by the caller
    pub mint: String,

    /// Lamports for buys, token base units for sells
    pub amount_in: u64,

    /// Priority fee; used as the compute-unit price
    pub priority_fee_lamports: u64,

    /// Slippage fraction; `None` uses the configured default
    pub slippage: Option<Decimal>,
}

impl std::fmt::Debug for TradeOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradeOrder")
            .field("mint", &self.mint)
            .field("amount_in", &self.amount_in)
            .field("priority_fee_lamports", &self.priority_fee_lamports)
            .field("slippage", &self.slippage)
            .finish_non_exhaustive()
    }
}

/// Runs buys and sells against a reserve source and a chain client
#[derive(Clone)]
pub struct TradeEngine {
    reserves: Arc<dyn ReserveSource>,
    chain: Arc<dyn ChainClient>,
    protocol: Arc<ProtocolConfig>,
    default_slippage: Decimal,
}

impl TradeEngine {
    pub fn new(
        reserves: Arc<dyn ReserveSource>,
        chain: Arc<dyn ChainClient>,
        protocol: Arc<ProtocolConfig>,
        default_slippage: Decimal,
    ) -> Self {
        Self {
            reserves,
            chain,
            protocol,
            default_slippage,
        }
    }

    /// Protocol constants trades are assembled against
    pub fn protocol(&self) -> &ProtocolConfig {
        &self.protocol
    }

    /// Buy tokens with `order.amount_in` lamports
    pub async fn buy(
        &self,
        mode: TransactionMode,
        order: TradeOrder,
    ) -> Result<TradeOutcome, TradeError> {
        self.trade(TradeDirection::Buy, mode, order).await
    }

    /// Sell `order.amount_in` token base units
    pub async fn sell(
        &self,
        mode: TransactionMode,
        order: TradeOrder,
    ) -> Result<TradeOutcome, TradeError> {
        self.trade(TradeDirection::Sell, mode, order).await
    }

    async fn trade(
        &self,
        direction: TradeDirection,
        mode: TransactionMode,
        order: TradeOrder,
    ) -> Result<TradeOutcome, TradeError> {
        let ctx = RequestContext::new(&direction.to_string());
        let timer = Timer::new();
        let m = metrics();

        m.active_trades.inc();
        let result = self
            .run(direction, mode, &order, &ctx.logger)
            .instrument(ctx.span())
            .await;
        m.active_trades.dec();
        timer.observe_duration(&m.trade_latency);

        match &result {
            Ok(TradeOutcome::Executed { signature, .. }) => {
                ctx.logger
                    .log_trade_success(direction, signature, timer.elapsed_ms());
                m.record_trade(direction, "executed");
            }
            Ok(TradeOutcome::Simulated { .. }) => m.record_trade(direction, "simulated"),
            Err(e) => {
                ctx.logger
                    .log_trade_failure(direction, e, timer.elapsed_ms());
                m.record_error(direction, e);
            }
        }
        result
    }

    async fn run(
        &self,
        direction: TradeDirection,
        mode: TransactionMode,
        order: &TradeOrder,
        logger: &TradeLogger,
    ) -> Result<TradeOutcome, TradeError> {
        logger.log_trade_start(direction, &order.mint, mode);

        let reserves = self.reserves.fetch_reserves(&order.mint).await?;
        logger.log_reserves(
            &order.mint,
            reserves.virtual_sol_reserves,
            reserves.virtual_token_reserves,
        );

        let wallet = WalletManager::from_base58(&order.private_key)?;
        let mint = validator::parse_mint(&order.mint)?;
        let owner = wallet.pubkey();

        let balance = self.chain.get_balance(&owner).await?;
        if balance == 0 {
            return Err(TradeError::InsufficientBalance(format!(
                "account {} has no SOL balance; fund it before trading",
                owner
            )));
        }
        if direction == TradeDirection::Buy && balance < order.amount_in {
            return Err(TradeError::InsufficientBalance(format!(
                "account {} holds {} lamports, buy needs {}",
                owner, balance, order.amount_in
            )));
        }

        let mut trade_ctx = TradeContext::new(owner, mint, &reserves, false);
        trade_ctx.token_account_exists = self.chain.account_exists(&trade_ctx.token_account).await?;

        let request = TradeRequest {
            direction,
            amount_in: order.amount_in,
            fee_rate: self.protocol.fee_rate,
            slippage: order.slippage.unwrap_or(self.default_slippage),
            priority_fee_lamports: order.priority_fee_lamports,
        };
        let quote = compute_quote(&reserves, &request)?;
        logger.log_quote(direction, order.amount_in, &quote);

        let plan = plan_trade_instructions(
            &self.protocol,
            &trade_ctx,
            direction,
            order.amount_in,
            &quote,
            order.priority_fee_lamports,
        )?;

        let blockhash = self.chain.latest_blockhash().await?;
        let output = TxBuildOutput::sign(&plan, wallet.keypair(), blockhash)?;
        validator::validate_transaction(output.tx_ref())?;

        match mode {
            TransactionMode::Execution => {
                logger.log_submission(
                    plan.instructions.len(),
                    output.required_signers(),
                    &output.signature().to_string(),
                );
                let signature = self.chain.send_and_confirm(output.tx_ref()).await?;
                Ok(TradeOutcome::Executed {
                    signature: signature.to_string(),
                    quote,
                })
            }
            TransactionMode::Simulation => {
                let report = self.chain.simulate(output.tx_ref()).await?;
                logger.log_simulation(direction, report.succeeded(), report.units_consumed);
                Ok(TradeOutcome::Simulated { report, quote })
            }
        }
    }
}

impl std::fmt::Debug for TradeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradeEngine")
            .field("protocol", &self.protocol)
            .field("default_slippage", &self.default_slippage)
            .finish_non_exhaustive()
    }
}
