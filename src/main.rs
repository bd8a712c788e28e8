//! pump.fun trading gateway
//!
//! Entry point for the HTTP gateway that buys and sells pump.fun
//! bonding-curve tokens on behalf of callers.
//!
//! ## Features
//!
//! - **Bonding-curve quoting**: exact fee, output and slippage-bound math
//! - **Transaction assembly**: compute budget, token account, fee transfer, swap
//! - **Execution or simulation**: per request, against any Solana RPC node
//! - **Coin data and analysis**: proxied from the pump.fun frontend API
//! - **Per-IP rate limiting**: governor keyed limiter
//! - **Comprehensive Metrics**: Prometheus integration

// Compiler warning configuration
#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(dead_code)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::Parser;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pump_gateway::coin_api::CoinApiClient;
use pump_gateway::config::{Config, ProtocolConfig};
use pump_gateway::endpoints::{self, AppState};
use pump_gateway::rpc::RpcChainClient;
use pump_gateway::trade_engine::TradeEngine;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listen port, overrides the config file and PORT
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.json)?;

    info!("🚀 Starting pump.fun gateway");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    info!("📋 Loading configuration from: {}", args.config);
    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let protocol = Arc::new(
        ProtocolConfig::from_settings(&config.protocol).context("Invalid protocol settings")?,
    );
    info!(
        "🎯 Program: {} | fee rate: {} | fee collector: {}",
        protocol.program, protocol.fee_rate, protocol.fee_collector
    );

    let default_slippage = Decimal::from_f64(config.trading.default_slippage)
        .context("trading.default_slippage is not representable")?;

    // Upstream clients
    info!("🌐 RPC endpoint: {}", config.rpc.endpoint);
    let chain = Arc::new(RpcChainClient::new(&config.rpc));
    let coins = Arc::new(
        CoinApiClient::new(&config.coin_api).context("Failed to build coin API client")?,
    );

    let engine = TradeEngine::new(coins.clone(), chain, protocol, default_slippage);

    let limiter = Arc::new(endpoints::build_rate_limiter(&config.server)?);
    spawn_limiter_cleanup(
        limiter.clone(),
        Duration::from_secs(config.server.rate_limit_window_secs.max(1)),
    );

    if !config.monitoring.enable_metrics {
        warn!("Metrics endpoint disabled by configuration");
    }

    let state = AppState {
        engine,
        coins,
        limiter,
        metrics_enabled: config.monitoring.enable_metrics,
    };
    let app = endpoints::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("✅ Server is running on {}", addr);
    info!(
        "🛡️ Rate limit: {} requests per {}s per IP",
        config.server.rate_limit_requests, config.server.rate_limit_window_secs
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server error")?;

    info!("👋 Shutting down gracefully...");
    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let env_filter = if verbose {
        "pump_gateway=debug,info"
    } else {
        "pump_gateway=info,warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| env_filter.into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()?;
    }

    Ok(())
}

/// Periodically drop limiter state for clients that have gone quiet
fn spawn_limiter_cleanup(limiter: Arc<endpoints::IpRateLimiter>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            limiter.retain_recent();
            limiter.shrink_to_fit();
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("🛑 Received shutdown signal");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from(["pump-gateway", "--port", "8080", "--json", "-v"]);
        assert_eq!(args.port, Some(8080));
        assert!(args.json);
        assert!(args.verbose);
        assert_eq!(args.config, "config.toml");
    }
}
