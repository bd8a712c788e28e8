//! Configuration module for the pump gateway
//!
//! This module handles all configuration loading from TOML files,
//! environment variables, and provides structured configuration types.
//! Every field carries a serde default, so a partial file (or none at all)
//! still yields a runnable configuration.

use anyhow::{bail, Context};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey, pubkey::Pubkey};
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Solana RPC configuration
    #[serde(default)]
    pub rpc: RpcConfig,

    /// pump.fun frontend API configuration
    #[serde(default)]
    pub coin_api: CoinApiConfig,

    /// Program addresses and fee settings
    #[serde(default)]
    pub protocol: ProtocolSettings,

    /// Request defaults
    #[serde(default)]
    pub trading: TradingConfig,

    /// Monitoring and metrics
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Requests allowed per client IP per window
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests: u32,

    /// Rate limit window in seconds
    #[serde(default = "default_rate_limit_window")]
    pub rate_limit_window_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// RPC endpoint
    #[serde(default = "default_rpc_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,

    /// Deadline for send-and-confirm in seconds
    #[serde(default = "default_confirm_timeout")]
    pub confirm_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinApiConfig {
    /// Base URL; coins are fetched from `{base_url}/coins/{mint}`
    #[serde(default = "default_coin_api_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_coin_api_timeout")]
    pub timeout_secs: u64,

    /// User-Agent header sent to the API
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Raw protocol settings as written in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolSettings {
    #[serde(default = "default_global")]
    pub global: String,

    #[serde(default = "default_fee_recipient")]
    pub fee_recipient: String,

    #[serde(default = "default_program")]
    pub program: String,

    #[serde(default = "default_event_authority")]
    pub event_authority: String,

    /// Gateway's own fee collector, distinct from the protocol fee recipient
    #[serde(default = "default_fee_collector")]
    pub fee_collector: String,

    /// Gateway fee as a fraction (0.005 = 0.5%)
    #[serde(default = "default_fee_percentage")]
    pub fee_percentage: f64,

    #[serde(default = "default_compute_unit_limit")]
    pub compute_unit_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Slippage used when a request omits `slippageDecimal`
    #[serde(default = "default_slippage")]
    pub default_slippage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Serve prometheus metrics at `/metrics`
    #[serde(default = "default_true")]
    pub enable_metrics: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 3000 }
fn default_rate_limit_requests() -> u32 { 100 }
fn default_rate_limit_window() -> u64 { 15 * 60 }
fn default_rpc_endpoint() -> String { "https://api.mainnet-beta.solana.com".to_string() }
fn default_rpc_timeout() -> u64 { 30 }
fn default_confirm_timeout() -> u64 { 60 }
fn default_coin_api_url() -> String { "https://frontend-api.pump.fun".to_string() }
fn default_coin_api_timeout() -> u64 { 10 }
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0".to_string()
}
fn default_global() -> String { GLOBAL.to_string() }
fn default_fee_recipient() -> String { FEE_RECIPIENT.to_string() }
fn default_program() -> String { PUMP_FUN_PROGRAM.to_string() }
fn default_event_authority() -> String { PUMP_FUN_EVENT_AUTHORITY.to_string() }
fn default_fee_collector() -> String { FEE_COLLECTOR.to_string() }
fn default_fee_percentage() -> f64 { 0.005 }
fn default_compute_unit_limit() -> u32 { 1_000_000 }
fn default_slippage() -> f64 { 0.25 }
fn default_true() -> bool { true }

// Mainnet addresses
pub const GLOBAL: Pubkey = pubkey!("4wTV1YmiEkRvAtNtsSGPtUrqRYQMe5SKy2uB4Jjaxnjf");
pub const FEE_RECIPIENT: Pubkey = pubkey!("CebN5WGQ4jvEPvsVU4EoHEpgzq1VV7AbicfhtW4xC9iM");
pub const PUMP_FUN_PROGRAM: Pubkey = pubkey!("6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P");
pub const PUMP_FUN_EVENT_AUTHORITY: Pubkey = pubkey!("Ce6TQqeHC9p8KetsN6JsjHK7UTZk7nasjjnr7XxXp9F1");
pub const FEE_COLLECTOR: Pubkey = pubkey!("BVCgKcceK8StA4ognszUWLUMWksU7auvPBmjN7f7RBs");

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            rate_limit_requests: default_rate_limit_requests(),
            rate_limit_window_secs: default_rate_limit_window(),
        }
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: default_rpc_endpoint(),
            timeout_secs: default_rpc_timeout(),
            confirm_timeout_secs: default_confirm_timeout(),
        }
    }
}

impl Default for CoinApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_coin_api_url(),
            timeout_secs: default_coin_api_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self {
            global: default_global(),
            fee_recipient: default_fee_recipient(),
            program: default_program(),
            event_authority: default_event_authority(),
            fee_collector: default_fee_collector(),
            fee_percentage: default_fee_percentage(),
            compute_unit_limit: default_compute_unit_limit(),
        }
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            default_slippage: default_slippage(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_metrics: default_true(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path))?;
        Ok(config)
    }

    /// Load configuration with `.env` and environment variable overrides
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = if std::path::Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file '{}' not found, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply the environment variables the service has always honoured
    pub fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("PORT is not a valid port: {}", port))?;
        }
        if let Some(endpoint) = lookup("RPC_URL") {
            self.rpc.endpoint = endpoint;
        }
        if let Some(global) = lookup("GLOBAL_PUBLIC_KEY") {
            self.protocol.global = global;
        }
        if let Some(recipient) = lookup("FEE_RECIPIENT_PUBLIC_KEY") {
            self.protocol.fee_recipient = recipient;
        }
        if let Some(program) = lookup("PUMP_FUN_PROGRAM") {
            self.protocol.program = program;
        }
        if let Some(authority) = lookup("PUMP_FUN_ACCOUNT") {
            self.protocol.event_authority = authority;
        }
        if let Some(collector) = lookup("FEE_RECIPIENT_ADDRESS") {
            self.protocol.fee_collector = collector;
        }
        if let Some(fee) = lookup("FEE_PERCENTAGE") {
            self.protocol.fee_percentage = fee
                .parse()
                .with_context(|| format!("FEE_PERCENTAGE is not a number: {}", fee))?;
        }
        Ok(())
    }

    /// Reject configurations that would make every trade fail
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rpc.endpoint.is_empty() {
            bail!("rpc.endpoint must not be empty");
        }
        if self.coin_api.base_url.is_empty() {
            bail!("coin_api.base_url must not be empty");
        }
        if self.server.rate_limit_requests == 0 || self.server.rate_limit_window_secs == 0 {
            bail!("server rate limit requests and window must be non-zero");
        }
        if !(0.0..=1.0).contains(&self.trading.default_slippage) {
            bail!(
                "trading.default_slippage must be within [0, 1], got {}",
                self.trading.default_slippage
            );
        }
        ProtocolConfig::from_settings(&self.protocol)?;
        Ok(())
    }
}

/// Immutable protocol configuration injected into the quote engine and
/// instruction assembler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConfig {
    pub global: Pubkey,
    pub fee_recipient: Pubkey,
    pub program: Pubkey,
    pub event_authority: Pubkey,
    pub fee_collector: Pubkey,
    pub fee_rate: Decimal,
    pub compute_unit_limit: u32,
}

impl ProtocolConfig {
    /// Parse and validate the raw settings
    pub fn from_settings(settings: &ProtocolSettings) -> anyhow::Result<Self> {
        let parse = |name: &str, value: &str| {
            Pubkey::from_str(value)
                .with_context(|| format!("protocol.{} is not a valid address: {}", name, value))
        };

        let fee_rate = Decimal::from_f64(settings.fee_percentage)
            .filter(|rate| *rate >= Decimal::ZERO && *rate < Decimal::ONE)
            .with_context(|| {
                format!(
                    "protocol.fee_percentage must be within [0, 1), got {}",
                    settings.fee_percentage
                )
            })?;

        if settings.compute_unit_limit == 0 {
            bail!("protocol.compute_unit_limit must be non-zero");
        }

        Ok(Self {
            global: parse("global", &settings.global)?,
            fee_recipient: parse("fee_recipient", &settings.fee_recipient)?,
            program: parse("program", &settings.program)?,
            event_authority: parse("event_authority", &settings.event_authority)?,
            fee_collector: parse("fee_collector", &settings.fee_collector)?,
            fee_rate,
            compute_unit_limit: settings.compute_unit_limit,
        })
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            global: GLOBAL,
            fee_recipient: FEE_RECIPIENT,
            program: PUMP_FUN_PROGRAM,
            event_authority: PUMP_FUN_EVENT_AUTHORITY,
            fee_collector: FEE_COLLECTOR,
            fee_rate: Decimal::new(5, 3),
            compute_unit_limit: default_compute_unit_limit(),
        }
    }
}
