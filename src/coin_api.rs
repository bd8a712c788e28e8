//! pump.fun frontend API client
//!
//! Fetches bonding-curve reserve snapshots and raw coin metadata. Every
//! call goes straight to the API; nothing is cached, so a trade always
//! prices against the freshest reserves the API reports.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::CoinApiConfig;
use crate::metrics::{metrics, Timer};
use crate::tx_builder::TradeError;
use crate::types::ReserveState;

/// Source of bonding-curve reserve snapshots and coin metadata
#[async_trait]
pub trait ReserveSource: Send + Sync {
    /// Current reserves and curve accounts for `mint`
    async fn fetch_reserves(&self, mint: &str) -> Result<ReserveState, TradeError>;

    /// Raw metadata document for `mint`
    async fn fetch_coin(&self, mint: &str) -> Result<Value, TradeError>;
}

/// HTTP client for the pump.fun frontend API
#[derive(Debug, Clone)]
pub struct CoinApiClient {
    http: Client,
    base_url: String,
}

impl CoinApiClient {
    /// Build a client from config
    ///
    /// The API sits behind a CDN that rejects obvious bots, so requests
    /// carry the header set of a desktop browser.
    pub fn new(config: &CoinApiConfig) -> Result<Self, TradeError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("*/*"));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header::HeaderValue::from_static("en-US,en;q=0.5"),
        );
        headers.insert(
            header::REFERER,
            header::HeaderValue::from_static("https://www.pump.fun/"),
        );
        headers.insert(
            header::ORIGIN,
            header::HeaderValue::from_static("https://www.pump.fun"),
        );
        headers.insert("sec-fetch-dest", header::HeaderValue::from_static("empty"));
        headers.insert("sec-fetch-mode", header::HeaderValue::from_static("cors"));
        headers.insert(
            "sec-fetch-site",
            header::HeaderValue::from_static("cross-site"),
        );

        let http = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TradeError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn coin_url(&self, mint: &str) -> String {
        format!("{}/coins/{}", self.base_url, mint)
    }

    async fn get_coin(&self, mint: &str) -> Result<Value, TradeError> {
        let timer = Timer::new();
        let result = self.request_coin(mint).await;
        timer.observe_duration(&metrics().coin_api_latency);

        match &result {
            Ok(_) => debug!(mint = %mint, latency_ms = timer.elapsed_ms(), "Fetched coin data"),
            Err(e) => warn!(mint = %mint, error = %e, "Coin data fetch failed"),
        }
        result
    }

    async fn request_coin(&self, mint: &str) -> Result<Value, TradeError> {
        let response = self
            .http
            .get(self.coin_url(mint))
            .send()
            .await
            .map_err(|e| TradeError::network(format!("coin API request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TradeError::not_found(format!("coin data for {}", mint)));
        }
        if !status.is_success() {
            return Err(TradeError::network(format!(
                "coin API returned HTTP {}",
                status.as_u16()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TradeError::network(format!("undecodable coin API response: {}", e)))?;

        if body.is_null() {
            return Err(TradeError::not_found(format!("coin data for {}", mint)));
        }
        Ok(body)
    }
}

#[async_trait]
impl ReserveSource for CoinApiClient {
    async fn fetch_reserves(&self, mint: &str) -> Result<ReserveState, TradeError> {
        let coin = self.get_coin(mint).await?;
        parse_reserves(mint, &coin)
    }

    async fn fetch_coin(&self, mint: &str) -> Result<Value, TradeError> {
        self.get_coin(mint).await
    }
}

/// Extract a reserve snapshot from a coin metadata document
///
/// Missing or unreadable figures are `NotFound`; zero reserves pass through
/// untouched so the quote engine can reject them as `InvalidReserves`.
pub fn parse_reserves(mint: &str, coin: &Value) -> Result<ReserveState, TradeError> {
    let virtual_token_reserves = read_u64(coin, "virtual_token_reserves")
        .ok_or_else(|| TradeError::not_found(format!("virtual_token_reserves for {}", mint)))?;
    let virtual_sol_reserves = read_u64(coin, "virtual_sol_reserves")
        .ok_or_else(|| TradeError::not_found(format!("virtual_sol_reserves for {}", mint)))?;
    let bonding_curve = read_pubkey(coin, "bonding_curve")
        .ok_or_else(|| TradeError::not_found(format!("bonding_curve for {}", mint)))?;
    let associated_bonding_curve = read_pubkey(coin, "associated_bonding_curve").ok_or_else(
        || TradeError::not_found(format!("associated_bonding_curve for {}", mint)),
    )?;

    Ok(ReserveState {
        virtual_token_reserves,
        virtual_sol_reserves,
        bonding_curve,
        associated_bonding_curve,
    })
}

fn read_u64(coin: &Value, field: &str) -> Option<u64> {
    match coin.get(field)? {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn read_pubkey(coin: &Value, field: &str) -> Option<Pubkey> {
    coin.get(field)?
        .as_str()
        .and_then(|s| Pubkey::from_str(s).ok())
}
