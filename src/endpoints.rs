//! HTTP endpoints
//!
//! Thin mapping from HTTP to the trade engine and the coin API. Trade
//! parameters are read from a JSON body and the query string, with the body
//! taking precedence field by field. A body or query string that does not
//! parse rejects the request; it is never skipped.

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, ConnectInfo, Path, Query, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};
use zeroize::Zeroizing;

use crate::analysis::analyze_coin;
use crate::coin_api::ReserveSource;
use crate::config::ServerConfig;
use crate::metrics::metrics;
use crate::security::validator;
use crate::trade_engine::{TradeEngine, TradeOrder};
use crate::tx_builder::TradeError;
use crate::types::{TradeDirection, TransactionMode};

/// Per-client-IP request limiter
pub type IpRateLimiter = DefaultKeyedRateLimiter<IpAddr>;

/// Build the per-IP limiter: `requests` per `window`, all usable as a burst
pub fn build_rate_limiter(config: &ServerConfig) -> anyhow::Result<IpRateLimiter> {
    let requests = NonZeroU32::new(config.rate_limit_requests)
        .ok_or_else(|| anyhow::anyhow!("server.rate_limit_requests must be positive"))?;
    let window = Duration::from_secs(config.rate_limit_window_secs.max(1));
    let quota = Quota::with_period(window / requests.get())
        .ok_or_else(|| anyhow::anyhow!("rate limit period rounds to zero"))?
        .allow_burst(requests);
    Ok(RateLimiter::keyed(quota))
}

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub engine: TradeEngine,
    pub coins: Arc<dyn ReserveSource>,
    pub limiter: Arc<IpRateLimiter>,
    pub metrics_enabled: bool,
}

/// Assemble the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ping", get(ping))
        .route("/buy", post(buy))
        .route("/sell", post(sell))
        .route("/coin/:mint_address", get(coin))
        .route("/analyze/:mint_address", get(analyze))
        .route("/metrics", get(metrics_text))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(middleware::map_response(security_headers))
        .with_state(state)
}

/// Hardening headers set on every response
const SECURITY_HEADERS: &[(&str, &str)] = &[
    (
        "content-security-policy",
        "default-src 'self';base-uri 'self';font-src 'self' https: data:;\
         form-action 'self';frame-ancestors 'self';img-src 'self' data:;\
         object-src 'none';script-src 'self';script-src-attr 'none';\
         style-src 'self' https: 'unsafe-inline';upgrade-insecure-requests",
    ),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("origin-agent-cluster", "?1"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=31536000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-download-options", "noopen"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-permitted-cross-domain-policies", "none"),
    ("x-xss-protection", "0"),
];

async fn security_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    for &(name, value) in SECURITY_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
    response
}

async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if state.limiter.check_key(&ip).is_err() {
        metrics().rate_limited_total.inc();
        debug!(client_ip = %ip, "Rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "success": false,
                "error": "Too many requests",
                "details": "Rate limit exceeded, please try again later",
            })),
        )
            .into_response();
    }

    next.run(request).await
}

async fn index() -> Json<Value> {
    Json(json!({
        "message": "Welcome to the Solana PumpFun API",
        "endpoints": {
            "/buy": "POST - Buy PumpFun tokens",
            "/sell": "POST - Sell PumpFun tokens",
            "/coin/:mintAddress": "GET - Fetch coin data for a specific mint address",
            "/analyze/:mintAddress": "GET - Analyze coin data for a specific mint address",
            "/ping": "GET - Liveness check",
            "/metrics": "GET - Prometheus metrics",
        }
    }))
}

async fn ping() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "pong" }))
}

async fn metrics_text(State(state): State<AppState>) -> Response {
    if !state.metrics_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }
    match metrics().render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Numeric parameter that may arrive as a JSON number or a string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumberParam {
    Unsigned(u64),
    Float(f64),
    Text(String),
}

impl NumberParam {
    fn as_f64(&self, name: &str) -> Result<f64, TradeError> {
        match self {
            Self::Unsigned(v) => Ok(*v as f64),
            Self::Float(v) => Ok(*v),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| TradeError::invalid_parameter(name, format!("not a number: {:?}", s))),
        }
    }

    fn as_u64(&self, name: &str) -> Result<u64, TradeError> {
        let whole = |v: f64| {
            if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 {
                Ok(v as u64)
            } else {
                Err(TradeError::invalid_parameter(
                    name,
                    format!("must be a whole number of token units, got {}", v),
                ))
            }
        };
        match self {
            Self::Unsigned(v) => Ok(*v),
            Self::Float(v) => whole(*v),
            Self::Text(s) => s.trim().parse::<u64>().or_else(|_| {
                s.trim()
                    .parse::<f64>()
                    .map_err(|_| {
                        TradeError::invalid_parameter(name, format!("not a number: {:?}", s))
                    })
                    .and_then(whole)
            }),
        }
    }
}

/// Trade parameters as accepted over HTTP
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeParams {
    pub private_key: Option<String>,
    pub mint_address: Option<String>,
    pub sol_in: Option<NumberParam>,
    pub token_balance: Option<NumberParam>,
    pub priority_fee_in_sol: Option<NumberParam>,
    pub slippage_decimal: Option<NumberParam>,
    pub simulate: Option<bool>,
}

impl TradeParams {
    /// Fill unset fields from `fallback`
    fn merge(self, fallback: TradeParams) -> Self {
        Self {
            private_key: self.private_key.or(fallback.private_key),
            mint_address: self.mint_address.or(fallback.mint_address),
            sol_in: self.sol_in.or(fallback.sol_in),
            token_balance: self.token_balance.or(fallback.token_balance),
            priority_fee_in_sol: self.priority_fee_in_sol.or(fallback.priority_fee_in_sol),
            slippage_decimal: self.slippage_decimal.or(fallback.slippage_decimal),
            simulate: self.simulate.or(fallback.simulate),
        }
    }

    fn mode(&self) -> TransactionMode {
        if self.simulate.unwrap_or(false) {
            TransactionMode::Simulation
        } else {
            TransactionMode::Execution
        }
    }

    /// Validate and convert into an engine order
    pub fn into_order(self, direction: TradeDirection) -> Result<TradeOrder, TradeError> {
        let private_key = self
            .private_key
            .map(Zeroizing::new)
            .ok_or_else(|| TradeError::invalid_parameter("privateKey", "is required"))?;
        let mint = self
            .mint_address
            .ok_or_else(|| TradeError::invalid_parameter("mintAddress", "is required"))?;

        let amount_in = match direction {
            TradeDirection::Buy => {
                let sol_in = self
                    .sol_in
                    .ok_or_else(|| TradeError::invalid_parameter("solIn", "is required"))?;
                validator::sol_to_lamports(sol_in.as_f64("solIn")?, "solIn")?
            }
            TradeDirection::Sell => self
                .token_balance
                .ok_or_else(|| TradeError::invalid_parameter("tokenBalance", "is required"))?
                .as_u64("tokenBalance")?,
        };

        let priority_fee_lamports = match self.priority_fee_in_sol {
            Some(fee) => validator::sol_to_lamports(fee.as_f64("priorityFeeInSol")?, "priorityFeeInSol")?,
            None => 0,
        };

        let slippage: Option<Decimal> = self
            .slippage_decimal
            .map(|s| {
                s.as_f64("slippageDecimal")
                    .and_then(validator::validate_slippage)
            })
            .transpose()?;

        Ok(TradeOrder {
            private_key,
            mint,
            amount_in,
            priority_fee_lamports,
            slippage,
        })
    }
}

async fn buy(
    State(state): State<AppState>,
    query: Result<Query<TradeParams>, QueryRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let params = read_params(query, &headers, &body);
    trade(state, TradeDirection::Buy, params).await
}

async fn sell(
    State(state): State<AppState>,
    query: Result<Query<TradeParams>, QueryRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let params = read_params(query, &headers, &body);
    trade(state, TradeDirection::Sell, params).await
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json"
                || (mime.starts_with("application/") && mime.ends_with("+json"))
        })
        .unwrap_or(false)
}

/// Merge the query string and the JSON body
///
/// An empty body means query-only parameters. A non-empty body must be JSON
/// that matches [`TradeParams`].
fn read_params(
    query: Result<Query<TradeParams>, QueryRejection>,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<TradeParams, TradeError> {
    let Query(query) =
        query.map_err(|e| TradeError::invalid_parameter("query", e.body_text()))?;
    if body.is_empty() {
        return Ok(query);
    }
    if !is_json_content_type(headers) {
        return Err(TradeError::invalid_parameter(
            "body",
            "expected `Content-Type: application/json`",
        ));
    }
    let Json(body) = Json::<TradeParams>::from_bytes(body)
        .map_err(|e| TradeError::invalid_parameter("body", e.body_text()))?;
    Ok(body.merge(query))
}

async fn trade(
    state: AppState,
    direction: TradeDirection,
    params: Result<TradeParams, TradeError>,
) -> Response {
    let result = match params.and_then(|params| {
        let mode = params.mode();
        params.into_order(direction).map(|order| (mode, order))
    }) {
        Ok((mode, order)) => match direction {
            TradeDirection::Buy => state.engine.buy(mode, order).await,
            TradeDirection::Sell => state.engine.sell(mode, order).await,
        },
        Err(e) => {
            metrics().record_error(direction, &e);
            Err(e)
        }
    };

    match result {
        Ok(outcome) => Json(json!({ "success": true, "result": outcome })).into_response(),
        Err(e) => {
            let status = if e.is_domain() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            let label = match direction {
                TradeDirection::Buy => "Buy operation failed",
                TradeDirection::Sell => "Sell operation failed",
            };
            (
                status,
                Json(json!({
                    "success": false,
                    "error": label,
                    "details": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

async fn coin(State(state): State<AppState>, Path(mint_address): Path<String>) -> Response {
    match state.coins.fetch_coin(&mint_address).await {
        Ok(coin) => Json(coin).into_response(),
        Err(TradeError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Coin data not found for the given mint address" })),
        )
            .into_response(),
        Err(e) => {
            warn!(mint = %mint_address, error = %e, "Coin lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to fetch coin data", "details": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn analyze(State(state): State<AppState>, Path(mint_address): Path<String>) -> Response {
    match state.coins.fetch_coin(&mint_address).await {
        Ok(coin) => Json(analyze_coin(&mint_address, &coin)).into_response(),
        Err(TradeError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Unable to analyze coin data for the given mint address" })),
        )
            .into_response(),
        Err(e) => {
            warn!(mint = %mint_address, error = %e, "Coin analysis failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to analyze coin data", "details": e.to_string() })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx_builder::TradeError;

    fn params(value: Value) -> TradeParams {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_buy_params_convert_sol_to_lamports() {
        let order = params(json!({
            "privateKey": "k",
            "mintAddress": "m",
            "solIn": 0.1,
            "priorityFeeInSol": "0.000005",
            "slippageDecimal": 0.1,
        }))
        .into_order(TradeDirection::Buy)
        .unwrap();

        assert_eq!(order.amount_in, 100_000_000);
        assert_eq!(order.priority_fee_lamports, 5_000);
        assert_eq!(order.slippage, Some(Decimal::new(1, 1)));
    }

    #[test]
    fn test_sell_params_accept_string_token_balance() {
        let order = params(json!({
            "privateKey": "k",
            "mintAddress": "m",
            "tokenBalance": "1000000000",
        }))
        .into_order(TradeDirection::Sell)
        .unwrap();

        assert_eq!(order.amount_in, 1_000_000_000);
        assert_eq!(order.priority_fee_lamports, 0);
        assert_eq!(order.slippage, None);
    }

    #[test]
    fn test_missing_and_invalid_params() {
        let missing = params(json!({ "privateKey": "k", "mintAddress": "m" }))
            .into_order(TradeDirection::Buy)
            .unwrap_err();
        assert!(matches!(missing, TradeError::InvalidParameter { ref name, .. } if name == "solIn"));

        let fractional = params(json!({
            "privateKey": "k", "mintAddress": "m", "tokenBalance": 1.5,
        }))
        .into_order(TradeDirection::Sell)
        .unwrap_err();
        assert!(matches!(fractional, TradeError::InvalidParameter { ref name, .. } if name == "tokenBalance"));

        let slippage = params(json!({
            "privateKey": "k", "mintAddress": "m", "solIn": 1, "slippageDecimal": 1.5,
        }))
        .into_order(TradeDirection::Buy)
        .unwrap_err();
        assert!(matches!(slippage, TradeError::InvalidParameter { ref name, .. } if name == "slippageDecimal"));
    }

    #[test]
    fn test_body_takes_precedence_over_query() {
        let body = params(json!({ "mintAddress": "from-body", "simulate": true }));
        let query = params(json!({ "mintAddress": "from-query", "privateKey": "k" }));
        let merged = body.merge(query);

        assert_eq!(merged.mint_address.as_deref(), Some("from-body"));
        assert_eq!(merged.private_key.as_deref(), Some("k"));
        assert_eq!(merged.mode(), TransactionMode::Simulation);
    }

    fn json_headers(content_type: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers
    }

    #[test]
    fn test_read_params_rejects_unparsable_body() {
        let query = Ok(Query(params(json!({ "privateKey": "k", "mintAddress": "m", "solIn": 1 }))));
        let body = Bytes::from_static(br#"{"slippageDecimal":0.01,"simulate":"true"}"#);

        let err = read_params(query, &json_headers("application/json"), &body)
            .err()
            .expect("type mismatch must reject");
        assert!(matches!(err, TradeError::InvalidParameter { ref name, .. } if name == "body"));
        assert!(err.is_domain());
    }

    #[test]
    fn test_read_params_empty_body_uses_query() {
        let query = Ok(Query(params(json!({ "mintAddress": "m", "simulate": true }))));
        let merged = read_params(query, &HeaderMap::new(), &Bytes::new()).unwrap();

        assert_eq!(merged.mint_address.as_deref(), Some("m"));
        assert_eq!(merged.mode(), TransactionMode::Simulation);
    }

    #[test]
    fn test_read_params_requires_json_content_type() {
        let body = Bytes::from_static(br#"{"simulate":true}"#);
        let err = read_params(Ok(Query(TradeParams::default())), &json_headers("text/plain"), &body)
            .err()
            .expect("non-JSON body must reject");
        assert!(matches!(err, TradeError::InvalidParameter { ref name, .. } if name == "body"));

        let merged = read_params(
            Ok(Query(TradeParams::default())),
            &json_headers("application/json; charset=utf-8"),
            &body,
        )
        .unwrap();
        assert_eq!(merged.mode(), TransactionMode::Simulation);
    }

    #[test]
    fn test_rate_limiter_allows_burst_then_rejects() {
        let config = ServerConfig {
            rate_limit_requests: 3,
            rate_limit_window_secs: 900,
            ..ServerConfig::default()
        };
        let limiter = build_rate_limiter(&config).unwrap();
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let other = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));

        for _ in 0..3 {
            assert!(limiter.check_key(&ip).is_ok());
        }
        assert!(limiter.check_key(&ip).is_err());
        assert!(limiter.check_key(&other).is_ok());
    }
}
