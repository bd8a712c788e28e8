//! Coin metadata analysis
//!
//! Heuristic scores over the coin API's 24h market figures. Unlike the quote
//! engine, this is lenient: a missing or non-numeric figure is
//! read as zero, and a non-positive market cap yields a zero liquidity score.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Daily volume, as a fraction of market cap, that scores full liquidity
const FULL_LIQUIDITY_RATIO: f64 = 0.2;

/// Absolute 24h price change, in percent, that scores full volatility
const FULL_VOLATILITY_PCT: f64 = 20.0;

/// Benchmark daily volume as a fraction of market cap
const BENCHMARK_VOLUME_RATIO: f64 = 0.1;

/// Analysis returned by `GET /analyze/:mintAddress`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinAnalysis {
    pub mint_address: String,
    pub total_supply: Option<f64>,
    pub price_change_24h: Option<f64>,
    pub volume_24h: Option<f64>,
    pub market_cap: Option<f64>,

    /// 0-100, daily volume relative to market cap
    pub liquidity_score: u8,

    /// 0-100, magnitude of the 24h price change
    pub volatility_score: u8,

    pub trend_indicator: Trend,
}

/// Trend label derived from price change and volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    #[serde(rename = "Strongly Bullish")]
    StronglyBullish,
    Bullish,
    Neutral,
    Bearish,
    #[serde(rename = "Strongly Bearish")]
    StronglyBearish,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::StronglyBullish => "Strongly Bullish",
            Self::Bullish => "Bullish",
            Self::Neutral => "Neutral",
            Self::Bearish => "Bearish",
            Self::StronglyBearish => "Strongly Bearish",
        };
        f.write_str(label)
    }
}

/// Analyze a raw coin metadata document
pub fn analyze_coin(mint_address: &str, coin: &Value) -> CoinAnalysis {
    let total_supply = read_f64(coin, "total_supply");
    let price_change_24h = read_f64(coin, "price_change_24h");
    let volume_24h = read_f64(coin, "volume_24h");
    let market_cap = read_f64(coin, "market_cap");

    let price_change = price_change_24h.unwrap_or(0.0);
    let volume = volume_24h.unwrap_or(0.0);
    let cap = market_cap.unwrap_or(0.0);

    CoinAnalysis {
        mint_address: mint_address.to_string(),
        total_supply,
        price_change_24h,
        volume_24h,
        market_cap,
        liquidity_score: liquidity_score(volume, cap),
        volatility_score: volatility_score(price_change),
        trend_indicator: determine_trend(price_change, volume, cap),
    }
}

/// `round(min((volume / market_cap) / 0.2, 1) * 100)`
pub fn liquidity_score(volume_24h: f64, market_cap: f64) -> u8 {
    if market_cap <= 0.0 {
        return 0;
    }
    to_score((volume_24h / market_cap) / FULL_LIQUIDITY_RATIO)
}

/// `round(min(|price_change| / 20, 1) * 100)`
pub fn volatility_score(price_change_24h: f64) -> u8 {
    to_score(price_change_24h.abs() / FULL_VOLATILITY_PCT)
}

/// Classify the 24h move; stronger labels need above-benchmark volume
pub fn determine_trend(price_change_24h: f64, volume_24h: f64, market_cap: f64) -> Trend {
    let high_volume = volume_24h > market_cap * BENCHMARK_VOLUME_RATIO;

    if price_change_24h > 5.0 && high_volume {
        Trend::StronglyBullish
    } else if price_change_24h > 2.0 || (price_change_24h > 0.0 && high_volume) {
        Trend::Bullish
    } else if price_change_24h < -5.0 && high_volume {
        Trend::StronglyBearish
    } else if price_change_24h < -2.0 || (price_change_24h < 0.0 && high_volume) {
        Trend::Bearish
    } else {
        Trend::Neutral
    }
}

fn to_score(ratio: f64) -> u8 {
    if !ratio.is_finite() || ratio <= 0.0 {
        return 0;
    }
    (ratio.min(1.0) * 100.0).round() as u8
}

fn read_f64(coin: &Value, field: &str) -> Option<f64> {
    match coin.get(field)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|v: &f64| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_liquidity_score() {
        assert_eq!(liquidity_score(10_000.0, 100_000.0), 50);
        assert_eq!(liquidity_score(50_000.0, 100_000.0), 100);
        assert_eq!(liquidity_score(0.0, 100_000.0), 0);
        assert_eq!(liquidity_score(10_000.0, 0.0), 0);
        assert_eq!(liquidity_score(10_000.0, -5.0), 0);
    }

    #[test]
    fn test_volatility_score() {
        assert_eq!(volatility_score(0.0), 0);
        assert_eq!(volatility_score(-10.0), 50);
        assert_eq!(volatility_score(3.0), 15);
        assert_eq!(volatility_score(45.0), 100);
    }

    #[test]
    fn test_trend_classification() {
        // benchmark volume is 10_000 for a 100_000 cap
        assert_eq!(determine_trend(6.0, 20_000.0, 100_000.0), Trend::StronglyBullish);
        assert_eq!(determine_trend(6.0, 5_000.0, 100_000.0), Trend::Bullish);
        assert_eq!(determine_trend(1.0, 20_000.0, 100_000.0), Trend::Bullish);
        assert_eq!(determine_trend(1.0, 5_000.0, 100_000.0), Trend::Neutral);
        assert_eq!(determine_trend(-6.0, 20_000.0, 100_000.0), Trend::StronglyBearish);
        assert_eq!(determine_trend(-3.0, 5_000.0, 100_000.0), Trend::Bearish);
        assert_eq!(determine_trend(-1.0, 20_000.0, 100_000.0), Trend::Bearish);
        assert_eq!(determine_trend(0.0, 20_000.0, 100_000.0), Trend::Neutral);
    }

    #[test]
    fn test_analyze_coin_serializes_camel_case() {
        let coin = json!({
            "total_supply": 1_000_000_000,
            "price_change_24h": 7.5,
            "volume_24h": 30_000,
            "market_cap": 100_000,
        });

        let analysis = analyze_coin("MintA", &coin);
        let value = serde_json::to_value(&analysis).unwrap();

        assert_eq!(value["mintAddress"], "MintA");
        assert_eq!(value["liquidityScore"], 100);
        assert_eq!(value["volatilityScore"], 38);
        assert_eq!(value["trendIndicator"], "Strongly Bullish");
        assert_eq!(value["priceChange24h"], 7.5);
    }

    #[test]
    fn test_analyze_coin_missing_fields() {
        let analysis = analyze_coin("MintB", &json!({ "name": "no market data" }));

        assert_eq!(analysis.total_supply, None);
        assert_eq!(analysis.liquidity_score, 0);
        assert_eq!(analysis.volatility_score, 0);
        assert_eq!(analysis.trend_indicator, Trend::Neutral);
    }
}
