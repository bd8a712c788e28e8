//! Metrics collection and export module

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use std::time::Instant;

use crate::tx_builder::TradeError;
use crate::types::TradeDirection;

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub trades_total: IntCounterVec,
    pub trade_errors_total: IntCounterVec,
    pub rate_limited_total: IntCounter,

    // Gauges
    pub active_trades: IntGauge,

    // Histograms
    pub trade_latency: Histogram,
    pub coin_api_latency: Histogram,
    pub rpc_latency: HistogramVec,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let trades_total = IntCounterVec::new(
            Opts::new("trades_total", "Trades handled, by direction and outcome"),
            &["direction", "outcome"],
        )?;

        let trade_errors_total = IntCounterVec::new(
            Opts::new("trade_errors_total", "Failed trades, by error category"),
            &["category"],
        )?;

        let rate_limited_total = IntCounter::with_opts(Opts::new(
            "rate_limited_total",
            "Requests rejected by the per-IP rate limiter",
        ))?;

        let active_trades = IntGauge::with_opts(Opts::new(
            "active_trades",
            "Number of trades currently in progress",
        ))?;

        let trade_latency = Histogram::with_opts(
            HistogramOpts::new("trade_latency_seconds", "End-to-end trade latency")
                .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        )?;

        let coin_api_latency = Histogram::with_opts(
            HistogramOpts::new("coin_api_latency_seconds", "Coin API request latency")
                .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]),
        )?;

        let rpc_latency = HistogramVec::new(
            HistogramOpts::new("rpc_latency_seconds", "RPC call latency")
                .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]),
            &["method"],
        )?;

        // Register all metrics
        registry.register(Box::new(trades_total.clone()))?;
        registry.register(Box::new(trade_errors_total.clone()))?;
        registry.register(Box::new(rate_limited_total.clone()))?;
        registry.register(Box::new(active_trades.clone()))?;
        registry.register(Box::new(trade_latency.clone()))?;
        registry.register(Box::new(coin_api_latency.clone()))?;
        registry.register(Box::new(rpc_latency.clone()))?;

        Ok(Self {
            registry,
            trades_total,
            trade_errors_total,
            rate_limited_total,
            active_trades,
            trade_latency,
            coin_api_latency,
            rpc_latency,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Count a finished trade
    pub fn record_trade(&self, direction: TradeDirection, outcome: &str) {
        let direction = direction.to_string();
        self.trades_total
            .with_label_values(&[direction.as_str(), outcome])
            .inc();
    }

    /// Count a failed trade under its error category
    pub fn record_error(&self, direction: TradeDirection, error: &TradeError) {
        self.record_trade(direction, "failed");
        self.trade_errors_total
            .with_label_values(&[error.category()])
            .inc();
    }

    /// Render the registry in the prometheus text exposition format
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.elapsed_secs());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_registered_series() {
        let metrics = Metrics::new().unwrap();
        metrics.record_trade(TradeDirection::Buy, "executed");
        metrics.record_error(TradeDirection::Sell, &TradeError::network("timeout"));
        metrics.coin_api_latency.observe(0.02);

        let text = metrics.render().unwrap();
        assert!(text.contains("trades_total{direction=\"buy\",outcome=\"executed\"} 1"));
        assert!(text.contains("trades_total{direction=\"sell\",outcome=\"failed\"} 1"));
        assert!(text.contains("trade_errors_total{category=\"network\"} 1"));
        assert!(text.contains("coin_api_latency_seconds_count 1"));
    }

    #[test]
    fn test_timer_measures_elapsed() {
        let timer = Timer::new();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(timer.elapsed_secs() >= 0.005);
        assert!(timer.elapsed_ms() >= 5);
    }
}
