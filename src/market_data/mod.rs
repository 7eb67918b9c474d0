// =============================================================================
// Market Data Gateway
// =============================================================================
//
// The scanner only needs three reads from a market data source. Any concrete
// source (Yahoo, a cache, a test fixture) plugs in behind this trait and is
// handed to the scanner as an `Arc<dyn MarketDataGateway>`.
//
// `Ok(None)` means "the source answered but has nothing for this ticker";
// `Err` means the request itself failed. The scanner treats both as a skip
// for tickers and as a fatal condition for the VIX reading.
// =============================================================================

pub mod throttle;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{PriceSeries, Quote};

pub use throttle::Throttle;

#[async_trait]
pub trait MarketDataGateway: Send + Sync {
    /// Short source name for logs.
    fn name(&self) -> &'static str;

    /// Latest volatility-index close.
    async fn get_vix(&self) -> Result<Option<f64>>;

    /// Daily OHLCV history window for `ticker`, oldest bar first.
    async fn get_history(&self, ticker: &str) -> Result<Option<PriceSeries>>;

    /// Current quote and fundamentals for `ticker`.
    async fn get_quote(&self, ticker: &str) -> Result<Option<Quote>>;
}
