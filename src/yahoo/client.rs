// =============================================================================
// Yahoo Finance REST Client: public chart and quote endpoints
// =============================================================================
//
// No credentials are involved. Every request carries a browser-like
// User-Agent (the endpoints reject the default reqwest agent) and a 10 s
// timeout, which is the only timeout the scan has.
//
//   VIX      GET /v8/finance/chart/%5EVIX?interval=1d&range=5d
//   History  GET /v8/finance/chart/{ticker}?interval=1d&range=3mo
//   Quote    GET /v7/finance/quote?symbols={ticker}
// =============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::market_data::MarketDataGateway;
use crate::types::{PriceSeries, Quote};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const BROWSER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";
const VIX_SYMBOL: &str = "%5EVIX";
const HISTORY_RANGE: &str = "3mo";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

/// Yahoo pads non-trading slots with `null`.
#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteEnvelope {
    quote_response: QuoteBody,
}

#[derive(Debug, Deserialize)]
struct QuoteBody {
    #[serde(default)]
    result: Vec<RawQuote>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuote {
    regular_market_price: Option<f64>,
    fifty_two_week_high: Option<f64>,
    regular_market_volume: Option<f64>,
    #[serde(rename = "forwardPE")]
    forward_pe: Option<f64>,
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<f64>,
    /// Fraction: 0.12 means 12 %.
    return_on_equity: Option<f64>,
    /// Percent: 80.0 means a 0.8 ratio.
    debt_to_equity: Option<f64>,
    short_name: Option<String>,
    long_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn first_chart_quote(body: &str) -> Result<Option<ChartQuote>> {
    let envelope: ChartEnvelope =
        serde_json::from_str(body).context("failed to parse chart response")?;
    Ok(envelope
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .and_then(|r| r.indicators.quote.into_iter().next()))
}

/// Last non-null close of a chart response.
fn parse_last_close(body: &str) -> Result<Option<f64>> {
    Ok(first_chart_quote(body)?.and_then(|q| q.close.into_iter().flatten().last()))
}

/// Build a price series from a chart response.
///
/// A bar is kept only when close, high and low are all present so the
/// vectors stay aligned. A missing volume counts as zero.
fn parse_history(body: &str) -> Result<Option<PriceSeries>> {
    let Some(q) = first_chart_quote(body)? else {
        return Ok(None);
    };

    let mut series = PriceSeries::default();
    for i in 0..q.close.len() {
        let bar = (
            q.close[i],
            q.high.get(i).copied().flatten(),
            q.low.get(i).copied().flatten(),
        );
        if let (Some(close), Some(high), Some(low)) = bar {
            series.closes.push(close);
            series.highs.push(high);
            series.lows.push(low);
            series
                .volumes
                .push(q.volume.get(i).copied().flatten().unwrap_or(0.0));
        }
    }

    if series.is_empty() {
        return Ok(None);
    }
    Ok(Some(series))
}

fn nonzero(v: Option<f64>) -> Option<f64> {
    v.filter(|x| *x != 0.0 && x.is_finite())
}

/// Convert the first quote of a quote response into a [`Quote`].
///
/// Price and 52-week high are mandatory; fundamentals are optional.
fn parse_quote(body: &str) -> Result<Option<Quote>> {
    let envelope: QuoteEnvelope =
        serde_json::from_str(body).context("failed to parse quote response")?;
    let Some(raw) = envelope.quote_response.result.into_iter().next() else {
        return Ok(None);
    };

    let (Some(price), Some(high_52w)) = (raw.regular_market_price, raw.fifty_two_week_high)
    else {
        return Ok(None);
    };

    Ok(Some(Quote {
        price,
        high_52w,
        volume: raw.regular_market_volume.unwrap_or(0.0),
        pe: nonzero(raw.forward_pe).or(nonzero(raw.trailing_pe)),
        roe: nonzero(raw.return_on_equity).map(|r| r * 100.0),
        debt_equity: nonzero(raw.debt_to_equity).map(|d| d / 100.0),
        name: raw.short_name.or(raw.long_name),
    }))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct YahooClient {
    base_url: String,
    client: reqwest::Client,
}

impl YahooClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_AGENT));

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("failed to build reqwest client")?;

        let base_url = base_url.into();
        debug!(base_url = %base_url, "YahooClient initialised");

        Ok(Self { base_url, client })
    }

    /// GET `path` and return the body, failing on non-2xx status.
    async fn fetch(&self, path: &str) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {path} request failed"))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .with_context(|| format!("failed to read {path} response"))?;

        if !status.is_success() {
            anyhow::bail!("Yahoo GET {} returned {}: {}", path, status, body);
        }
        Ok(body)
    }
}

#[async_trait]
impl MarketDataGateway for YahooClient {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    #[instrument(skip(self), name = "yahoo::get_vix")]
    async fn get_vix(&self) -> Result<Option<f64>> {
        let body = self
            .fetch(&format!("/v8/finance/chart/{VIX_SYMBOL}?interval=1d&range=5d"))
            .await?;
        let vix = parse_last_close(&body)?;
        if vix.is_none() {
            warn!("VIX chart response contained no closes");
        }
        Ok(vix)
    }

    #[instrument(skip(self), name = "yahoo::get_history")]
    async fn get_history(&self, ticker: &str) -> Result<Option<PriceSeries>> {
        let body = self
            .fetch(&format!(
                "/v8/finance/chart/{ticker}?interval=1d&range={HISTORY_RANGE}"
            ))
            .await?;
        let series = parse_history(&body)?;
        debug!(ticker, bars = series.as_ref().map(|s| s.len()).unwrap_or(0), "history fetched");
        Ok(series)
    }

    #[instrument(skip(self), name = "yahoo::get_quote")]
    async fn get_quote(&self, ticker: &str) -> Result<Option<Quote>> {
        let body = self
            .fetch(&format!("/v7/finance/quote?symbols={ticker}"))
            .await?;
        parse_quote(&body)
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    const CHART: &str = r#"{
        "chart": {
            "result": [{
                "meta": { "symbol": "X" },
                "timestamp": [1, 2, 3, 4],
                "indicators": { "quote": [{
                    "close":  [10.0, null, 12.0, 13.0],
                    "high":   [10.5, 11.5, 12.5, null],
                    "low":    [9.5, 10.5, 11.5, 12.5],
                    "volume": [100, 200, null, 400]
                }]}
            }],
            "error": null
        }
    }"#;

    #[test]
    fn history_keeps_only_complete_bars() {
        let series = parse_history(CHART).unwrap().unwrap();
        assert_eq!(series.closes, vec![10.0, 12.0]);
        assert_eq!(series.highs, vec![10.5, 12.5]);
        assert_eq!(series.lows, vec![9.5, 11.5]);
        assert_eq!(series.volumes, vec![100.0, 0.0]);
    }

    #[test]
    fn last_close_skips_trailing_nulls() {
        let body = r#"{"chart":{"result":[{"indicators":{"quote":[{"close":[21.5,22.25,null]}]}}]}}"#;
        assert_eq!(parse_last_close(body).unwrap(), Some(22.25));
    }

    #[test]
    fn chart_without_result_is_none() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found"}}}"#;
        assert!(parse_history(body).unwrap().is_none());
        assert!(parse_last_close(body).unwrap().is_none());
    }

    #[test]
    fn malformed_chart_is_error() {
        assert!(parse_history("not json").is_err());
    }

    #[test]
    fn quote_converts_fundamentals() {
        let body = r#"{"quoteResponse":{"result":[{
            "regularMarketPrice": 70.0,
            "fiftyTwoWeekHigh": 100.0,
            "regularMarketVolume": 1500000,
            "forwardPE": 0,
            "trailingPE": 18.0,
            "returnOnEquity": 0.12,
            "debtToEquity": 80.0,
            "longName": "Example Corporation"
        }]}}"#;
        let q = parse_quote(body).unwrap().unwrap();
        assert_eq!(q.price, 70.0);
        assert_eq!(q.high_52w, 100.0);
        assert_eq!(q.volume, 1_500_000.0);
        assert_eq!(q.pe, Some(18.0));
        assert!((q.roe.unwrap() - 12.0).abs() < 1e-9);
        assert!((q.debt_equity.unwrap() - 0.8).abs() < 1e-9);
        assert_eq!(q.name.as_deref(), Some("Example Corporation"));
    }

    #[test]
    fn quote_without_price_is_none() {
        let body = r#"{"quoteResponse":{"result":[{"fiftyTwoWeekHigh": 100.0}]}}"#;
        assert!(parse_quote(body).unwrap().is_none());
        let empty = r#"{"quoteResponse":{"result":[]}}"#;
        assert!(parse_quote(empty).unwrap().is_none());
    }
}
