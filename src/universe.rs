// =============================================================================
// Ticker Universe: dynamic listing with a static fallback
// =============================================================================
//
// At scan time the universe can be pulled from the Nasdaq Trader symbol
// directory (pipe-delimited, one security per line). Only common stocks are
// kept: no ETFs, no test issues, no NextShares, and plain symbols of at most
// five characters (warrants, units and preferreds carry `$ ^ . + -`).
//
// A listing that fails, or that yields fewer than `MIN_DYNAMIC_UNIVERSE`
// tickers, is not trusted; the configured list is scanned instead.
//
//   Directory  GET https://www.nasdaqtrader.com/dynamic/SymDir/nasdaqtraded.txt
// =============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, info, instrument, warn};

use crate::screener_config::normalize_tickers;

const DEFAULT_DIRECTORY_URL: &str =
    "https://www.nasdaqtrader.com/dynamic/SymDir/nasdaqtraded.txt";
const BROWSER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const MAX_SYMBOL_LEN: usize = 5;

/// A dynamic listing shorter than this falls back to the configured list.
pub const MIN_DYNAMIC_UNIVERSE: usize = 100;

#[async_trait]
pub trait UniverseSource: Send + Sync {
    /// Short source name for logs.
    fn name(&self) -> &'static str;

    /// Current ticker listing, in source order.
    async fn fetch_tickers(&self) -> Result<Vec<String>>;
}

/// Resolve the tickers for one scan.
///
/// Without a source, or when the source fails or returns too few tickers,
/// the normalised `fallback` list is used.
pub async fn resolve_universe(
    source: Option<&dyn UniverseSource>,
    fallback: &[String],
) -> Vec<String> {
    let Some(source) = source else {
        return normalize_tickers(fallback);
    };

    match source.fetch_tickers().await {
        Ok(fetched) => {
            let tickers = normalize_tickers(fetched);
            if tickers.len() >= MIN_DYNAMIC_UNIVERSE {
                info!(
                    source = source.name(),
                    tickers = tickers.len(),
                    "dynamic universe loaded"
                );
                return tickers;
            }
            warn!(
                source = source.name(),
                fetched = tickers.len(),
                required = MIN_DYNAMIC_UNIVERSE,
                "dynamic universe too small, using configured tickers"
            );
        }
        Err(e) => {
            warn!(
                source = source.name(),
                error = %e,
                "dynamic universe unavailable, using configured tickers"
            );
        }
    }
    normalize_tickers(fallback)
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn is_plain_symbol(symbol: &str) -> bool {
    !symbol.is_empty()
        && symbol.len() <= MAX_SYMBOL_LEN
        && symbol.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Extract common-stock symbols from a Nasdaq Trader directory file.
///
/// Works for both `nasdaqtraded.txt` (`Symbol`) and `otherlisted.txt`
/// (`ACT Symbol`). Flag columns that are absent are not filtered on.
fn parse_symbol_directory(body: &str) -> Vec<String> {
    let mut lines = body.lines();
    let Some(header) = lines.next() else {
        return Vec::new();
    };

    let columns: Vec<&str> = header.split('|').map(str::trim).collect();
    let column = |name: &str| columns.iter().position(|c| *c == name);

    let Some(symbol_col) = column("Symbol").or_else(|| column("ACT Symbol")) else {
        warn!("symbol directory header has no symbol column");
        return Vec::new();
    };
    let flag_cols: Vec<usize> = ["ETF", "Test Issue", "NextShares"]
        .iter()
        .filter_map(|name| column(name))
        .collect();

    lines
        .filter(|line| !line.starts_with("File Creation Time"))
        .filter_map(|line| {
            let fields: Vec<&str> = line.split('|').map(str::trim).collect();
            let all_no = flag_cols
                .iter()
                .all(|&i| fields.get(i).is_some_and(|v| *v == "N"));
            let symbol = fields.get(symbol_col)?;
            (all_no && is_plain_symbol(symbol)).then(|| symbol.to_string())
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct NasdaqDirectory {
    url: String,
    client: reqwest::Client,
}

impl NasdaqDirectory {
    pub fn new() -> Result<Self> {
        Self::with_url(DEFAULT_DIRECTORY_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_AGENT));

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("failed to build reqwest client")?;

        let url = url.into();
        debug!(url = %url, "NasdaqDirectory initialised");

        Ok(Self { url, client })
    }
}

#[async_trait]
impl UniverseSource for NasdaqDirectory {
    fn name(&self) -> &'static str {
        "nasdaq-directory"
    }

    #[instrument(skip(self), name = "nasdaq::fetch_tickers")]
    async fn fetch_tickers(&self) -> Result<Vec<String>> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("GET symbol directory request failed")?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .context("failed to read symbol directory response")?;

        if !status.is_success() {
            anyhow::bail!("symbol directory returned {}", status);
        }

        let tickers = parse_symbol_directory(&body);
        debug!(tickers = tickers.len(), "symbol directory parsed");
        Ok(tickers)
    }
}
