// =============================================================================
// Screener Configuration: thresholds, universe and sizing
// =============================================================================
//
// Every tunable threshold of the scan lives here. A scan takes one
// `Arc<ScreenerConfig>` and hands the same instance to the gate and the
// scorer, so both always agree on the bands.
//
// All fields carry `#[serde(default)]` so that adding new fields never breaks
// loading an older config file, and unknown keys are ignored. The file is
// read once at startup; nothing writes it back.
// =============================================================================

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_vix_min() -> f64 {
    20.0
}

fn default_vix_max() -> f64 {
    35.0
}

fn default_rsi_oversold() -> f64 {
    35.0
}

fn default_rsi_signal() -> f64 {
    45.0
}

fn default_rsi_ceiling() -> f64 {
    60.0
}

fn default_adx_min() -> f64 {
    18.0
}

fn default_min_below_high_pct() -> f64 {
    20.0
}

fn default_max_below_high_pct() -> f64 {
    55.0
}

fn default_max_pe_ratio() -> f64 {
    30.0
}

fn default_min_roe() -> f64 {
    8.0
}

fn default_volume_surge_ratio() -> f64 {
    1.2
}

fn default_volume_spike_ratio() -> f64 {
    1.5
}

fn default_min_score() -> u32 {
    50
}

fn default_strong_score() -> u32 {
    75
}

fn default_indicator_period() -> usize {
    14
}

fn default_volume_avg_days() -> usize {
    50
}

fn default_request_delay_ms() -> u64 {
    100
}

fn default_dynamic_universe() -> bool {
    true
}

fn default_account_size() -> f64 {
    100_000.0
}

fn default_risk_per_trade_pct() -> f64 {
    1.0
}

fn default_stop_loss_pct() -> f64 {
    15.0
}

fn default_take_profit_pct() -> f64 {
    50.0
}

fn default_max_position_pct() -> f64 {
    15.0
}

pub fn default_tickers() -> Vec<String> {
    [
        "AAPL", "ABBV", "ABT", "ACN", "ADBE", "ADP", "AMAT", "AMD", "AMGN", "AMZN",
        "AVGO", "AXP", "BA", "BAC", "BK", "BKNG", "BLK", "BMY", "BRK-B", "C",
        "CAT", "CHTR", "CL", "CMCSA", "COF", "COP", "COST", "CRM", "CSCO", "CVS",
        "CVX", "DE", "DHR", "DIS", "DOW", "DUK", "EMR", "EXC", "F", "FDX",
        "GD", "GE", "GILD", "GM", "GOOG", "GOOGL", "GS", "HD", "HON", "IBM",
        "INTC", "INTU", "ISRG", "JNJ", "JPM", "KO", "LIN", "LLY", "LMT", "LOW",
        "MA", "MCD", "MDLZ", "MDT", "MET", "META", "MMM", "MO", "MRK", "MS",
        "MSFT", "NEE", "NFLX", "NKE", "NOW", "NVDA", "ORCL", "PEP", "PFE", "PG",
        "PM", "PYPL", "QCOM", "RTX", "SBUX", "SCHW", "SO", "SPG", "T", "TGT",
        "TMO", "TMUS", "TSLA", "TXN", "UNH", "UNP", "UPS", "USB", "V", "VZ",
        "WFC", "WMT", "XOM", "DHI", "LEN", "PHM", "TOL", "KBH", "NVR", "MTH",
        "MHO", "ALLY", "CFG", "RF", "FITB", "KEY", "ZION", "CMA", "WAL",
        "OXY", "DVN", "EOG", "FANG", "MPC", "VLO", "PSX", "HAL", "SLB", "BKR",
        "FCX", "NUE", "STLD", "CLF", "X", "AA", "RS", "CMC",
        "DECK", "CROX", "SKX", "UAA", "RL", "PVH", "TPR", "CPRI",
        "RCL", "CCL", "NCLH", "MAR", "HLT", "H", "WH",
    ]
    .iter()
    .map(|t| t.to_string())
    .collect()
}

/// Upper-case, trim and de-duplicate a ticker list, keeping first occurrence.
pub fn normalize_tickers<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    raw.into_iter()
        .map(|t| t.as_ref().trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

// =============================================================================
// PositionSizing
// =============================================================================

/// Parameters of the static position-sizing formula.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSizing {
    #[serde(default = "default_account_size")]
    pub account_size: f64,

    /// Capital put at risk per pick, in percent of the account.
    #[serde(default = "default_risk_per_trade_pct")]
    pub risk_per_trade_pct: f64,

    /// Stop distance below entry, in percent.
    #[serde(default = "default_stop_loss_pct")]
    pub stop_loss_pct: f64,

    /// Target distance above entry, in percent.
    #[serde(default = "default_take_profit_pct")]
    pub take_profit_pct: f64,

    /// Cap on a single position, in percent of the account.
    #[serde(default = "default_max_position_pct")]
    pub max_position_pct: f64,
}

impl Default for PositionSizing {
    fn default() -> Self {
        Self {
            account_size: default_account_size(),
            risk_per_trade_pct: default_risk_per_trade_pct(),
            stop_loss_pct: default_stop_loss_pct(),
            take_profit_pct: default_take_profit_pct(),
            max_position_pct: default_max_position_pct(),
        }
    }
}

// =============================================================================
// ScreenerConfig
// =============================================================================

/// Immutable threshold set for one scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerConfig {
    // --- Volatility band ----------------------------------------------------

    #[serde(default = "default_vix_min")]
    pub vix_min: f64,

    #[serde(default = "default_vix_max")]
    pub vix_max: f64,

    // --- Momentum & trend ---------------------------------------------------

    /// Lower RSI bound for both the gate and the "recovering" score band.
    #[serde(default = "default_rsi_oversold")]
    pub rsi_oversold: f64,

    /// "Recovering" band ends at `rsi_signal + 10`.
    #[serde(default = "default_rsi_signal")]
    pub rsi_signal: f64,

    /// Upper RSI bound of the gate (exclusive in the "bullish" score band).
    #[serde(default = "default_rsi_ceiling")]
    pub rsi_ceiling: f64,

    #[serde(default = "default_adx_min")]
    pub adx_min: f64,

    // --- Correction band (% below the 52-week high) -------------------------

    #[serde(default = "default_min_below_high_pct")]
    pub min_below_high_pct: f64,

    #[serde(default = "default_max_below_high_pct")]
    pub max_below_high_pct: f64,

    // --- Valuation ----------------------------------------------------------

    #[serde(default = "default_max_pe_ratio")]
    pub max_pe_ratio: f64,

    /// ROE floor in percent.
    #[serde(default = "default_min_roe")]
    pub min_roe: f64,

    // --- Volume -------------------------------------------------------------

    /// Ratio above which the volume factor scores.
    #[serde(default = "default_volume_surge_ratio")]
    pub volume_surge_ratio: f64,

    /// Ratio above which a pick is flagged as a volume spike.
    #[serde(default = "default_volume_spike_ratio")]
    pub volume_spike_ratio: f64,

    #[serde(default = "default_volume_avg_days")]
    pub volume_avg_days: usize,

    // --- Scoring ------------------------------------------------------------

    #[serde(default = "default_min_score")]
    pub min_score: u32,

    #[serde(default = "default_strong_score")]
    pub strong_score: u32,

    /// Look-back period for RSI and ADX.
    #[serde(default = "default_indicator_period")]
    pub indicator_period: usize,

    // --- Scan loop ----------------------------------------------------------

    /// Fallback universe, and the whole universe when the dynamic listing
    /// is off.
    #[serde(default = "default_tickers")]
    pub tickers: Vec<String>,

    /// Pull the universe from the exchange symbol directory at scan time.
    #[serde(default = "default_dynamic_universe")]
    pub dynamic_universe: bool,

    /// Pause between consecutive ticker fetches.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    #[serde(default)]
    pub position_sizing: PositionSizing,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            vix_min: default_vix_min(),
            vix_max: default_vix_max(),
            rsi_oversold: default_rsi_oversold(),
            rsi_signal: default_rsi_signal(),
            rsi_ceiling: default_rsi_ceiling(),
            adx_min: default_adx_min(),
            min_below_high_pct: default_min_below_high_pct(),
            max_below_high_pct: default_max_below_high_pct(),
            max_pe_ratio: default_max_pe_ratio(),
            min_roe: default_min_roe(),
            volume_surge_ratio: default_volume_surge_ratio(),
            volume_spike_ratio: default_volume_spike_ratio(),
            volume_avg_days: default_volume_avg_days(),
            min_score: default_min_score(),
            strong_score: default_strong_score(),
            indicator_period: default_indicator_period(),
            tickers: default_tickers(),
            dynamic_universe: default_dynamic_universe(),
            request_delay_ms: default_request_delay_ms(),
            position_sizing: PositionSizing::default(),
        }
    }
}

impl ScreenerConfig {
    /// Load configuration from a JSON file at `path` and validate it.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read screener config from {}", path.display()))?;

        let mut config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse screener config from {}", path.display()))?;
        config.tickers = normalize_tickers(&config.tickers);
        config.validate()?;

        info!(
            path = %path.display(),
            tickers = config.tickers.len(),
            vix_min = config.vix_min,
            vix_max = config.vix_max,
            "screener config loaded"
        );

        Ok(config)
    }

    /// Reject configurations whose bands are inverted or empty.
    pub fn validate(&self) -> Result<()> {
        if self.vix_min > self.vix_max {
            bail!("vix_min {} exceeds vix_max {}", self.vix_min, self.vix_max);
        }
        if self.rsi_oversold > self.rsi_ceiling {
            bail!(
                "rsi_oversold {} exceeds rsi_ceiling {}",
                self.rsi_oversold,
                self.rsi_ceiling
            );
        }
        if self.min_below_high_pct > self.max_below_high_pct {
            bail!(
                "min_below_high_pct {} exceeds max_below_high_pct {}",
                self.min_below_high_pct,
                self.max_below_high_pct
            );
        }
        if self.min_score > self.strong_score {
            bail!(
                "min_score {} exceeds strong_score {}",
                self.min_score,
                self.strong_score
            );
        }
        if self.indicator_period == 0 || self.volume_avg_days == 0 {
            bail!("indicator_period and volume_avg_days must be positive");
        }
        if self.position_sizing.stop_loss_pct <= 0.0 {
            bail!("stop_loss_pct must be positive");
        }
        Ok(())
    }

    /// Whether `vix` lies inside the buy zone (inclusive).
    pub fn vix_in_buy_zone(&self, vix: f64) -> bool {
        vix >= self.vix_min && vix <= self.vix_max
    }
}
