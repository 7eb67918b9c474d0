// =============================================================================
// Shared types used across the screener
// =============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Chronological daily OHLCV history for one ticker.
///
/// The four vectors are parallel; the gateway drops missing bars before
/// building the series, so they may be shorter than the requested window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub closes: Vec<f64>,
    pub highs: Vec<f64>,
    pub lows: Vec<f64>,
    pub volumes: Vec<f64>,
}

impl PriceSeries {
    /// Number of complete bars.
    pub fn len(&self) -> usize {
        self.closes
            .len()
            .min(self.highs.len())
            .min(self.lows.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Current quote plus fundamentals for one ticker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub price: f64,
    pub high_52w: f64,
    pub volume: f64,
    #[serde(default)]
    pub pe: Option<f64>,
    /// Return on equity in percent (12.0 means 12 %).
    #[serde(default)]
    pub roe: Option<f64>,
    /// Debt-to-equity as a plain ratio (0.8 means 80 %).
    #[serde(default)]
    pub debt_equity: Option<f64>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Per-ticker indicator snapshot, computed once per scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub ticker: String,
    pub price: f64,
    pub high_52w: f64,
    pub rsi: f64,
    pub adx: f64,
    pub volume: f64,
    pub avg_volume: f64,
    pub pe: Option<f64>,
    pub roe: Option<f64>,
    pub debt_equity: Option<f64>,
    pub name: Option<String>,
}

/// Discrete tier derived from the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalStrength {
    Strong,
    Medium,
    Weak,
}

impl std::fmt::Display for SignalStrength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strong => write!(f, "strong"),
            Self::Medium => write!(f, "medium"),
            Self::Weak => write!(f, "weak"),
        }
    }
}

/// Lifecycle status of a stored pick. The scanner only ever writes `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickStatus {
    Active,
    Closed,
    Expired,
}

impl Default for PickStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// Static position plan attached to every emitted candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionPlan {
    pub shares: u64,
    pub position_value: f64,
    pub stop_price: f64,
    pub target_price: f64,
}

/// A buy candidate that passed every gate. Never mutated once built; a
/// rescan of the same (ticker, pick_date) produces a replacement record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalCandidate {
    pub ticker: String,
    pub company_name: Option<String>,
    pub pick_date: NaiveDate,
    pub entry_price: f64,
    pub current_price: f64,
    pub rsi: f64,
    pub adx: f64,
    pub correction_pct: f64,
    pub volume_ratio: f64,
    pub volume_spike: bool,
    pub pe_ratio: Option<f64>,
    pub roe: Option<f64>,
    pub debt_equity: Option<f64>,
    pub status: PickStatus,
    pub signal_strength: SignalStrength,
    pub signal_score: u32,
    pub signal_factors: Vec<String>,
    pub notes: String,
    #[serde(flatten)]
    pub position: PositionPlan,
}

impl SignalCandidate {
    /// Conflict key used by every signal store.
    pub fn key(&self) -> (String, NaiveDate) {
        (self.ticker.clone(), self.pick_date)
    }
}

/// Final status of one scan invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanRunStatus {
    Success,
    Gated,
    Error,
}

/// Audit record written once per scan invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRun {
    pub id: uuid::Uuid,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub duration_secs: f64,
    pub vix: Option<f64>,
    pub tickers_scanned: usize,
    pub signals_found: usize,
    pub signals_persisted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub status: ScanRunStatus,
    pub error_message: Option<String>,
}
