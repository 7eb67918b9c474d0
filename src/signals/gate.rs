// =============================================================================
// Entry Gate & Strength Classifier
// =============================================================================
//
// Hard filters run before scoring; any violation excludes the ticker from
// the batch without raising an error. The score floor is applied after
// scoring. Returns `None` when the ticker passes, `Some(rejection)`
// otherwise.
//
//   RSI        must be inside [rsi_oversold, rsi_ceiling]
//   ADX        must be >= adx_min
//   Correction must be inside [min_below_high_pct, max_below_high_pct]
//   Score      must be >= min_score
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::score::within;
use crate::screener_config::ScreenerConfig;
use crate::types::{SignalStrength, StockSnapshot};

/// Why a ticker was kept out of the batch by the gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "gate", rename_all = "snake_case")]
pub enum GateRejection {
    RsiOutOfBand { rsi: f64 },
    AdxTooWeak { adx: f64 },
    CorrectionOutOfBand { correction_pct: f64 },
    ScoreTooLow { score: u32 },
}

impl std::fmt::Display for GateRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RsiOutOfBand { rsi } => write!(f, "RSI {rsi:.1} outside entry band"),
            Self::AdxTooWeak { adx } => write!(f, "ADX {adx:.1} below trend minimum"),
            Self::CorrectionOutOfBand { correction_pct } => {
                write!(f, "correction {correction_pct:.1}% outside band")
            }
            Self::ScoreTooLow { score } => write!(f, "score {score} below floor"),
        }
    }
}

/// Apply the pre-scoring entry filters.
pub fn check_entry(
    stock: &StockSnapshot,
    correction_pct: f64,
    config: &ScreenerConfig,
) -> Option<GateRejection> {
    if !within(stock.rsi, config.rsi_oversold, config.rsi_ceiling) {
        return Some(GateRejection::RsiOutOfBand { rsi: stock.rsi });
    }

    // Written as a negated `>=` so that NaN is rejected too.
    if !(stock.adx >= config.adx_min) {
        return Some(GateRejection::AdxTooWeak { adx: stock.adx });
    }

    if !within(
        correction_pct,
        config.min_below_high_pct,
        config.max_below_high_pct,
    ) {
        return Some(GateRejection::CorrectionOutOfBand { correction_pct });
    }

    debug!(
        ticker = %stock.ticker,
        rsi = stock.rsi,
        adx = stock.adx,
        correction_pct,
        "entry gate passed"
    );
    None
}

/// Apply the post-scoring floor.
pub fn check_score(score: u32, config: &ScreenerConfig) -> Option<GateRejection> {
    if score < config.min_score {
        return Some(GateRejection::ScoreTooLow { score });
    }
    None
}

/// Map a composite score onto a strength tier. Total over every score.
pub fn classify(score: u32, config: &ScreenerConfig) -> SignalStrength {
    if score >= config.strong_score {
        SignalStrength::Strong
    } else if score >= config.min_score {
        SignalStrength::Medium
    } else {
        SignalStrength::Weak
    }
}
