// =============================================================================
// Composite Scorer: fixed-weight contrarian score
// =============================================================================
//
// Each check is evaluated in a fixed order and appends a human-readable
// factor when it fires. The factor list is persisted with the pick, so the
// order below is part of the output.
//
//   VIX in buy zone                          25
//   RSI recovering  [oversold, signal+10]    25
//     else RSI bullish (signal+10, ceiling)  15
//   ADX >= adx_min                           15
//   correction inside band                   20
//   volume ratio > surge ratio               10
//   0 < P/E <= max_pe                         8
//   ROE >= min_roe                            7
//
// The sum is capped at 100.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::indicators::{correction_pct, volume_ratio};
use crate::screener_config::ScreenerConfig;
use crate::types::StockSnapshot;

pub const VIX_POINTS: u32 = 25;
pub const RSI_RECOVERING_POINTS: u32 = 25;
pub const RSI_BULLISH_POINTS: u32 = 15;
pub const ADX_POINTS: u32 = 15;
pub const CORRECTION_POINTS: u32 = 20;
pub const VOLUME_POINTS: u32 = 10;
pub const PE_POINTS: u32 = 8;
pub const ROE_POINTS: u32 = 7;

pub const MAX_SCORE: u32 = 100;

/// Result of scoring one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub score: u32,
    pub factors: Vec<String>,
}

/// Inclusive band check. NaN never lies inside a band.
pub(crate) fn within(value: f64, low: f64, high: f64) -> bool {
    value >= low && value <= high
}

/// Score `stock` against the shared `vix` reading.
pub fn score(stock: &StockSnapshot, vix: f64, config: &ScreenerConfig) -> ScoreCard {
    let mut total = 0;
    let mut factors = Vec::new();

    if config.vix_in_buy_zone(vix) {
        total += VIX_POINTS;
        factors.push(format!("VIX {vix:.1} in buy zone"));
    }

    let recovering_top = config.rsi_signal + 10.0;
    if within(stock.rsi, config.rsi_oversold, recovering_top) {
        total += RSI_RECOVERING_POINTS;
        factors.push(format!("RSI {:.0} recovering", stock.rsi));
    } else if stock.rsi > recovering_top && stock.rsi < config.rsi_ceiling {
        total += RSI_BULLISH_POINTS;
        factors.push(format!("RSI {:.0} bullish", stock.rsi));
    }

    if stock.adx >= config.adx_min {
        total += ADX_POINTS;
        factors.push(format!("ADX {:.0} trending", stock.adx));
    }

    let correction = correction_pct(stock.price, stock.high_52w);
    if within(correction, config.min_below_high_pct, config.max_below_high_pct) {
        total += CORRECTION_POINTS;
        factors.push(format!("{correction:.0}% off highs"));
    }

    let ratio = volume_ratio(stock.volume, stock.avg_volume);
    if ratio > config.volume_surge_ratio {
        total += VOLUME_POINTS;
        factors.push(format!("Volume {ratio:.1}x avg"));
    }

    if let Some(pe) = stock.pe.filter(|pe| *pe > 0.0 && *pe <= config.max_pe_ratio) {
        total += PE_POINTS;
        factors.push(format!("P/E {pe:.1}"));
    }

    if let Some(roe) = stock.roe.filter(|roe| *roe >= config.min_roe) {
        total += ROE_POINTS;
        factors.push(format!("ROE {roe:.1}%"));
    }

    ScoreCard {
        score: total.min(MAX_SCORE),
        factors,
    }
}
