// =============================================================================
// Relative Strength Index (RSI): windowed average
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes.
//
// Step 1. Take the last `period` deltas from consecutive closes.
// Step 2. avg_gain = sum(gains) / period
//          avg_loss = sum(losses) / period
// Step 3. RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// Only the most recent window is used; there is no recursive smoothing over
// the whole history. Stored picks were scored with this exact shape, so it
// must stay this way.
// =============================================================================

/// Neutral value returned when there is not enough history.
pub const NEUTRAL_RSI: f64 = 50.0;

/// Compute RSI over the last `period` deltas of `closes`.
///
/// # Edge cases
/// - `period == 0` or `closes.len() < period + 1` => 50.0 (neutral).
/// - Average loss exactly zero => 100.0.
pub fn compute_rsi(closes: &[f64], period: usize) -> f64 {
    if period == 0 || closes.len() < period + 1 {
        return NEUTRAL_RSI;
    }

    let window = &closes[closes.len() - period - 1..];
    let (gains, losses) = window.windows(2).fold((0.0_f64, 0.0_f64), |(g, l), w| {
        let change = w[1] - w[0];
        if change > 0.0 {
            (g + change, l)
        } else {
            (g, l - change)
        }
    });

    let period_f = period as f64;
    let avg_gain = gains / period_f;
    let avg_loss = losses / period_f;

    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_empty_input_is_neutral() {
        assert_eq!(compute_rsi(&[], 14), NEUTRAL_RSI);
    }

    #[test]
    fn rsi_period_zero_is_neutral() {
        assert_eq!(compute_rsi(&[1.0, 2.0, 3.0], 0), NEUTRAL_RSI);
    }

    #[test]
    fn rsi_insufficient_data() {
        // 14 closes => 13 deltas < 14.
        let closes: Vec<f64> = (1..=14).map(|x| x as f64).collect();
        assert_eq!(compute_rsi(&closes, 14), NEUTRAL_RSI);

        let five = [10.0, 11.0, 9.0, 12.0, 8.0];
        assert_eq!(compute_rsi(&five, 14), NEUTRAL_RSI);
    }

    #[test]
    fn rsi_all_gains() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        assert_eq!(compute_rsi(&closes, 14), 100.0);
    }

    #[test]
    fn rsi_flat_market_has_no_losses() {
        // No movement at all: average loss is exactly zero.
        let closes = vec![100.0; 30];
        assert_eq!(compute_rsi(&closes, 14), 100.0);
    }

    #[test]
    fn rsi_all_losses() {
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        assert!(compute_rsi(&closes, 14).abs() < 1e-10);
    }

    #[test]
    fn rsi_uses_only_last_window() {
        // A crash far in the past must not affect the reading.
        let mut closes = vec![100.0, 10.0];
        closes.extend((0..15).map(|i| 10.0 + i as f64));
        assert_eq!(compute_rsi(&closes, 14), 100.0);
    }

    #[test]
    fn rsi_balanced_moves() {
        // Alternating +1 / -1 over an even window => equal gain and loss.
        let closes: Vec<f64> = (0..15).map(|i| if i % 2 == 0 { 10.0 } else { 11.0 }).collect();
        let rsi = compute_rsi(&closes, 14);
        assert!((rsi - 50.0).abs() < 1e-10, "expected 50, got {rsi}");
    }

    #[test]
    fn rsi_range_check() {
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        let rsi = compute_rsi(&closes, 14);
        assert!((0.0..=100.0).contains(&rsi), "RSI {rsi} out of range");
    }
}
