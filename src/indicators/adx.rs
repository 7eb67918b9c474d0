// =============================================================================
// Average Directional Index (ADX): single-window estimate
// =============================================================================
//
// ADX quantifies trend **strength** regardless of direction.
//
// Calculation, for each of the last `period` bars:
//   1. True Range  TR = max(high - low, |high - prev_close|, |low - prev_close|)
//   2. +DM = up-move   if up-move > down-move and up-move > 0, else 0
//      -DM = down-move if down-move > up-move and down-move > 0, else 0
//   3. +DI = +DM / TR * 100,  -DI = -DM / TR * 100
//   4. DX  = |+DI - -DI| / (+DI + -DI + 0.001) * 100
// ADX = sum(DX) / period. Bars with TR == 0 contribute nothing.
//
// There is no Wilder smoothing of DM/TR and the result is not strictly
// bounded to 100. Historical scores depend on this shape; keep it.
// =============================================================================

/// Guards the DX denominator when both DIs are zero.
const DX_EPSILON: f64 = 0.001;

/// Compute the simplified ADX over the last `period` bars.
///
/// Returns 0.0 (no trend) when `period == 0` or there are fewer than
/// `period + 1` highs. Lows and closes are expected to be the same length as
/// highs; a shorter slice is treated as insufficient history as well.
pub fn compute_adx(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> f64 {
    if period == 0 || highs.len() < period + 1 {
        return 0.0;
    }
    let n = highs.len();
    if lows.len() < n || closes.len() < n {
        return 0.0;
    }

    let mut sum_dx = 0.0;
    for i in n - period..n {
        let tr = (highs[i] - lows[i])
            .max((highs[i] - closes[i - 1]).abs())
            .max((lows[i] - closes[i - 1]).abs());

        let up_move = highs[i] - highs[i - 1];
        let down_move = lows[i - 1] - lows[i];

        let plus_dm = if up_move > down_move { up_move.max(0.0) } else { 0.0 };
        let minus_dm = if down_move > up_move { down_move.max(0.0) } else { 0.0 };

        if tr > 0.0 {
            let plus_di = plus_dm / tr * 100.0;
            let minus_di = minus_dm / tr * 100.0;
            sum_dx += (plus_di - minus_di).abs() / (plus_di + minus_di + DX_EPSILON) * 100.0;
        }
    }

    sum_dx / period as f64
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn trending(n: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let highs = (0..n).map(|i| 100.0 + i as f64 * 2.0 + 1.5).collect();
        let lows = (0..n).map(|i| 100.0 + i as f64 * 2.0 - 0.5).collect();
        let closes = (0..n).map(|i| 100.0 + i as f64 * 2.0 + 1.0).collect();
        (highs, lows, closes)
    }

    #[test]
    fn adx_period_zero() {
        let (h, l, c) = trending(30);
        assert_eq!(compute_adx(&h, &l, &c, 0), 0.0);
    }

    #[test]
    fn adx_insufficient_data() {
        let (h, l, c) = trending(14);
        assert_eq!(compute_adx(&h, &l, &c, 14), 0.0);

        let (h, l, c) = trending(5);
        assert_eq!(compute_adx(&h, &l, &c, 14), 0.0);
    }

    #[test]
    fn adx_exact_minimum_produces_value() {
        let (h, l, c) = trending(15);
        assert!(compute_adx(&h, &l, &c, 14) > 0.0);
    }

    #[test]
    fn adx_strong_uptrend_near_hundred() {
        // Every bar is a pure up-move: +DI > 0, -DI = 0 => DX just below 100.
        let (h, l, c) = trending(60);
        let adx = compute_adx(&h, &l, &c, 14);
        assert!(adx > 99.0 && adx < 100.0, "expected ADX just below 100, got {adx}");
    }

    #[test]
    fn adx_flat_market_is_zero() {
        let h = vec![101.0; 30];
        let l = vec![99.0; 30];
        let c = vec![100.0; 30];
        assert_eq!(compute_adx(&h, &l, &c, 14), 0.0);
    }

    #[test]
    fn adx_zero_range_bars_contribute_nothing() {
        let v = vec![100.0; 30];
        assert_eq!(compute_adx(&v, &v, &v, 14), 0.0);
    }

    #[test]
    fn adx_mismatched_lengths_are_insufficient() {
        let (h, l, c) = trending(30);
        assert_eq!(compute_adx(&h, &l[..10], &c, 14), 0.0);
    }

    #[test]
    fn adx_is_non_negative_on_choppy_data() {
        let highs: Vec<f64> = (0..100).map(|i| 51.0 + (i as f64 * 0.3).sin() * 10.0).collect();
        let lows: Vec<f64> = highs.iter().map(|h| h - 2.0).collect();
        let closes: Vec<f64> = highs.iter().map(|h| h - 0.5).collect();
        let adx = compute_adx(&highs, &lows, &closes, 14);
        assert!(adx >= 0.0, "ADX {adx} negative");
    }
}
