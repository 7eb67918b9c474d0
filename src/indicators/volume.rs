// =============================================================================
// Correction depth and volume participation
// =============================================================================

/// Percentage decline of `price` from its 52-week high.
///
/// Not clamped: a price above the high yields a negative value and a zero
/// high yields a non-finite one. Both fall outside any configured band and
/// are rejected by the entry gate.
pub fn correction_pct(price: f64, high_52w: f64) -> f64 {
    (high_52w - price) / high_52w * 100.0
}

/// Mean of the last `window` volumes, or of every available volume when the
/// history is shorter. Empty input yields 0.0.
pub fn average_volume(volumes: &[f64], window: usize) -> f64 {
    let start = volumes.len().saturating_sub(window);
    let tail = &volumes[start..];
    if tail.is_empty() {
        return 0.0;
    }
    tail.iter().sum::<f64>() / tail.len() as f64
}

/// Current volume relative to its average. A non-positive average means no
/// usable baseline and reports 0.0 (never a surge).
pub fn volume_ratio(volume: f64, avg_volume: f64) -> f64 {
    if avg_volume <= 0.0 {
        return 0.0;
    }
    volume / avg_volume
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correction_thirty_percent() {
        assert!((correction_pct(70.0, 100.0) - 30.0).abs() < 1e-10);
    }

    #[test]
    fn correction_negative_above_high() {
        assert!(correction_pct(110.0, 100.0) < 0.0);
    }

    #[test]
    fn correction_zero_high_is_not_finite() {
        assert!(!correction_pct(10.0, 0.0).is_finite());
    }

    #[test]
    fn average_uses_last_window() {
        let mut volumes = vec![1_000_000.0; 10];
        volumes.extend(vec![100.0; 50]);
        assert!((average_volume(&volumes, 50) - 100.0).abs() < 1e-10);
    }

    #[test]
    fn average_short_history_uses_all() {
        assert!((average_volume(&[100.0, 200.0, 300.0], 50) - 200.0).abs() < 1e-10);
    }

    #[test]
    fn average_empty_is_zero() {
        assert_eq!(average_volume(&[], 50), 0.0);
    }

    #[test]
    fn ratio_basic_and_zero_baseline() {
        assert!((volume_ratio(150.0, 100.0) - 1.5).abs() < 1e-10);
        assert_eq!(volume_ratio(150.0, 0.0), 0.0);
    }
}
