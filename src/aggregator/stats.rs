//! Inter-keystroke interval statistics.
//!
//! Pure functions over one aggregation window's interval log. Every
//! degenerate input (empty log, single sample, zero mean) maps to 0 rather
//! than an error so a quiet window still produces a well-formed sample.

/// Arithmetic mean of the intervals, or 0 for an empty log.
pub fn mean(intervals: &[f64]) -> f64 {
    if intervals.is_empty() {
        return 0.0;
    }
    intervals.iter().sum::<f64>() / intervals.len() as f64
}

/// Population variance around a precomputed `mean`.
///
/// Returns 0 when fewer than two samples are available.
pub fn variance(intervals: &[f64], mean: f64) -> f64 {
    if intervals.len() < 2 {
        return 0.0;
    }
    intervals.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / intervals.len() as f64
}

/// Coefficient of variation (`std / mean`) used as a typing-rhythm heuristic.
///
/// Formula: `sqrt(variance) / mean`, 0 when fewer than two samples or a zero mean.
pub fn burstiness(intervals: &[f64], mean: f64, variance: f64) -> f64 {
    if intervals.len() < 2 || mean == 0.0 {
        return 0.0;
    }
    variance.sqrt() / mean
}

/// Fraction of keystrokes that were backspaces, 0 when nothing was typed.
pub fn backspace_rate(backspaces: u64, total_keys: u64) -> f64 {
    if total_keys == 0 {
        return 0.0;
    }
    round_to(backspaces as f64 / total_keys as f64, 3)
}

/// Events per second over `elapsed_secs`, 0 for a non-positive window.
pub fn rate_per_sec(count: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        return 0.0;
    }
    count as f64 / elapsed_secs
}

/// Rounds half away from zero to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_empty_log_is_all_zero() {
        let m = mean(&[]);
        let v = variance(&[], m);
        assert_eq!(m, 0.0);
        assert_eq!(v, 0.0);
        assert_eq!(burstiness(&[], m, v), 0.0);
    }

    #[test]
    fn test_single_sample_has_no_spread() {
        let log = [250.0];
        let m = mean(&log);
        assert_eq!(m, 250.0);
        assert_eq!(variance(&log, m), 0.0);
        assert_eq!(burstiness(&log, m, 0.0), 0.0);
    }

    #[test]
    fn test_uneven_log() {
        let log = [100.0, 200.0, 300.0];
        let m = mean(&log);
        let v = variance(&log, m);

        assert!((m - 200.0).abs() < EPS);
        // ((-100)^2 + 0 + 100^2) / 3
        assert!((v - 20_000.0 / 3.0).abs() < EPS);
        assert!(v > 0.0);
        assert!((burstiness(&log, m, v) - v.sqrt() / m).abs() < EPS);
    }

    #[test]
    fn test_constant_log_has_zero_burstiness() {
        let log = [100.0; 9];
        let m = mean(&log);
        let v = variance(&log, m);
        assert_eq!(v, 0.0);
        assert_eq!(burstiness(&log, m, v), 0.0);
    }

    #[test]
    fn test_zero_mean_guard() {
        let log = [0.0, 0.0];
        assert_eq!(burstiness(&log, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_backspace_rate_bounds() {
        assert_eq!(backspace_rate(0, 0), 0.0);
        assert_eq!(backspace_rate(0, 10), 0.0);
        assert_eq!(backspace_rate(10, 10), 1.0);
        assert_eq!(backspace_rate(1, 3), 0.333);
        assert_eq!(backspace_rate(2, 3), 0.667);
    }

    #[test]
    fn test_rate_per_sec_guards_elapsed() {
        assert_eq!(rate_per_sec(5, 0.0), 0.0);
        assert_eq!(rate_per_sec(5, -1.0), 0.0);
        assert!((rate_per_sec(5, 2.5) - 2.0).abs() < EPS);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(1.2356, 3), 1.236);
        assert_eq!(round_to(99.999, 2), 100.0);
        assert_eq!(round_to(0.0, 3), 0.0);
    }
}
