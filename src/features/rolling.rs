// Rolling time-series primitives: EMA, lags, velocity, streaks.
//
// Every function takes a slice of observations ordered oldest-first and
// already restricted to games strictly before the target week. Causality is
// the caller's responsibility (FeatureStore::history_before enforces it);
// nothing here ever looks at an index beyond the slice.

/// Smoothing factor for an EMA span: alpha = 2 / (span + 1).
pub fn alpha_for_span(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// Recursive exponential moving average over all given values.
///
/// Seeded with the first observation, then
/// `ema = alpha * x + (1 - alpha) * ema` for each subsequent one.
/// Returns `None` for an empty slice -- never a silent zero.
pub fn ema(values: &[f64], span: usize) -> Option<f64> {
    let alpha = alpha_for_span(span);
    let mut iter = values.iter();
    let mut acc = *iter.next()?;
    for &x in iter {
        acc = alpha * x + (1.0 - alpha) * acc;
    }
    Some(acc)
}

/// The value `n` games back from the most recent observation (lag 1 = the
/// most recent game).
pub fn lag(values: &[f64], n: usize) -> Option<f64> {
    if n == 0 || n > values.len() {
        return None;
    }
    Some(values[values.len() - n])
}

/// Plain rolling mean.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// First difference of the EMA across the two most recent periods:
/// the EMA including the latest game minus the EMA excluding it.
/// Zero when fewer than two observations exist (no trend measurable).
pub fn velocity(values: &[f64], span: usize) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let with_latest = ema(values, span).unwrap_or(0.0);
    let without_latest = ema(&values[..values.len() - 1], span).unwrap_or(0.0);
    with_latest - without_latest
}

/// Ratio of a short-span EMA to a long-span EMA. Above 1.0 means the player
/// is running hot. Returns 1.0 (neutral) when the long EMA is not positive.
pub fn streak_coefficient(values: &[f64], short_span: usize, long_span: usize) -> f64 {
    let (Some(short), Some(long)) = (ema(values, short_span), ema(values, long_span)) else {
        return 1.0;
    };
    if long > 0.0 {
        short / long
    } else {
        1.0
    }
}

/// Count of consecutive most-recent observations at or above the threshold.
pub fn streak_over(values: &[f64], threshold: f64) -> usize {
    values.iter().rev().take_while(|&&v| v >= threshold).count()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    // -- EMA --

    #[test]
    fn ema_single_value_is_that_value() {
        assert!(approx_eq(ema(&[12.5], 4).unwrap(), 12.5, 1e-12));
    }

    #[test]
    fn ema_empty_is_none() {
        assert!(ema(&[], 4).is_none());
    }

    #[test]
    fn ema_worked_example_span_4() {
        // span 4 -> alpha = 0.4. Recursive form over [10, 15, 20, 25]:
        //   10
        //   0.4*15 + 0.6*10    = 13
        //   0.4*20 + 0.6*13    = 15.8
        //   0.4*25 + 0.6*15.8  = 19.48
        let result = ema(&[10.0, 15.0, 20.0, 25.0], 4).unwrap();
        assert!(
            approx_eq(result, 19.48, 0.005),
            "EMA should be 19.48 to 2dp, got {result}"
        );
    }

    #[test]
    fn ema_weights_recent_games_more() {
        // Increasing series: EMA must sit above the plain mean.
        let values = [5.0, 10.0, 15.0, 20.0, 25.0];
        let e = ema(&values, 3).unwrap();
        let m = mean(&values).unwrap();
        assert!(e > m, "EMA {e} should exceed mean {m} on an uptrend");
    }

    #[test]
    fn alpha_span_4_is_0_4() {
        assert!(approx_eq(alpha_for_span(4), 0.4, 1e-12));
    }

    // -- Lag --

    #[test]
    fn lag_one_is_most_recent() {
        assert!(approx_eq(lag(&[1.0, 2.0, 3.0], 1).unwrap(), 3.0, 1e-12));
        assert!(approx_eq(lag(&[1.0, 2.0, 3.0], 2).unwrap(), 2.0, 1e-12));
    }

    #[test]
    fn lag_beyond_history_is_none() {
        assert!(lag(&[1.0], 2).is_none());
        assert!(lag(&[], 1).is_none());
        assert!(lag(&[1.0], 0).is_none());
    }

    // -- Velocity --

    #[test]
    fn velocity_positive_on_uptrend() {
        let v = velocity(&[10.0, 12.0, 14.0, 30.0], 4);
        assert!(v > 0.0, "uptrend should give positive velocity, got {v}");
    }

    #[test]
    fn velocity_negative_on_downtrend() {
        let v = velocity(&[30.0, 25.0, 20.0, 5.0], 4);
        assert!(v < 0.0, "downtrend should give negative velocity, got {v}");
    }

    #[test]
    fn velocity_is_ema_first_difference() {
        let values = [10.0, 15.0, 20.0, 25.0];
        let expected = ema(&values, 4).unwrap() - ema(&values[..3], 4).unwrap();
        assert!(approx_eq(velocity(&values, 4), expected, 1e-12));
    }

    #[test]
    fn velocity_needs_two_games() {
        assert!(approx_eq(velocity(&[10.0], 4), 0.0, 1e-12));
        assert!(approx_eq(velocity(&[], 4), 0.0, 1e-12));
    }

    // -- Streak coefficient --

    #[test]
    fn streak_coefficient_hot_player_above_one() {
        // Cold early, hot late: short EMA > long EMA.
        let values = [5.0, 5.0, 5.0, 5.0, 20.0, 22.0, 25.0];
        assert!(streak_coefficient(&values, 3, 8) > 1.0);
    }

    #[test]
    fn streak_coefficient_zero_long_ema_is_neutral() {
        let values = [0.0, 0.0, 0.0];
        assert!(approx_eq(streak_coefficient(&values, 3, 8), 1.0, 1e-12));
    }

    #[test]
    fn streak_coefficient_empty_is_neutral() {
        assert!(approx_eq(streak_coefficient(&[], 3, 8), 1.0, 1e-12));
    }

    // -- Streak over threshold --

    #[test]
    fn streak_counts_consecutive_recent_games() {
        // Last three games over 15, the one before under.
        assert_eq!(streak_over(&[20.0, 10.0, 16.0, 18.0, 22.0], 15.0), 3);
    }

    #[test]
    fn streak_broken_by_most_recent_game() {
        assert_eq!(streak_over(&[20.0, 25.0, 5.0], 15.0), 0);
    }

    #[test]
    fn streak_threshold_is_inclusive() {
        assert_eq!(streak_over(&[15.0], 15.0), 1);
    }

    #[test]
    fn streak_empty_history() {
        assert_eq!(streak_over(&[], 15.0), 0);
    }
}
