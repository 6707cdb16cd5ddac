//! Rolling window statistics

/// Rolling mean over a fixed window; output has `len - window + 1` entries
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || values.len() < window {
        return Vec::new();
    }
    values
        .windows(window)
        .map(|slice| slice.iter().sum::<f64>() / window as f64)
        .collect()
}

/// Rolling sample standard deviation (n-1 denominator) over a fixed window
pub fn rolling_sample_std(values: &[f64], window: usize) -> Vec<f64> {
    if window < 2 || values.len() < window {
        return Vec::new();
    }
    values
        .windows(window)
        .map(|slice| {
            let mean = slice.iter().sum::<f64>() / window as f64;
            let variance = slice
                .iter()
                .map(|value| {
                    let diff = value - mean;
                    diff * diff
                })
                .sum::<f64>()
                / (window - 1) as f64;
            variance.sqrt()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolling_mean_matches_hand_values() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let means = rolling_mean(&values, 3);
        assert_eq!(means, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn rolling_mean_is_empty_for_short_input() {
        assert!(rolling_mean(&[1.0, 2.0], 3).is_empty());
        assert!(rolling_mean(&[1.0, 2.0], 0).is_empty());
    }

    #[test]
    fn rolling_sample_std_matches_hand_values() {
        // Sample std of [1, 2, 3] is sqrt(1) = 1
        let values = [1.0, 2.0, 3.0, 5.0];
        let stds = rolling_sample_std(&values, 3);
        assert_eq!(stds.len(), 2);
        assert!((stds[0] - 1.0).abs() < 1e-12);
        // [2, 3, 5]: mean 10/3, variance (16/9 + 1/9 + 25/9) / 2 = 7/3
        assert!((stds[1] - (7.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn rolling_sample_std_of_constants_is_zero() {
        let stds = rolling_sample_std(&[4.0, 4.0, 4.0, 4.0], 2);
        assert!(stds.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn rolling_sample_std_requires_window_of_two() {
        assert!(rolling_sample_std(&[1.0, 2.0, 3.0], 1).is_empty());
    }
}
