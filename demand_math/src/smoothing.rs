//! Level and trend estimators
//!
//! - Simple exponential smoothing (final level and full path)
//! - Ordinary least squares trend slope against the period index

use crate::{MathError, Result, EPSILON};

fn validate_alpha(alpha: f64) -> Result<()> {
    if alpha <= 0.0 || alpha >= 1.0 || alpha.is_nan() {
        return Err(MathError::InvalidInput(format!(
            "Alpha must be between 0 and 1 (exclusive), got {}",
            alpha
        )));
    }
    Ok(())
}

/// Final level of simple exponential smoothing.
///
/// `S0 = v0`, `St = alpha * vt + (1 - alpha) * S(t-1)`. An empty series has a
/// level of `0.0`. Lower alpha means a longer memory of roughly `2 / alpha`
/// periods.
pub fn exponential_smoothing(values: &[f64], alpha: f64) -> Result<f64> {
    Ok(smoothing_path(values, alpha)?.last().copied().unwrap_or(0.0))
}

/// Every intermediate level of simple exponential smoothing.
pub fn smoothing_path(values: &[f64], alpha: f64) -> Result<Vec<f64>> {
    validate_alpha(alpha)?;

    let mut path = Vec::with_capacity(values.len());
    let mut level = match values.first() {
        Some(&first) => first,
        None => return Ok(path),
    };
    path.push(level);

    for &value in &values[1..] {
        level = alpha * value + (1.0 - alpha) * level;
        path.push(level);
    }

    Ok(path)
}

/// Least squares slope of value against index.
///
/// Returns `0.0` below two points or when the index variance is negligible.
pub fn trend_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }

    let n_f = n as f64;
    let x_mean = (n_f - 1.0) / 2.0;
    let y_mean = values.iter().sum::<f64>() / n_f;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let x = i as f64 - x_mean;
        numerator += x * (y - y_mean);
        denominator += x * x;
    }

    if denominator.abs() < EPSILON {
        return 0.0;
    }

    numerator / denominator
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rstest::rstest;

    #[test]
    fn test_exponential_smoothing_level() {
        let level = exponential_smoothing(&[10.0, 20.0], 0.5).unwrap();
        assert_approx_eq!(level, 15.0);

        let uniform = exponential_smoothing(&[10.0; 40], 0.08).unwrap();
        assert_approx_eq!(uniform, 10.0);
    }

    #[test]
    fn test_exponential_smoothing_empty() {
        assert_eq!(exponential_smoothing(&[], 0.3).unwrap(), 0.0);
        assert!(smoothing_path(&[], 0.3).unwrap().is_empty());
    }

    #[rstest]
    #[case(0.0)]
    #[case(1.0)]
    #[case(-0.2)]
    #[case(f64::NAN)]
    fn test_invalid_alpha(#[case] alpha: f64) {
        assert!(exponential_smoothing(&[1.0, 2.0], alpha).is_err());
        assert!(smoothing_path(&[1.0, 2.0], alpha).is_err());
    }

    #[test]
    fn test_path_ends_at_level() {
        let values = [3.0, 9.0, 4.0, 7.0];
        let path = smoothing_path(&values, 0.3).unwrap();
        assert_eq!(path.len(), values.len());
        assert_approx_eq!(path[0], 3.0);
        assert_approx_eq!(
            *path.last().unwrap(),
            exponential_smoothing(&values, 0.3).unwrap()
        );
    }

    #[test]
    fn test_trend_slope() {
        assert_approx_eq!(trend_slope(&[1.0, 3.0, 5.0, 7.0]), 2.0);
        assert_approx_eq!(trend_slope(&[9.0, 6.0, 3.0]), -3.0);
        assert_approx_eq!(trend_slope(&[4.0; 12]), 0.0);
        assert_eq!(trend_slope(&[5.0]), 0.0);
        assert_eq!(trend_slope(&[]), 0.0);
    }
}
