//! Moving averages over per-period demand
//!
//! [`rolling_mean`] follows the usual `window` / `min_periods` convention:
//! a position gets a value once at least `min_periods` observations fall
//! inside its window. [`trailing_mean`] is the last point of that series with
//! `min_periods = 1`, which is what the point forecasts use.

use crate::{MathError, Result};

fn check_window(window: usize) -> Result<()> {
    if window == 0 {
        return Err(MathError::InvalidInput(
            "Window must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Rolling mean with a running sum.
///
/// `min_periods` is clamped to `1..=window`; positions with fewer observations
/// in their window are `None`.
pub fn rolling_mean(values: &[f64], window: usize, min_periods: usize) -> Result<Vec<Option<f64>>> {
    check_window(window)?;
    let min_periods = min_periods.clamp(1, window);

    let mut sum = 0.0;
    let mut out = Vec::with_capacity(values.len());
    for (i, &value) in values.iter().enumerate() {
        sum += value;
        if i >= window {
            sum -= values[i - window];
        }
        let count = (i + 1).min(window);
        out.push((count >= min_periods).then(|| sum / count as f64));
    }

    Ok(out)
}

/// Mean of the last `window` values, or of all values when fewer exist.
///
/// A 90-period window over 40 periods of history averages those 40.
pub fn trailing_mean(values: &[f64], window: usize) -> Result<f64> {
    rolling_mean(values, window, 1)?
        .last()
        .copied()
        .flatten()
        .ok_or_else(|| MathError::InsufficientData("Cannot average an empty series".to_string()))
}
