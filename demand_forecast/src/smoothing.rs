//! Anomaly-aware demand smoothing
//!
//! The pipeline per SKU:
//! - detect anomalies with the preset's Z threshold
//! - replace flagged points (median or nearest neighbours), repeating the
//!   detect-and-replace pass until the cleaned series has no outliers left
//! - exponentially smooth the cleaned series to a current level

use crate::anomaly::{detect_anomalies, AnomalyResult};
use crate::config::{AnomalyPolicy, ReplacementMethod, SmoothingPreset};
use crate::error::Result;
use demand_math::{exponential_smoothing, median};
use serde::{Deserialize, Serialize};

/// Replace flagged points in `values`.
///
/// With [`ReplacementMethod::Neighbor`] a flagged point takes the average of
/// the nearest clean values on each side, or the one side that exists. A point
/// with no clean neighbour on either side is left unchanged.
pub fn replace_anomalies(values: &[f64], flags: &[bool], method: ReplacementMethod) -> Vec<f64> {
    let mut cleaned = values.to_vec();
    if !flags.iter().any(|&f| f) {
        return cleaned;
    }

    match method {
        ReplacementMethod::Median => {
            let clean: Vec<f64> = values
                .iter()
                .zip(flags)
                .filter(|&(_, &flag)| !flag)
                .map(|(&v, _)| v)
                .collect();
            if let Some(replacement) = median(&clean) {
                for (value, _) in cleaned.iter_mut().zip(flags).filter(|&(_, &flag)| flag) {
                    *value = replacement;
                }
            }
        }
        ReplacementMethod::Neighbor => {
            let flagged = |j: usize| flags.get(j).copied().unwrap_or(false);
            for i in (0..values.len()).filter(|&i| flagged(i)) {
                let left = (0..i).rev().find(|&j| !flagged(j)).map(|j| values[j]);
                let right = (i + 1..values.len()).find(|&j| !flagged(j)).map(|j| values[j]);
                cleaned[i] = match (left, right) {
                    (Some(l), Some(r)) => (l + r) / 2.0,
                    (Some(l), None) => l,
                    (None, Some(r)) => r,
                    (None, None) => values[i],
                };
            }
        }
    }

    cleaned
}

/// Result of the smoothing pipeline for one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothingOutcome {
    /// Final exponential smoothing level, per period
    pub smoothed_forecast: f64,
    /// Series after anomaly replacement (the raw series when detection was skipped)
    pub cleaned: Vec<f64>,
    pub anomaly: AnomalyResult,
    pub preset: SmoothingPreset,
    pub alpha: f64,
}

/// Detect and replace until a fresh detection pass over the cleaned series
/// flags nothing, or no replacement changes it.
///
/// Removing a large spike shrinks the spread, which can expose a moderate
/// outlier that the spike was masking. The returned result carries the union
/// of flags from every pass and the first pass's threshold and intermittency.
fn clean_until_stable(
    values: &[f64],
    z_threshold: f64,
    method: ReplacementMethod,
    policy: &AnomalyPolicy,
) -> (Vec<f64>, AnomalyResult) {
    let mut anomaly = detect_anomalies(values, z_threshold, true, policy);
    if anomaly.skipped_detection {
        return (values.to_vec(), anomaly);
    }

    let mut cleaned = replace_anomalies(values, &anomaly.flags, method);
    for pass in 2..=values.len() {
        let again = detect_anomalies(&cleaned, z_threshold, true, policy);
        if again.anomaly_count == 0 {
            break;
        }
        anomaly.absorb(&again.flags, policy);
        let replaced = replace_anomalies(&cleaned, &again.flags, method);
        if replaced == cleaned {
            break;
        }
        tracing::trace!(pass, flagged = again.anomaly_count, "repeating anomaly replacement");
        cleaned = replaced;
    }

    (cleaned, anomaly)
}

/// Run detection, replacement and exponential smoothing on one series
pub fn apply_demand_smoothing(
    values: &[f64],
    preset: SmoothingPreset,
    method: ReplacementMethod,
    policy: &AnomalyPolicy,
) -> Result<SmoothingOutcome> {
    let config = preset.config();
    let (cleaned, anomaly) = clean_until_stable(values, config.z_score_threshold, method, policy);
    let smoothed_forecast = exponential_smoothing(&cleaned, config.alpha)?;

    Ok(SmoothingOutcome {
        smoothed_forecast,
        cleaned,
        anomaly,
        preset,
        alpha: config.alpha,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_median_replacement() {
        let values = [10.0, 12.0, 500.0, 14.0];
        let flags = [false, false, true, false];
        let cleaned = replace_anomalies(&values, &flags, ReplacementMethod::Median);
        assert_eq!(cleaned, vec![10.0, 12.0, 12.0, 14.0]);
    }

    #[test]
    fn test_neighbor_replacement() {
        let values = [10.0, 20.0, 100.0, 30.0, 40.0];
        let flags = [false, false, true, false, false];
        let cleaned = replace_anomalies(&values, &flags, ReplacementMethod::Neighbor);
        assert_eq!(cleaned[2], 25.0);
    }

    #[test]
    fn test_neighbor_replacement_at_edges() {
        let values = [90.0, 20.0, 30.0, 95.0];
        let flags = [true, false, false, true];
        let cleaned = replace_anomalies(&values, &flags, ReplacementMethod::Neighbor);
        assert_eq!(cleaned, vec![20.0, 20.0, 30.0, 30.0]);
    }

    #[test]
    fn test_neighbor_without_clean_values_is_unchanged() {
        let values = [7.0, 8.0, 9.0];
        let flags = [true, true, true];
        let cleaned = replace_anomalies(&values, &flags, ReplacementMethod::Neighbor);
        assert_eq!(cleaned, values.to_vec());

        let cleaned = replace_anomalies(&values, &flags, ReplacementMethod::Median);
        assert_eq!(cleaned, values.to_vec());
    }

    #[test]
    fn test_uniform_series_smooths_to_level() {
        let outcome = apply_demand_smoothing(
            &[10.0; 40],
            SmoothingPreset::Balanced,
            ReplacementMethod::Median,
            &AnomalyPolicy::default(),
        )
        .unwrap();
        assert_eq!(outcome.anomaly.anomaly_count, 0);
        assert_approx_eq!(outcome.smoothed_forecast, 10.0);
    }

    #[test]
    fn test_spike_removed_before_smoothing() {
        let mut values = vec![10.0; 35];
        values.push(1000.0);
        let raw_mean = values.iter().sum::<f64>() / values.len() as f64;

        let outcome = apply_demand_smoothing(
            &values,
            SmoothingPreset::Balanced,
            ReplacementMethod::Median,
            &AnomalyPolicy::default(),
        )
        .unwrap();

        assert!(outcome.anomaly.flags[35]);
        assert!((outcome.smoothed_forecast - 10.0).abs() < (outcome.smoothed_forecast - raw_mean).abs());
        assert_approx_eq!(outcome.smoothed_forecast, 10.0);
    }

    /// Noisy 8..12 base with a moderate outlier masked by a huge spike
    fn masked_outlier_series() -> Vec<f64> {
        let mut values: Vec<f64> = (0..40).map(|i| 8.0 + ((i * 7) % 5) as f64).collect();
        values[10] = 25.0;
        values[30] = 500.0;
        values
    }

    #[rstest]
    fn test_cleaned_output_is_stable(
        #[values(
            SmoothingPreset::Conservative,
            SmoothingPreset::Balanced,
            SmoothingPreset::Aggressive
        )]
        preset: SmoothingPreset,
        #[values(ReplacementMethod::Median, ReplacementMethod::Neighbor)] method: ReplacementMethod,
    ) {
        let policy = AnomalyPolicy::default();
        let first =
            apply_demand_smoothing(&masked_outlier_series(), preset, method, &policy).unwrap();
        assert!(first.anomaly.flags[10], "masked outlier not flagged");
        assert!(first.anomaly.flags[30]);
        assert_eq!(first.anomaly.anomaly_count, first.anomaly.flagged_indices().count());

        let second = apply_demand_smoothing(&first.cleaned, preset, method, &policy).unwrap();
        assert_eq!(second.anomaly.anomaly_count, 0);
        assert_eq!(second.cleaned, first.cleaned);
    }

    #[test]
    fn test_masked_outlier_found_on_later_pass() {
        let outcome = apply_demand_smoothing(
            &masked_outlier_series(),
            SmoothingPreset::Balanced,
            ReplacementMethod::Median,
            &AnomalyPolicy::default(),
        )
        .unwrap();

        assert_eq!(outcome.anomaly.flagged_indices().collect::<Vec<_>>(), vec![10, 30]);
        assert_approx_eq!(outcome.anomaly.anomaly_pct, 5.0);
        assert!(outcome.cleaned.iter().all(|&v| (8.0..=12.0).contains(&v)));
    }

    #[test]
    fn test_flat_spike_cleaned_once() {
        let mut values = vec![10.0; 35];
        values.push(1000.0);
        let policy = AnomalyPolicy::default();
        let first = apply_demand_smoothing(
            &values,
            SmoothingPreset::Balanced,
            ReplacementMethod::Median,
            &policy,
        )
        .unwrap();
        let second = apply_demand_smoothing(
            &first.cleaned,
            SmoothingPreset::Balanced,
            ReplacementMethod::Median,
            &policy,
        )
        .unwrap();

        assert_eq!(first.anomaly.anomaly_count, 1);
        assert_eq!(second.anomaly.anomaly_count, 0);
        assert_eq!(second.cleaned, first.cleaned);
    }

    #[test]
    fn test_short_series_smooths_raw_values() {
        let values = [4.0, 6.0, 200.0];
        let outcome = apply_demand_smoothing(
            &values,
            SmoothingPreset::Aggressive,
            ReplacementMethod::Median,
            &AnomalyPolicy::default(),
        )
        .unwrap();
        assert!(outcome.anomaly.skipped_detection);
        assert_eq!(outcome.cleaned, values.to_vec());
        assert!(outcome.smoothed_forecast > 6.0);
    }

    #[test]
    fn test_empty_series() {
        let outcome = apply_demand_smoothing(
            &[],
            SmoothingPreset::Balanced,
            ReplacementMethod::Median,
            &AnomalyPolicy::default(),
        )
        .unwrap();
        assert_eq!(outcome.smoothed_forecast, 0.0);
        assert!(outcome.anomaly.skipped_detection);
    }
}
