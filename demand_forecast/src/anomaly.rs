//! Z-score anomaly detection with sample-size and intermittency guards

use crate::config::AnomalyPolicy;
use crate::warnings::WarningKind;
use demand_math::{coefficient_of_variation, mean, population_std};
use serde::{Deserialize, Serialize};

/// Advisory produced while examining one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyWarning {
    pub kind: WarningKind,
    pub message: String,
}

/// Outcome of anomaly detection on a single series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyResult {
    /// One flag per input value
    pub flags: Vec<bool>,
    pub anomaly_count: usize,
    /// Percentage of flagged points (0-100)
    pub anomaly_pct: f64,
    /// Threshold actually applied, after any intermittent override
    pub applied_z_threshold: f64,
    pub is_intermittent: bool,
    /// True exactly when the series was shorter than the minimum sample size
    pub skipped_detection: bool,
    pub warnings: Vec<AnomalyWarning>,
}

impl AnomalyResult {
    fn clean(n: usize, threshold: f64) -> Self {
        Self {
            flags: vec![false; n],
            anomaly_count: 0,
            anomaly_pct: 0.0,
            applied_z_threshold: threshold,
            is_intermittent: false,
            skipped_detection: false,
            warnings: Vec::new(),
        }
    }

    /// Fold in flags from a later detection pass over the cleaned series
    pub(crate) fn absorb(&mut self, later: &[bool], policy: &AnomalyPolicy) {
        for (flag, &again) in self.flags.iter_mut().zip(later) {
            *flag |= again;
        }
        self.recount(policy);
    }

    fn recount(&mut self, policy: &AnomalyPolicy) {
        let n = self.flags.len();
        self.anomaly_count = self.flags.iter().filter(|&&f| f).count();
        self.anomaly_pct = if n == 0 {
            0.0
        } else {
            self.anomaly_count as f64 / n as f64 * 100.0
        };

        self.warnings.retain(|w| w.kind != WarningKind::HighAnomalyRate);
        if self.anomaly_pct > policy.max_anomaly_pct {
            self.warnings.push(AnomalyWarning {
                kind: WarningKind::HighAnomalyRate,
                message: format!(
                    "High anomaly rate ({:.1}%); review data quality",
                    self.anomaly_pct
                ),
            });
        }
    }

    /// Indices of flagged points
    pub fn flagged_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.flags
            .iter()
            .enumerate()
            .filter_map(|(i, &flag)| flag.then_some(i))
    }
}

/// Flag outliers in `values`.
///
/// Detection is skipped below `policy.min_sample_size` points. When
/// `check_intermittent` is set and the CV exceeds the intermittent threshold,
/// `z_threshold` is replaced by `policy.intermittent_z_threshold`.
pub fn detect_anomalies(
    values: &[f64],
    z_threshold: f64,
    check_intermittent: bool,
    policy: &AnomalyPolicy,
) -> AnomalyResult {
    let n = values.len();
    let mut result = AnomalyResult::clean(n, z_threshold);

    if n < policy.min_sample_size {
        result.skipped_detection = true;
        result.warnings.push(AnomalyWarning {
            kind: WarningKind::InsufficientSample,
            message: format!(
                "Insufficient data for anomaly detection ({n} points, need {})",
                policy.min_sample_size
            ),
        });
        return result;
    }

    let avg = mean(values);
    let std = population_std(values);
    if std == 0.0 {
        return result;
    }

    let mut threshold = z_threshold;
    if check_intermittent {
        let cv = coefficient_of_variation(avg, std);
        if cv > policy.intermittent_cv_threshold {
            threshold = policy.intermittent_z_threshold;
            result.is_intermittent = true;
            result.warnings.push(AnomalyWarning {
                kind: WarningKind::IntermittentDemand,
                message: format!(
                    "Intermittent demand detected (CV={cv:.0}%); using Z threshold {threshold}"
                ),
            });
        }
    }
    result.applied_z_threshold = threshold;

    for (flag, value) in result.flags.iter_mut().zip(values) {
        *flag = ((value - avg) / std).abs() > threshold;
    }
    result.recount(policy);

    result
}
