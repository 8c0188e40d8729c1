//! Confidence scoring and demand-pattern labels

use serde::{Deserialize, Serialize};
use std::fmt;

/// Confidence bucket derived from the 0-100 score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfidenceLabel {
    High,
    Medium,
    Low,
    #[serde(rename = "Very Low")]
    VeryLow,
}

impl ConfidenceLabel {
    pub const ALL: [ConfidenceLabel; 4] = [
        ConfidenceLabel::High,
        ConfidenceLabel::Medium,
        ConfidenceLabel::Low,
        ConfidenceLabel::VeryLow,
    ];

    pub fn from_score(score: u32) -> Self {
        match score {
            70.. => ConfidenceLabel::High,
            50..=69 => ConfidenceLabel::Medium,
            30..=49 => ConfidenceLabel::Low,
            _ => ConfidenceLabel::VeryLow,
        }
    }
}

impl fmt::Display for ConfidenceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceLabel::High => write!(f, "High"),
            ConfidenceLabel::Medium => write!(f, "Medium"),
            ConfidenceLabel::Low => write!(f, "Low"),
            ConfidenceLabel::VeryLow => write!(f, "Very Low"),
        }
    }
}

/// Forecast confidence from volatility, history length and backtest error.
///
/// `history_days` is the history length expressed in days. The MAPE penalty
/// only applies when a backtest was possible.
pub fn confidence_score(cv: f64, history_days: f64, mape: Option<f64>) -> u32 {
    let mut score: i32 = 100;

    if cv > 100.0 {
        score -= 30;
    } else if cv > 50.0 {
        score -= 15;
    }

    if history_days < 60.0 {
        score -= 30;
    } else if history_days < 90.0 {
        score -= 20;
    }

    match mape {
        Some(m) if m > 50.0 => score -= 25,
        Some(m) if m > 30.0 => score -= 15,
        _ => {}
    }

    score.max(0) as u32
}

/// Volatility band of a series, from its CV
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Volatility {
    Stable,
    Moderate,
    Volatile,
}

/// Direction of the fitted trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trend {
    Growing,
    Declining,
    Flat,
}

/// Volatility and trend of a demand series, e.g. "Stable & Flat"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DemandPattern {
    pub volatility: Volatility,
    pub trend: Trend,
}

impl DemandPattern {
    pub fn classify(cv: f64, trend_slope: f64) -> Self {
        let volatility = if cv < 30.0 {
            Volatility::Stable
        } else if cv < 70.0 {
            Volatility::Moderate
        } else {
            Volatility::Volatile
        };
        let trend = if trend_slope > 0.5 {
            Trend::Growing
        } else if trend_slope < -0.5 {
            Trend::Declining
        } else {
            Trend::Flat
        };
        Self { volatility, trend }
    }
}

impl fmt::Display for DemandPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} & {:?}", self.volatility, self.trend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(10.0, 120.0, Some(5.0), 100)]
    #[case(60.0, 120.0, None, 85)]
    #[case(150.0, 120.0, None, 70)]
    #[case(10.0, 75.0, None, 80)]
    #[case(10.0, 40.0, None, 70)]
    #[case(10.0, 120.0, Some(35.0), 85)]
    #[case(10.0, 120.0, Some(80.0), 75)]
    #[case(150.0, 30.0, Some(80.0), 15)]
    fn test_confidence_score(
        #[case] cv: f64,
        #[case] history_days: f64,
        #[case] mape: Option<f64>,
        #[case] expected: u32,
    ) {
        assert_eq!(confidence_score(cv, history_days, mape), expected);
    }

    #[rstest]
    #[case(100, ConfidenceLabel::High)]
    #[case(70, ConfidenceLabel::High)]
    #[case(69, ConfidenceLabel::Medium)]
    #[case(50, ConfidenceLabel::Medium)]
    #[case(30, ConfidenceLabel::Low)]
    #[case(29, ConfidenceLabel::VeryLow)]
    #[case(0, ConfidenceLabel::VeryLow)]
    fn test_confidence_label(#[case] score: u32, #[case] expected: ConfidenceLabel) {
        assert_eq!(ConfidenceLabel::from_score(score), expected);
    }

    #[test]
    fn test_demand_pattern_labels() {
        assert_eq!(DemandPattern::classify(10.0, 0.0).to_string(), "Stable & Flat");
        assert_eq!(DemandPattern::classify(50.0, 1.0).to_string(), "Moderate & Growing");
        assert_eq!(DemandPattern::classify(70.0, -0.6).to_string(), "Volatile & Declining");
        assert_eq!(ConfidenceLabel::VeryLow.to_string(), "Very Low");
    }
}
