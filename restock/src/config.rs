//! Layered configuration for planning runs
//!
//! Precedence, lowest first: built-in defaults, `restock.toml`, `RESTOCK_*`
//! environment variables, explicit overrides from the command line.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use demand_forecast::{ForecastConfig, Granularity, ReplacementMethod, SmoothingPreset};
use replenishment::ReplenishmentPolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlanningConfig {
    pub forecast: ForecastConfig,
    pub replenishment: ReplenishmentPolicy,
    pub report: ReportConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReportConfig {
    /// Length of top-N listings in the run summary
    pub top_n: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub preset: Option<String>,
    pub granularity: Option<Granularity>,
    pub horizon_days: Option<u32>,
    pub history_window_days: Option<u32>,
    pub service_level: Option<u32>,
    pub lead_time_days: Option<f64>,
    pub review_period_days: Option<f64>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            forecast: ForecastConfig::default(),
            replenishment: ReplenishmentPolicy::default(),
            report: ReportConfig { top_n: 10 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl PlanningConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("restock.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(forecast) = patch.forecast {
            if let Some(preset) = forecast.preset {
                self.forecast.preset = SmoothingPreset::from_name_or_default(Some(&preset));
            }
            if let Some(horizon_days) = forecast.horizon_days {
                self.forecast.horizon_days = horizon_days;
            }
            if let Some(granularity) = forecast.granularity {
                self.forecast.granularity = granularity;
            }
            if let Some(history_window_days) = forecast.history_window_days {
                self.forecast.history_window_days = history_window_days;
            }
            if let Some(replacement) = forecast.replacement {
                self.forecast.replacement = replacement;
            }
            if let Some(parallel_threshold) = forecast.parallel_threshold {
                self.forecast.parallel_threshold = parallel_threshold;
            }
        }

        if let Some(anomaly) = patch.anomaly {
            if let Some(min_sample_size) = anomaly.min_sample_size {
                self.forecast.anomaly.min_sample_size = min_sample_size;
            }
            if let Some(intermittent_cv_threshold) = anomaly.intermittent_cv_threshold {
                self.forecast.anomaly.intermittent_cv_threshold = intermittent_cv_threshold;
            }
            if let Some(intermittent_z_threshold) = anomaly.intermittent_z_threshold {
                self.forecast.anomaly.intermittent_z_threshold = intermittent_z_threshold;
            }
            if let Some(max_anomaly_pct) = anomaly.max_anomaly_pct {
                self.forecast.anomaly.max_anomaly_pct = max_anomaly_pct;
            }
        }

        if let Some(seasonality) = patch.seasonality {
            if let Some(top_volume_fraction) = seasonality.top_volume_fraction {
                self.forecast.seasonality.top_volume_fraction = top_volume_fraction;
            }
            if let Some(min_months) = seasonality.min_months {
                self.forecast.seasonality.min_months = min_months;
            }
        }

        if let Some(replenishment) = patch.replenishment {
            if let Some(service_level) = replenishment.service_level {
                self.replenishment.service_level = service_level;
            }
            if let Some(default_lead_time_days) = replenishment.default_lead_time_days {
                self.replenishment.default_lead_time_days = default_lead_time_days;
            }
            if let Some(review_period_days) = replenishment.review_period_days {
                self.replenishment.review_period_days = review_period_days;
            }
            if let Some(threshold) = replenishment.critical_priority_threshold {
                self.replenishment.critical_priority_threshold = threshold;
            }
            if let Some(parallel_threshold) = replenishment.parallel_threshold {
                self.replenishment.parallel_threshold = parallel_threshold;
            }
        }

        if let Some(report) = patch.report {
            if let Some(top_n) = report.top_n {
                self.report.top_n = top_n;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("RESTOCK_PRESET") {
            self.forecast.preset = SmoothingPreset::from_name_or_default(Some(&value));
        }
        if let Some(value) = read_env("RESTOCK_GRANULARITY") {
            self.forecast.granularity =
                value.parse().map_err(|_| invalid_env("RESTOCK_GRANULARITY", &value))?;
        }
        if let Some(value) = read_env("RESTOCK_HORIZON_DAYS") {
            self.forecast.horizon_days = parse_env("RESTOCK_HORIZON_DAYS", &value)?;
        }
        if let Some(value) = read_env("RESTOCK_HISTORY_WINDOW_DAYS") {
            self.forecast.history_window_days = parse_env("RESTOCK_HISTORY_WINDOW_DAYS", &value)?;
        }
        if let Some(value) = read_env("RESTOCK_SERVICE_LEVEL") {
            self.replenishment.service_level = parse_env("RESTOCK_SERVICE_LEVEL", &value)?;
        }
        if let Some(value) = read_env("RESTOCK_LEAD_TIME_DAYS") {
            self.replenishment.default_lead_time_days = parse_env("RESTOCK_LEAD_TIME_DAYS", &value)?;
        }
        if let Some(value) = read_env("RESTOCK_REVIEW_PERIOD_DAYS") {
            self.replenishment.review_period_days = parse_env("RESTOCK_REVIEW_PERIOD_DAYS", &value)?;
        }

        if let Some(value) = read_env("RESTOCK_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("RESTOCK_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(preset) = overrides.preset {
            self.forecast.preset = SmoothingPreset::from_name_or_default(Some(&preset));
        }
        if let Some(granularity) = overrides.granularity {
            self.forecast.granularity = granularity;
        }
        if let Some(horizon_days) = overrides.horizon_days {
            self.forecast.horizon_days = horizon_days;
        }
        if let Some(history_window_days) = overrides.history_window_days {
            self.forecast.history_window_days = history_window_days;
        }
        if let Some(service_level) = overrides.service_level {
            self.replenishment.service_level = service_level;
        }
        if let Some(lead_time_days) = overrides.lead_time_days {
            self.replenishment.default_lead_time_days = lead_time_days;
        }
        if let Some(review_period_days) = overrides.review_period_days {
            self.replenishment.review_period_days = review_period_days;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.forecast
            .validate()
            .map_err(|err| ConfigError::Validation(format!("forecast: {err}")))?;
        self.replenishment
            .validate()
            .map_err(|err| ConfigError::Validation(format!("replenishment: {err}")))?;
        if self.report.top_n == 0 {
            return Err(ConfigError::Validation(
                "report.top_n must be greater than zero".to_string(),
            ));
        }
        validate_logging(&self.logging)
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("restock.toml"), PathBuf::from("config/restock.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    toml::from_str::<ConfigPatch>(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_env(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| invalid_env(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    forecast: Option<ForecastPatch>,
    anomaly: Option<AnomalyPatch>,
    seasonality: Option<SeasonalityPatch>,
    replenishment: Option<ReplenishmentPatch>,
    report: Option<ReportPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ForecastPatch {
    preset: Option<String>,
    horizon_days: Option<u32>,
    granularity: Option<Granularity>,
    history_window_days: Option<u32>,
    replacement: Option<ReplacementMethod>,
    parallel_threshold: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct AnomalyPatch {
    min_sample_size: Option<usize>,
    intermittent_cv_threshold: Option<f64>,
    intermittent_z_threshold: Option<f64>,
    max_anomaly_pct: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct SeasonalityPatch {
    top_volume_fraction: Option<f64>,
    min_months: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ReplenishmentPatch {
    service_level: Option<u32>,
    default_lead_time_days: Option<f64>,
    review_period_days: Option<f64>,
    critical_priority_threshold: Option<u32>,
    parallel_threshold: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ReportPatch {
    top_n: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
