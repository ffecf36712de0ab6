//! Configuration types for the sensor data quality pipeline.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic pipeline setup. Defaults: 1.5 IQR fences on
//! `MOI`, `temp` and `humidity`, one synthesized reading every 15 minutes,
//! and a 30 day freshness window.

use crate::schema::CONTINUOUS_COLUMNS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default location of the raw dataset, relative to the working directory.
pub const DEFAULT_DATASET_PATH: &str = "data/raw/smart_farming_sensor_data.csv";

/// Environment variable that overrides the dataset location.
pub const DATASET_PATH_ENV: &str = "FARM_DATA_PATH";

/// Candidate dataset paths tried in order when no explicit path is given.
pub fn default_candidate_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from(DEFAULT_DATASET_PATH),
        PathBuf::from("..").join(DEFAULT_DATASET_PATH),
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join(DEFAULT_DATASET_PATH),
    ]
}

/// Settings that drive the cleaning algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Columns clamped to their IQR fences.
    /// Default: `MOI`, `temp`, `humidity`
    pub outlier_columns: Vec<String>,

    /// Fence width in multiples of the IQR.
    /// Default: 1.5
    pub iqr_multiplier: f64,

    /// Spacing between synthesized timestamps, in minutes.
    /// Default: 15
    pub timestamp_interval_minutes: i64,

    /// How far before the generation instant the first timestamp lies, in days.
    /// Also the freshness window used for Timeliness.
    /// Default: 30
    pub lookback_days: i64,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            outlier_columns: CONTINUOUS_COLUMNS.iter().map(|c| c.to_string()).collect(),
            iqr_multiplier: 1.5,
            timestamp_interval_minutes: 15,
            lookback_days: 30,
        }
    }
}

impl CleaningConfig {
    /// Validate the cleaning settings.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !self.iqr_multiplier.is_finite() || self.iqr_multiplier < 0.0 {
            return Err(ConfigValidationError::InvalidIqrMultiplier(
                self.iqr_multiplier,
            ));
        }

        if self.timestamp_interval_minutes <= 0 {
            return Err(ConfigValidationError::InvalidInterval(
                self.timestamp_interval_minutes,
            ));
        }

        if self.lookback_days < 0 {
            return Err(ConfigValidationError::InvalidLookback(self.lookback_days));
        }

        Ok(())
    }
}

/// Configuration for the pipeline and the batch presenter.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use farm_quality::config::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .input_path("readings.csv")
///     .output_dir("outputs")
///     .iqr_multiplier(1.5)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Dataset locations tried in order; the first existing file wins.
    pub candidate_paths: Vec<PathBuf>,

    /// Output directory for the cleaned export, report and chart data.
    /// Default: "outputs"
    pub output_dir: PathBuf,

    /// Cleaning algorithm settings.
    pub cleaning: CleaningConfig,

    /// Whether to write `cleaned_data.csv`.
    /// Default: true
    pub export_cleaned: bool,

    /// Whether to write `data_quality_report.json`.
    /// Default: true
    pub write_report: bool,

    /// Whether to write `charts.json`.
    /// Default: true
    pub write_charts: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            candidate_paths: default_candidate_paths(),
            output_dir: PathBuf::from("outputs"),
            cleaning: CleaningConfig::default(),
            export_cleaned: true,
            write_report: true,
            write_charts: true,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.candidate_paths.is_empty() {
            return Err(ConfigValidationError::NoCandidatePaths);
        }

        self.cleaning.validate()
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("No candidate dataset paths configured")]
    NoCandidatePaths,

    #[error("Invalid IQR multiplier: {0} (must be finite and non-negative)")]
    InvalidIqrMultiplier(f64),

    #[error("Invalid timestamp interval: {0} minutes (must be at least 1)")]
    InvalidInterval(i64),

    #[error("Invalid lookback: {0} days (must not be negative)")]
    InvalidLookback(i64),
}

impl From<ConfigValidationError> for crate::error::PipelineError {
    fn from(err: ConfigValidationError) -> Self {
        crate::error::PipelineError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    input_path: Option<PathBuf>,
    candidate_paths: Option<Vec<PathBuf>>,
    output_dir: Option<PathBuf>,
    outlier_columns: Option<Vec<String>>,
    iqr_multiplier: Option<f64>,
    timestamp_interval_minutes: Option<i64>,
    lookback_days: Option<i64>,
    export_cleaned: Option<bool>,
    write_report: Option<bool>,
    write_charts: Option<bool>,
}

impl PipelineConfigBuilder {
    /// Put an explicit dataset path in front of the candidate list.
    pub fn input_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_path = Some(path.into());
        self
    }

    /// Replace the default candidate path list.
    pub fn candidate_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.candidate_paths = Some(paths);
        self
    }

    /// Set the output directory for exports.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set the columns clamped to IQR fences.
    pub fn outlier_columns(mut self, columns: Vec<String>) -> Self {
        self.outlier_columns = Some(columns);
        self
    }

    /// Set the IQR fence multiplier.
    pub fn iqr_multiplier(mut self, multiplier: f64) -> Self {
        self.iqr_multiplier = Some(multiplier);
        self
    }

    /// Set the spacing of synthesized timestamps.
    pub fn timestamp_interval_minutes(mut self, minutes: i64) -> Self {
        self.timestamp_interval_minutes = Some(minutes);
        self
    }

    /// Set the lookback / freshness window in days.
    pub fn lookback_days(mut self, days: i64) -> Self {
        self.lookback_days = Some(days);
        self
    }

    /// Enable or disable the cleaned CSV export.
    pub fn export_cleaned(mut self, export: bool) -> Self {
        self.export_cleaned = Some(export);
        self
    }

    /// Enable or disable the JSON report.
    pub fn write_report(mut self, write: bool) -> Self {
        self.write_report = Some(write);
        self
    }

    /// Enable or disable the chart data export.
    pub fn write_charts(mut self, write: bool) -> Self {
        self.write_charts = Some(write);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let defaults = CleaningConfig::default();

        let mut candidate_paths = self
            .candidate_paths
            .unwrap_or_else(default_candidate_paths);
        if let Some(path) = self.input_path {
            candidate_paths.insert(0, path);
        }

        let config = PipelineConfig {
            candidate_paths,
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from("outputs")),
            cleaning: CleaningConfig {
                outlier_columns: self.outlier_columns.unwrap_or(defaults.outlier_columns),
                iqr_multiplier: self.iqr_multiplier.unwrap_or(defaults.iqr_multiplier),
                timestamp_interval_minutes: self
                    .timestamp_interval_minutes
                    .unwrap_or(defaults.timestamp_interval_minutes),
                lookback_days: self.lookback_days.unwrap_or(defaults.lookback_days),
            },
            export_cleaned: self.export_cleaned.unwrap_or(true),
            write_report: self.write_report.unwrap_or(true),
            write_charts: self.write_charts.unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }
}
