//! Smart Farming Sensor Data Quality Library
//!
//! Cleaning, quality scoring and reporting for tabular IoT readings from
//! agricultural fields, built with Rust and Polars.
//!
//! # Overview
//!
//! One pass over a raw sensor table produces:
//!
//! - **Cleaning**: median fill for numeric columns, mode fill for text
//!   columns, IQR clamping of `MOI`, `temp` and `humidity`, and a synthetic
//!   `timestamp` column at 15 minute spacing
//! - **Quality Scoring**: Accuracy, Completeness, Timeliness and their mean
//! - **Profiling**: descriptive statistics, value counts and correlations
//! - **Batch Reporting**: cleaned CSV export, JSON report and chart data
//! - **Dashboard**: filtered views over a dataset loaded once per process
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use farm_quality::{Pipeline, PipelineConfig, ReportGenerator};
//!
//! let config = PipelineConfig::builder()
//!     .input_path("data/raw/smart_farming_sensor_data.csv")
//!     .output_dir("outputs")
//!     .build()?;
//!
//! let run = Pipeline::builder()
//!     .config(config.clone())
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run()?;
//!
//! println!("Overall quality: {:.3}", run.score.overall);
//!
//! let artifacts = ReportGenerator::from_config(&config).generate(&run)?;
//! ```
//!
//! # Cleaning a table already in memory
//!
//! ```rust,ignore
//! use farm_quality::{DataCleaner, QualityScorer};
//!
//! let cleaned = DataCleaner::default().clean(&raw)?;
//! let score = QualityScorer::default().score(&raw, &cleaned)?;
//! assert_eq!(cleaned.report().missing_after, 0);
//! ```
//!
//! # Dashboard
//!
//! ```rust,ignore
//! use farm_quality::dashboard::{Dashboard, DashboardConfig, DashboardFilters};
//!
//! let pipeline = Pipeline::builder().build()?;
//! let dashboard = Dashboard::open(DashboardConfig::default(), &pipeline)?;
//!
//! let filters = DashboardFilters {
//!     crop: "Wheat".to_string(),
//!     ..Default::default()
//! };
//! let view = dashboard.render(&filters, Some(1000))?;
//! ```

pub mod cleaner;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod imputers;
pub mod loader;
pub mod pipeline;
pub mod profiler;
pub mod quality;
pub mod reporting;
pub mod schema;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{DataCleaner, OutlierHandler};
pub use config::{
    CleaningConfig, ConfigValidationError, DATASET_PATH_ENV, DEFAULT_DATASET_PATH,
    PipelineConfig, PipelineConfigBuilder,
};
pub use dashboard::{Dashboard, DashboardConfig, DashboardFilters, DashboardView};
pub use error::{PipelineError, Result as PipelineResult, ResultExt};
pub use imputers::{ColumnFill, FillValue, StatisticalImputer};
pub use loader::{DatasetCache, DatasetLoader};
pub use pipeline::{
    ClosureProgressReporter, Pipeline, PipelineBuilder, PipelineStage, ProgressReporter,
    ProgressUpdate,
};
pub use profiler::DataProfiler;
pub use quality::QualityScorer;
pub use reporting::{BatchReport, ChartSet, ReportArtifacts, ReportGenerator};
pub use types::{
    CleanedTable, CleaningReport, CorrelationMatrix, CrossTab, DatasetProfile,
    ImputationRecord, ImputationStrategy, OutlierRecord, PipelineRun, QualityBreakdown,
    QualityScore, TimestampRange,
};
