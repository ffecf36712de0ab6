//! Batch report generation.
//!
//! Writes three files into the output directory:
//! - `cleaned_data.csv`, the cleaned table
//! - `data_quality_report.json`, a [`BatchReport`]
//! - `charts.json`, the chart data as a [`ChartSet`]
//!
//! # Example
//!
//! ```rust,ignore
//! use farm_quality::{Pipeline, reporting::ReportGenerator};
//!
//! let run = Pipeline::builder().build()?.run()?;
//! let artifacts = ReportGenerator::new("outputs".into()).generate(&run)?;
//! println!("{}", serde_json::to_string_pretty(&artifacts.report)?);
//! ```

pub mod charts;
mod generator;

pub use charts::{ChartSet, QUALITY_TARGET, build_charts};
pub use generator::{
    BatchReport, CHARTS_FILE, CLEANED_FILE, REPORT_FILE, ReportArtifacts, ReportGenerator,
    WrittenFiles,
};
