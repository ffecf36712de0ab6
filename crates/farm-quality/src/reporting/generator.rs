use crate::config::PipelineConfig;
use crate::error::{Result, ResultExt};
use crate::reporting::charts::{ChartSet, QUALITY_TARGET, build_charts};
use crate::types::{
    CleaningReport, ColumnSummary, ColumnValueCounts, CorrelationMatrix, MissingCount,
    PipelineRun, QualityScore,
};
use chrono::NaiveDateTime;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the cleaned table export.
pub const CLEANED_FILE: &str = "cleaned_data.csv";

/// File name of the JSON report.
pub const REPORT_FILE: &str = "data_quality_report.json";

/// File name of the chart data.
pub const CHARTS_FILE: &str = "charts.json";

/// Batch report combining descriptive statistics, cleaning details and the
/// quality score.
///
/// Used both for `data_quality_report.json` and for `--json` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// The instant timestamps were synthesized relative to
    pub generated_at: NaiveDateTime,
    /// Path the raw table was read from, if it came from a file
    pub input_file: Option<String>,
    pub rows: usize,
    pub columns: usize,

    // Raw table statistics
    pub describe: Vec<ColumnSummary>,
    pub missing_per_column: Vec<MissingCount>,
    pub total_missing: usize,
    pub value_counts: Vec<ColumnValueCounts>,
    /// Correlations over the cleaned table
    pub correlation: CorrelationMatrix,

    pub cleaning: CleaningReport,
    pub quality: QualityScore,
    pub quality_target: f64,
    pub quality_target_met: bool,
}

/// Paths written by [`ReportGenerator::generate`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WrittenFiles {
    pub cleaned_csv: Option<PathBuf>,
    pub report_json: Option<PathBuf>,
    pub charts_json: Option<PathBuf>,
}

/// Output of the batch presenter.
#[derive(Debug, Clone)]
pub struct ReportArtifacts {
    pub report: BatchReport,
    pub charts: ChartSet,
    pub files: WrittenFiles,
}

/// Writes the batch presenter's files.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    output_dir: PathBuf,
    export_cleaned: bool,
    write_report: bool,
    write_charts: bool,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl ReportGenerator {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            export_cleaned: true,
            write_report: true,
            write_charts: true,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            export_cleaned: config.export_cleaned,
            write_report: config.write_report,
            write_charts: config.write_charts,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Build the report and chart data and write every enabled file.
    pub fn generate(&self, run: &PipelineRun) -> Result<ReportArtifacts> {
        let report = Self::build_report(run)?;
        let charts = build_charts(run)?;
        let mut files = WrittenFiles::default();

        if self.export_cleaned || self.write_report || self.write_charts {
            fs::create_dir_all(&self.output_dir).context(format!(
                "Failed to create output directory {}",
                self.output_dir.display()
            ))?;
        }
        if self.export_cleaned {
            files.cleaned_csv = Some(self.write_cleaned(run)?);
        }
        if self.write_report {
            files.report_json = Some(self.write_json(REPORT_FILE, &report)?);
        }
        if self.write_charts {
            files.charts_json = Some(self.write_json(CHARTS_FILE, &charts)?);
        }

        Ok(ReportArtifacts {
            report,
            charts,
            files,
        })
    }

    /// Assemble the [`BatchReport`] of a run without writing anything.
    pub fn build_report(run: &PipelineRun) -> Result<BatchReport> {
        let profile = &run.profile;
        let correlation = crate::profiler::DataProfiler::correlation(
            run.cleaned.data(),
            &crate::schema::CORRELATION_COLUMNS,
        )?;

        Ok(BatchReport {
            generated_at: run.cleaned.generated_at(),
            input_file: run
                .source_path
                .as_ref()
                .map(|p| p.display().to_string()),
            rows: profile.rows,
            columns: profile.columns,
            describe: profile.describe.clone(),
            missing_per_column: profile.missing_per_column.clone(),
            total_missing: profile.total_missing,
            value_counts: profile.value_counts.clone(),
            correlation,
            cleaning: run.cleaned.report().clone(),
            quality: run.score,
            quality_target: QUALITY_TARGET,
            quality_target_met: run.score.meets_target(QUALITY_TARGET),
        })
    }

    /// Write the cleaned table as CSV.
    pub fn write_cleaned(&self, run: &PipelineRun) -> Result<PathBuf> {
        let path = self.output_dir.join(CLEANED_FILE);
        let mut file = File::create(&path)
            .context(format!("Failed to create {}", path.display()))?;

        let mut df = run.cleaned.data().clone();
        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .with_quote_char(b'"')
            .finish(&mut df)?;

        info!("Cleaned data saved: {}", path.display());
        Ok(path)
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let path = self.output_dir.join(name);
        let mut file = File::create(&path)
            .context(format!("Failed to create {}", path.display()))?;
        file.write_all(serde_json::to_string_pretty(value)?.as_bytes())?;

        info!("Saved: {}", path.display());
        Ok(path)
    }
}
