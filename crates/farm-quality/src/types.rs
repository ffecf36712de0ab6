use chrono::NaiveDateTime;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How a column's missing cells were filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputationStrategy {
    /// Median of the raw non-missing values (numeric columns).
    Median,
    /// Most frequent raw non-missing value (string columns).
    Mode,
}

/// One column's imputation, recorded for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputationRecord {
    pub column: String,
    pub strategy: ImputationStrategy,
    /// The fill value rendered as text (`"11"`, `"clay"`).
    pub fill_value: String,
    pub cells_filled: usize,
}

/// IQR fences computed for one continuous column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierRecord {
    pub column: String,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
    /// Values outside `[lower, upper]` before clamping.
    pub outliers_capped: usize,
}

impl OutlierRecord {
    /// Whether a value lies inside the fences.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Span of the synthesized timestamp column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub interval_minutes: i64,
}

/// Everything the cleaner did, for observability.
///
/// None of these numbers feed back into cleaning or scoring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleaningReport {
    pub rows: usize,
    pub missing_before: usize,
    pub missing_after: usize,
    pub imputations: Vec<ImputationRecord>,
    pub outliers: Vec<OutlierRecord>,
    pub total_outliers_capped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<TimestampRange>,
    /// Columns whose names changed when trimmed, as `(before, after)`.
    pub renamed_columns: Vec<(String, String)>,
    /// Human-readable log of each step.
    pub processing_steps: Vec<String>,
}

impl CleaningReport {
    /// Total number of imputed cells across all columns.
    pub fn cells_imputed(&self) -> usize {
        self.imputations.iter().map(|r| r.cells_filled).sum()
    }
}

/// The cleaned table together with how it was produced.
///
/// Immutable once created: callers get shared access to the frame only.
#[derive(Debug, Clone)]
pub struct CleanedTable {
    data: DataFrame,
    generated_at: NaiveDateTime,
    report: CleaningReport,
}

impl CleanedTable {
    pub(crate) fn new(data: DataFrame, generated_at: NaiveDateTime, report: CleaningReport) -> Self {
        Self {
            data,
            generated_at,
            report,
        }
    }

    /// The cleaned rows, including the synthesized `timestamp` column.
    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    /// The instant timestamps were synthesized relative to.
    pub fn generated_at(&self) -> NaiveDateTime {
        self.generated_at
    }

    pub fn report(&self) -> &CleaningReport {
        &self.report
    }

    pub fn height(&self) -> usize {
        self.data.height()
    }
}

/// Raw counts behind a [`QualityScore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityBreakdown {
    pub missing_cells: usize,
    pub non_missing_cells: usize,
    pub total_cells: usize,
    pub recent_rows: usize,
    pub total_rows: usize,
}

/// Four-part data quality score, each part a ratio in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub accuracy: f64,
    pub completeness: f64,
    pub timeliness: f64,
    pub overall: f64,
    pub breakdown: QualityBreakdown,
}

impl QualityScore {
    /// Whether the overall score reaches `target` (e.g. `0.8`).
    pub fn meets_target(&self, target: f64) -> bool {
        self.overall >= target
    }

    /// Metric names and values in display order.
    pub fn metrics(&self) -> [(&'static str, f64); 4] {
        [
            ("Accuracy", self.accuracy),
            ("Completeness", self.completeness),
            ("Timeliness", self.timeliness),
            ("Overall", self.overall),
        ]
    }
}

// =============================================================================
// Dataset profile
// =============================================================================

/// Summary statistics of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (`n - 1` denominator).
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub p25: Option<f64>,
    #[serde(rename = "50%")]
    pub p50: Option<f64>,
    #[serde(rename = "75%")]
    pub p75: Option<f64>,
    pub max: Option<f64>,
}


/// Frequency of one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// Category frequencies of one column, most frequent first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnValueCounts {
    pub column: String,
    pub counts: Vec<ValueCount>,
}

/// Missing cells in one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingCount {
    pub column: String,
    pub missing: usize,
}

/// Pearson correlation matrix. `values[i][j]` pairs `columns[i]` with
/// `columns[j]`; `None` where the correlation is undefined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }
}

/// Contingency table of two categorical columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossTab {
    pub row_column: String,
    pub col_column: String,
    /// Sorted distinct values of `row_column`.
    pub row_labels: Vec<String>,
    /// Sorted distinct values of `col_column`.
    pub col_labels: Vec<String>,
    /// `counts[i][j]` rows with `row_labels[i]` and `col_labels[j]`.
    pub counts: Vec<Vec<usize>>,
}

impl CrossTab {
    pub fn count(&self, row: &str, col: &str) -> usize {
        let i = self.row_labels.iter().position(|r| r == row);
        let j = self.col_labels.iter().position(|c| c == col);
        match (i, j) {
            (Some(i), Some(j)) => self.counts[i][j],
            _ => 0,
        }
    }
}

/// Descriptive statistics of a whole table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetProfile {
    pub rows: usize,
    pub columns: usize,
    pub column_names: Vec<String>,
    pub describe: Vec<ColumnSummary>,
    pub missing_per_column: Vec<MissingCount>,
    pub total_missing: usize,
    pub value_counts: Vec<ColumnValueCounts>,
    pub correlation: CorrelationMatrix,
}

impl DatasetProfile {
    pub fn summary(&self, column: &str) -> Option<&ColumnSummary> {
        self.describe.iter().find(|s| s.column == column)
    }

    pub fn counts(&self, column: &str) -> Option<&ColumnValueCounts> {
        self.value_counts.iter().find(|c| c.column == column)
    }
}

// =============================================================================
// Pipeline output
// =============================================================================

/// Everything produced by one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Where the raw table was read from; `None` when it was supplied directly.
    pub source_path: Option<PathBuf>,
    pub raw: DataFrame,
    pub cleaned: CleanedTable,
    pub score: QualityScore,
    /// Descriptive statistics of the raw table.
    pub profile: DatasetProfile,
}
