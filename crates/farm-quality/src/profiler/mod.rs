//! Data profiling module for dataset analysis.
//!
//! This module provides the descriptive statistics shown next to the
//! quality score:
//! - Per-column summaries of numeric columns
//! - Missing values per column
//! - Category frequencies of the crop, soil, stage and result columns
//! - Pearson correlations between the continuous readings and the result
//! - Contingency tables of two categorical columns

mod statistics;

use crate::error::{PipelineError, Result};
use crate::schema::{CORRELATION_COLUMNS, FILTER_COLUMNS, RESULT, resolve_column};
use crate::types::{
    ColumnValueCounts, CorrelationMatrix, CrossTab, DatasetProfile, MissingCount, ValueCount,
};
use crate::utils::{DtypeCategory, f64_cells, get_dtype_category, missing_count, value_counts};
use polars::prelude::*;
use std::collections::BTreeSet;
use tracing::debug;

/// Data profiler for describing a table.
pub struct DataProfiler;

impl DataProfiler {
    /// Profile an entire table.
    ///
    /// Works on either the raw or the cleaned table; columns are looked up
    /// by trimmed name.
    pub fn profile(df: &DataFrame) -> Result<DatasetProfile> {
        let mut describe = Vec::new();
        let mut missing_per_column = Vec::with_capacity(df.width());

        for col in df.get_columns() {
            let series = col.as_materialized_series();
            missing_per_column.push(MissingCount {
                column: series.name().to_string(),
                missing: missing_count(series)?,
            });
            if get_dtype_category(series.dtype()) == DtypeCategory::Numeric {
                describe.push(statistics::summarize(series)?);
            }
        }
        let total_missing = missing_per_column.iter().map(|m| m.missing).sum();

        let mut counts = Vec::new();
        for logical in FILTER_COLUMNS.iter().chain(std::iter::once(&RESULT)) {
            if let Some(column) = resolve_column(df, logical) {
                let series = df.column(&column)?.as_materialized_series();
                counts.push(ColumnValueCounts {
                    column: logical.to_string(),
                    counts: value_counts(series)?
                        .into_iter()
                        .map(|(value, count)| ValueCount { value, count })
                        .collect(),
                });
            }
        }

        let correlation = Self::correlation(df, &CORRELATION_COLUMNS)?;

        debug!(
            "Profiled {} columns, {} numeric, {} missing cells",
            df.width(),
            describe.len(),
            total_missing
        );

        Ok(DatasetProfile {
            rows: df.height(),
            columns: df.width(),
            column_names: df
                .get_column_names()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            describe,
            missing_per_column,
            total_missing,
            value_counts: counts,
            correlation,
        })
    }

    /// Pearson correlation matrix of the given columns, skipping any that
    /// are absent or not numeric.
    pub fn correlation(df: &DataFrame, columns: &[&str]) -> Result<CorrelationMatrix> {
        let mut names = Vec::new();
        let mut cells = Vec::new();

        for logical in columns {
            let Some(column) = resolve_column(df, logical) else {
                continue;
            };
            let series = df.column(&column)?.as_materialized_series();
            if get_dtype_category(series.dtype()) != DtypeCategory::Numeric {
                continue;
            }
            names.push(logical.to_string());
            cells.push(f64_cells(series)?);
        }

        let values = cells
            .iter()
            .map(|x| cells.iter().map(|y| statistics::pearson(x, y)).collect())
            .collect();

        Ok(CorrelationMatrix {
            columns: names,
            values,
        })
    }

    /// Count rows by the values of `row` and `col`.
    pub fn crosstab(df: &DataFrame, row: &str, col: &str) -> Result<CrossTab> {
        let lookup = |logical: &str| {
            resolve_column(df, logical).ok_or_else(|| {
                PipelineError::UnexpectedSchema(format!("column '{}' not found", logical))
            })
        };
        let row_name = lookup(row)?;
        let col_name = lookup(col)?;

        let table = statistics::contingency(
            df.column(&row_name)?.as_materialized_series(),
            df.column(&col_name)?.as_materialized_series(),
        )?;

        let row_labels: Vec<String> = table.keys().cloned().collect();
        let col_labels: Vec<String> = table
            .values()
            .flat_map(|inner| inner.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let counts = row_labels
            .iter()
            .map(|r| {
                col_labels
                    .iter()
                    .map(|c| table[r].get(c).copied().unwrap_or(0))
                    .collect()
            })
            .collect();

        Ok(CrossTab {
            row_column: row.to_string(),
            col_column: col.to_string(),
            row_labels,
            col_labels,
            counts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CROP_ID, HUMIDITY, MOISTURE, SOIL_TYPE, TEMPERATURE};

    fn readings() -> DataFrame {
        df![
            "MOI" => [Some(1.0), Some(2.0), None, Some(4.0)],
            "temp" => [10.0, 20.0, 30.0, 40.0],
            "humidity" => [40.0, 30.0, 20.0, 10.0],
            "soil_type" => [Some("clay"), Some("sand"), None, Some("clay")],
            "crop ID" => ["Wheat", "Carrot", "Wheat", "Wheat"],
            "Seedling Stage" => ["Leaf", "Leaf", "Flowering", "Leaf"],
            "result" => [1i64, 0, 1, 1],
        ]
        .unwrap()
    }

    #[test]
    fn test_profile() {
        let profile = DataProfiler::profile(&readings()).unwrap();

        assert_eq!(profile.rows, 4);
        assert_eq!(profile.columns, 7);
        assert_eq!(profile.total_missing, 2);
        assert_eq!(profile.describe.len(), 4);
        assert_eq!(profile.summary(MOISTURE).unwrap().count, 3);
        assert_eq!(profile.summary(TEMPERATURE).unwrap().mean, Some(25.0));

        let soil = profile.counts(SOIL_TYPE).unwrap();
        assert_eq!(soil.counts[0], ValueCount { value: "clay".to_string(), count: 2 });
        let result = profile.counts(RESULT).unwrap();
        assert_eq!(result.counts[0].value, "1");
        assert_eq!(result.counts[0].count, 3);
    }

    #[test]
    fn test_correlation_matrix() {
        let profile = DataProfiler::profile(&readings()).unwrap();
        let corr = &profile.correlation;

        assert_eq!(corr.columns, vec!["MOI", "temp", "humidity", "result"]);
        let r = corr.get(TEMPERATURE, HUMIDITY).unwrap();
        assert!((r + 1.0).abs() < 1e-12);
        let diag = corr.get(MOISTURE, MOISTURE).unwrap();
        assert!((diag - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_crosstab() {
        let tab = DataProfiler::crosstab(&readings(), CROP_ID, RESULT).unwrap();

        assert_eq!(tab.row_labels, vec!["Carrot", "Wheat"]);
        assert_eq!(tab.col_labels, vec!["0", "1"]);
        assert_eq!(tab.count("Wheat", "1"), 3);
        assert_eq!(tab.count("Carrot", "0"), 1);
        assert_eq!(tab.count("Carrot", "1"), 0);
    }

    #[test]
    fn test_crosstab_unknown_column() {
        let err = DataProfiler::crosstab(&readings(), "field", RESULT).unwrap_err();
        assert_eq!(err.error_code(), "UNEXPECTED_SCHEMA");
    }
}
