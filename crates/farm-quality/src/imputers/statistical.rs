//! Statistical imputation methods.
//!
//! Median for numeric columns, mode for string columns. Fill values are
//! always derived from the table as it was before any cell was filled:
//! [`StatisticalImputer::plan`] reads the statistics, and
//! [`StatisticalImputer::apply`] writes them without looking at the data
//! again.

use crate::error::{PipelineError, Result, ResultExt};
use crate::types::{ImputationRecord, ImputationStrategy};
use crate::utils::{
    DtypeCategory, fill_numeric_nulls, fill_string_nulls, get_dtype_category, missing_count,
    numeric_median, string_mode,
};
use polars::prelude::*;
use tracing::{debug, warn};

/// A value to write into a column's missing cells.
#[derive(Debug, Clone, PartialEq)]
pub enum FillValue {
    Numeric(f64),
    Text(String),
}

impl std::fmt::Display for FillValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FillValue::Numeric(v) => write!(f, "{}", v),
            FillValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// The planned imputation for one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFill {
    pub column: String,
    pub strategy: ImputationStrategy,
    pub value: FillValue,
    pub missing: usize,
}

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Compute the fill value of every column that has missing cells.
    ///
    /// Numeric columns come first (median), then string columns (mode),
    /// each group in column order. Columns of other types are left alone.
    pub fn plan(df: &DataFrame) -> Result<Vec<ColumnFill>> {
        let mut numeric = Vec::new();
        let mut text = Vec::new();

        for col in df.get_columns() {
            let series = col.as_materialized_series();
            let name = series.name().to_string();
            let missing = missing_count(series)?;
            if missing == 0 {
                continue;
            }

            match get_dtype_category(series.dtype()) {
                DtypeCategory::Numeric => {
                    let median = numeric_median(series)
                        .context(format!("Failed to compute median of '{}'", name))?
                        .ok_or_else(|| {
                            PipelineError::insufficient(&name, "every value is missing, median is undefined")
                        })?;
                    numeric.push(ColumnFill {
                        column: name,
                        strategy: ImputationStrategy::Median,
                        value: FillValue::Numeric(median),
                        missing,
                    });
                }
                DtypeCategory::String => {
                    let mode = string_mode(series).ok_or_else(|| {
                        PipelineError::insufficient(&name, "every value is missing, mode is undefined")
                    })?;
                    text.push(ColumnFill {
                        column: name,
                        strategy: ImputationStrategy::Mode,
                        value: FillValue::Text(mode),
                        missing,
                    });
                }
                _ => {
                    warn!(
                        "Column '{}' ({}) has {} missing values but no imputation rule",
                        name,
                        series.dtype(),
                        missing
                    );
                }
            }
        }

        numeric.extend(text);
        Ok(numeric)
    }

    /// Write planned fill values into `df`.
    pub fn apply(
        df: &mut DataFrame,
        plan: &[ColumnFill],
        processing_steps: &mut Vec<String>,
    ) -> Result<Vec<ImputationRecord>> {
        let mut records = Vec::with_capacity(plan.len());

        for fill in plan {
            let series = df.column(&fill.column)?.as_materialized_series().clone();
            let filled = match &fill.value {
                FillValue::Numeric(v) => fill_numeric_nulls(&series, *v)?,
                FillValue::Text(s) => fill_string_nulls(&series, s)?,
            };
            df.replace(&fill.column, filled)?;

            let method = match fill.strategy {
                ImputationStrategy::Median => "median",
                ImputationStrategy::Mode => "mode",
            };
            processing_steps.push(format!(
                "Filled {} missing values in '{}' with {}: {}",
                fill.missing, fill.column, method, fill.value
            ));
            debug!("Filled '{}' with {} {}", fill.column, method, fill.value);

            records.push(ImputationRecord {
                column: fill.column.clone(),
                strategy: fill.strategy,
                fill_value: fill.value.to_string(),
                cells_filled: fill.missing,
            });
        }

        Ok(records)
    }

    /// Plan and apply in one step.
    pub fn impute(
        df: &mut DataFrame,
        processing_steps: &mut Vec<String>,
    ) -> Result<Vec<ImputationRecord>> {
        let plan = Self::plan(df)?;
        Self::apply(df, &plan, processing_steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_median_and_mode() {
        let df = df![
            "temp" => [Some(10.0), Some(12.0), None, Some(1000.0), Some(11.0)],
            "soil_type" => [Some("clay"), Some("sand"), None, Some("clay"), Some("loam")],
            "humidity" => [1.0, 2.0, 3.0, 4.0, 5.0],
        ]
        .unwrap();

        let plan = StatisticalImputer::plan(&df).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].column, "temp");
        // median of [10, 12, 1000, 11]
        assert_eq!(plan[0].value, FillValue::Numeric(11.5));
        assert_eq!(plan[1].column, "soil_type");
        assert_eq!(plan[1].value, FillValue::Text("clay".to_string()));
    }

    #[test]
    fn test_plan_numeric_before_text() {
        let df = df![
            "soil_type" => [Some("clay"), None],
            "MOI" => [Some(1.0), None],
        ]
        .unwrap();

        let plan = StatisticalImputer::plan(&df).unwrap();
        let columns: Vec<&str> = plan.iter().map(|f| f.column.as_str()).collect();
        assert_eq!(columns, vec!["MOI", "soil_type"]);
    }

    #[test]
    fn test_impute_fills_everything() {
        let mut df = df![
            "values" => [Some(1.0), None, Some(3.0), None, Some(5.0)],
            "labels" => [Some("a"), None, Some("a"), Some("b"), None],
        ]
        .unwrap();
        let mut steps = Vec::new();

        let records = StatisticalImputer::impute(&mut df, &mut steps).unwrap();

        assert_eq!(df.column("values").unwrap().null_count(), 0);
        assert_eq!(df.column("labels").unwrap().null_count(), 0);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].cells_filled, 2);
        assert_eq!(records[0].fill_value, "3");
        assert_eq!(records[1].fill_value, "a");
        assert!(steps.iter().any(|s| s.contains("median")));
        assert!(steps.iter().any(|s| s.contains("mode")));
    }

    #[test]
    fn test_integer_column_median() {
        let mut df = df![
            "result" => [Some(1i64), Some(2), None, Some(2)],
        ]
        .unwrap();
        let mut steps = Vec::new();

        StatisticalImputer::impute(&mut df, &mut steps).unwrap();

        let values: Vec<Option<f64>> = df.column("result").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(1.0), Some(2.0), Some(2.0), Some(2.0)]);
    }

    #[test]
    fn test_all_missing_numeric_fails() {
        let df = df![
            "temp" => [None::<f64>, None, None],
        ]
        .unwrap();

        let err = StatisticalImputer::plan(&df).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientData { ref column, .. } if column == "temp"
        ));
    }

    #[test]
    fn test_all_missing_text_fails() {
        let df = df![
            "soil_type" => [None::<&str>, None],
        ]
        .unwrap();

        let err = StatisticalImputer::plan(&df).unwrap_err();
        assert_eq!(err.error_code(), "INSUFFICIENT_DATA");
    }

    #[test]
    fn test_no_missing_no_plan() {
        let df = df![
            "temp" => [1.0, 2.0],
            "soil_type" => ["clay", "sand"],
        ]
        .unwrap();

        assert!(StatisticalImputer::plan(&df).unwrap().is_empty());
    }
}
