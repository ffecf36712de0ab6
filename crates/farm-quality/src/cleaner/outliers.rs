//! Outlier handling for the continuous sensor columns.
//!
//! Values outside the IQR fences are clamped to the nearest fence. Rows are
//! never removed.

use crate::error::{PipelineError, Result};
use crate::types::OutlierRecord;
use crate::utils::{f64_cells, quantile_linear};
use polars::prelude::*;
use tracing::debug;

/// Caps continuous columns at their IQR fences.
pub struct OutlierHandler;

impl OutlierHandler {
    /// Compute fences for `column` from its current values, count the
    /// values outside them, and clamp the column in place.
    ///
    /// Quartiles use linear interpolation. When `Q1 == Q3` the fences
    /// collapse to a single point and every value is set to it.
    pub fn cap_iqr(
        df: &mut DataFrame,
        column: &str,
        multiplier: f64,
        processing_steps: &mut Vec<String>,
    ) -> Result<OutlierRecord> {
        let series = df.column(column)?.as_materialized_series().clone();
        let cells = f64_cells(&series)?;

        let mut sorted: Vec<f64> = cells.iter().flatten().copied().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let (q1, q3) = match (quantile_linear(&sorted, 0.25), quantile_linear(&sorted, 0.75)) {
            (Some(q1), Some(q3)) => (q1, q3),
            _ => {
                return Err(PipelineError::insufficient(
                    column,
                    "no values to compute quartiles from",
                ));
            }
        };
        let iqr = q3 - q1;
        let lower = q1 - multiplier * iqr;
        let upper = q3 + multiplier * iqr;

        let outliers_capped = sorted.iter().filter(|v| **v < lower || **v > upper).count();

        let capped: Vec<Option<f64>> = cells
            .into_iter()
            .map(|v| v.map(|val| val.clamp(lower, upper)))
            .collect();
        df.replace(column, Series::new(column.into(), capped))?;

        processing_steps.push(format!(
            "Capped {} outliers in '{}' to [{:.4}, {:.4}] (Q1={:.4}, Q3={:.4})",
            outliers_capped, column, lower, upper, q1, q3
        ));
        debug!(
            "Outlier fences for '{}': [{}, {}], {} values capped",
            column, lower, upper, outliers_capped
        );

        Ok(OutlierRecord {
            column: column.to_string(),
            q1,
            q3,
            iqr,
            lower,
            upper,
            outliers_capped,
        })
    }
}
