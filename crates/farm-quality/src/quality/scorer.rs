use crate::cleaner::timestamps::read_timestamps;
use crate::error::{PipelineError, Result};
use crate::schema::TIMESTAMP;
use crate::types::{CleanedTable, QualityBreakdown, QualityScore};
use crate::utils::total_missing;
use chrono::{Local, NaiveDateTime, TimeDelta};
use polars::prelude::*;
use tracing::debug;

/// Computes the Accuracy / Completeness / Timeliness score of a dataset.
///
/// Cell counts come from the raw table. Timeliness reads the cleaned
/// table's synthesized timestamps.
#[derive(Debug, Clone)]
pub struct QualityScorer {
    lookback_days: i64,
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self { lookback_days: 30 }
    }
}

impl QualityScorer {
    pub fn new(lookback_days: i64) -> Self {
        Self { lookback_days }
    }

    /// Score against the current local time.
    pub fn score(&self, raw: &DataFrame, cleaned: &CleanedTable) -> Result<QualityScore> {
        self.score_at(raw, cleaned, Local::now().naive_local())
    }

    /// Score with an explicit "now".
    ///
    /// - accuracy = 1 - missing / total cells
    /// - completeness = non-missing / total cells
    /// - timeliness = rows with timestamp >= now - lookback, over raw rows
    /// - overall = mean of the three
    pub fn score_at(
        &self,
        raw: &DataFrame,
        cleaned: &CleanedTable,
        now: NaiveDateTime,
    ) -> Result<QualityScore> {
        let total_rows = raw.height();
        let total_cells = total_rows * raw.width();
        if total_cells == 0 {
            return Err(PipelineError::EmptyDataset(
                "cannot score a table with no cells".to_string(),
            ));
        }

        let missing_cells = total_missing(raw)?;
        let non_missing_cells = total_cells - missing_cells;

        let accuracy = 1.0 - missing_cells as f64 / total_cells as f64;
        let completeness = non_missing_cells as f64 / total_cells as f64;

        let cutoff = TimeDelta::try_days(self.lookback_days)
            .and_then(|lookback| now.checked_sub_signed(lookback))
            .ok_or_else(|| {
                PipelineError::InvalidConfig(format!(
                    "lookback of {} days is out of range",
                    self.lookback_days
                ))
            })?;
        let timestamps = cleaned
            .data()
            .column(TIMESTAMP)
            .map_err(|_| {
                PipelineError::UnexpectedSchema(format!(
                    "cleaned table has no '{}' column",
                    TIMESTAMP
                ))
            })?
            .as_materialized_series();
        let recent_rows = read_timestamps(timestamps)?
            .into_iter()
            .flatten()
            .filter(|ts| *ts >= cutoff)
            .count();
        let timeliness = recent_rows as f64 / total_rows as f64;

        let overall = (accuracy + completeness + timeliness) / 3.0;
        debug!(
            "Quality: accuracy={:.4}, completeness={:.4}, timeliness={:.4}, overall={:.4}",
            accuracy, completeness, timeliness, overall
        );

        Ok(QualityScore {
            accuracy,
            completeness,
            timeliness,
            overall,
            breakdown: QualityBreakdown {
                missing_cells,
                non_missing_cells,
                total_cells,
                recent_rows,
                total_rows,
            },
        })
    }
}
