//! Data cleaning for raw sensor readings.
//!
//! The cleaner runs a fixed sequence of steps over a copy of the raw table:
//! - Median fill for numeric columns, mode fill for string columns
//! - IQR capping of `MOI`, `temp` and `humidity`
//! - A synthesized `timestamp` column
//! - Whitespace trimming of column names
//!
//! The raw table is never modified.

pub mod outliers;
pub mod timestamps;

pub use outliers::OutlierHandler;

use crate::config::CleaningConfig;
use crate::error::{PipelineError, Result};
use crate::imputers::StatisticalImputer;
use crate::pipeline::PipelineStage;
use crate::schema::{CONTINUOUS_COLUMNS, TIMESTAMP, resolve_column, validate_schema};
use crate::types::{CleanedTable, CleaningReport};
use crate::utils::total_missing;
use chrono::{Local, NaiveDateTime};
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Turns a raw sensor table into a [`CleanedTable`].
#[derive(Debug, Clone, Default)]
pub struct DataCleaner {
    config: CleaningConfig,
}

impl DataCleaner {
    pub fn new(config: CleaningConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Clean `raw`, synthesizing timestamps relative to the current local time.
    pub fn clean(&self, raw: &DataFrame) -> Result<CleanedTable> {
        self.clean_at(raw, Local::now().naive_local())
    }

    /// Clean `raw` with an explicit generation instant.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::EmptyDataset`] if `raw` has no rows
    /// - [`PipelineError::UnexpectedSchema`] if a required column is absent
    ///   or a continuous column holds non-numeric text
    /// - [`PipelineError::InsufficientData`] if a column needing imputation
    ///   has no non-missing values
    pub fn clean_at(&self, raw: &DataFrame, generated_at: NaiveDateTime) -> Result<CleanedTable> {
        self.clean_observed(raw, generated_at, |_| {})
    }

    /// Same as [`clean_at`](Self::clean_at), calling `on_stage` as each
    /// step begins.
    pub fn clean_observed<F>(
        &self,
        raw: &DataFrame,
        generated_at: NaiveDateTime,
        mut on_stage: F,
    ) -> Result<CleanedTable>
    where
        F: FnMut(PipelineStage),
    {
        if raw.height() == 0 {
            return Err(PipelineError::EmptyDataset(
                "raw table has no rows".to_string(),
            ));
        }
        validate_schema(raw)?;

        info!(
            "Cleaning {} rows x {} columns",
            raw.height(),
            raw.width()
        );

        let mut report = CleaningReport {
            rows: raw.height(),
            missing_before: total_missing(raw)?,
            ..Default::default()
        };
        let mut df = raw.clone();

        Self::coerce_continuous(&mut df)?;

        // 1. Imputation, statistics taken from the raw values
        on_stage(PipelineStage::Imputation);
        report.imputations = StatisticalImputer::impute(&mut df, &mut report.processing_steps)?;
        if report.imputations.is_empty() {
            report
                .processing_steps
                .push("No missing values to impute".to_string());
        }

        // 2. Outlier capping on the imputed columns
        on_stage(PipelineStage::OutlierHandling);
        for logical in &self.config.outlier_columns {
            let column = resolve_column(&df, logical).ok_or_else(|| {
                PipelineError::UnexpectedSchema(format!(
                    "outlier column '{}' not found",
                    logical
                ))
            })?;
            let record = OutlierHandler::cap_iqr(
                &mut df,
                &column,
                self.config.iqr_multiplier,
                &mut report.processing_steps,
            )?;
            report.total_outliers_capped += record.outliers_capped;
            report.outliers.push(record);
        }

        // 3. Timestamps
        on_stage(PipelineStage::TimestampSynthesis);
        if df.get_column_names().iter().any(|c| c.as_str() == TIMESTAMP) {
            warn!("Replacing existing '{}' column", TIMESTAMP);
        }
        report.timestamps = timestamps::attach_timestamps(
            &mut df,
            TIMESTAMP,
            generated_at,
            self.config.lookback_days,
            self.config.timestamp_interval_minutes,
        )?;
        if let Some(range) = &report.timestamps {
            report.processing_steps.push(format!(
                "Synthesized timestamps from {} to {} every {} minutes",
                range.start, range.end, range.interval_minutes
            ));
        }

        // 4. Column names
        let (df, renamed) = Self::trim_column_names(df)?;
        for (before, after) in &renamed {
            report
                .processing_steps
                .push(format!("Renamed column '{}' to '{}'", before, after));
        }
        report.renamed_columns = renamed;

        report.missing_after = total_missing(&df)?;
        debug!(
            "Cleaning finished: {} cells imputed, {} outliers capped",
            report.cells_imputed(),
            report.total_outliers_capped
        );

        Ok(CleanedTable::new(df, generated_at, report))
    }

    /// Cast the continuous columns to `Float64` so imputation treats them
    /// as numeric even when every cell is missing.
    fn coerce_continuous(df: &mut DataFrame) -> Result<()> {
        for logical in CONTINUOUS_COLUMNS {
            let Some(column) = resolve_column(df, logical) else {
                continue;
            };
            let series = df.column(&column)?.as_materialized_series();
            if series.dtype() == &DataType::Float64 {
                continue;
            }

            let cast = series.strict_cast(&DataType::Float64).map_err(|e| {
                PipelineError::UnexpectedSchema(format!(
                    "column '{}' is not numeric: {}",
                    column, e
                ))
            })?;
            df.replace(&column, cast)?;
        }
        Ok(())
    }

    fn trim_column_names(df: DataFrame) -> Result<(DataFrame, Vec<(String, String)>)> {
        let mut renamed = Vec::new();
        let mut columns = Vec::with_capacity(df.width());

        for col in df.get_columns() {
            let mut series = col.as_materialized_series().clone();
            let name = series.name().to_string();
            let trimmed = name.trim();
            if trimmed != name {
                series.rename(trimmed.into());
                renamed.push((name.clone(), trimmed.to_string()));
            }
            columns.push(Column::from(series));
        }

        Ok((DataFrame::new(columns)?, renamed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{HUMIDITY, MOISTURE, SOIL_TYPE, TEMPERATURE};
    use chrono::{Duration, NaiveDate};

    fn instant() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn readings() -> DataFrame {
        df![
            "MOI" => [Some(1.0), Some(2.0), Some(3.0), None, Some(2.0)],
            "temp" => [Some(10.0), Some(12.0), None, Some(1000.0), Some(11.0)],
            "humidity" => [Some(50.0), Some(55.0), Some(52.0), Some(51.0), Some(53.0)],
            "soil_type" => [Some("clay"), Some("sand"), None, Some("clay"), Some("loam")],
            "crop ID" => ["Wheat", "Wheat", "Carrot", "Carrot", "Wheat"],
            "Seedling Stage" => ["Germination", "Germination", "Leaf", "Leaf", "Flowering"],
            "result" => [1i64, 0, 1, 1, 0],
        ]
        .unwrap()
    }

    fn f64_column(df: &DataFrame, name: &str) -> Vec<f64> {
        df.column(name)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect()
    }

    #[test]
    fn test_clean_temperature_scenario() {
        let cleaned = DataCleaner::default().clean_at(&readings(), instant()).unwrap();

        assert_eq!(
            f64_column(cleaned.data(), TEMPERATURE),
            vec![10.0, 12.0, 11.5, 13.5, 11.0]
        );
        let temp = cleaned
            .report()
            .outliers
            .iter()
            .find(|r| r.column == TEMPERATURE)
            .unwrap();
        assert_eq!(temp.outliers_capped, 1);
    }

    #[test]
    fn test_clean_fills_every_cell() {
        let raw = readings();
        let cleaned = DataCleaner::default().clean_at(&raw, instant()).unwrap();

        assert_eq!(cleaned.height(), raw.height());
        assert_eq!(cleaned.report().missing_before, 3);
        assert_eq!(cleaned.report().missing_after, 0);
        assert_eq!(cleaned.report().cells_imputed(), 3);

        let soil: Vec<&str> = cleaned
            .data()
            .column(SOIL_TYPE)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(soil[2], "clay");
    }

    #[test]
    fn test_raw_not_modified() {
        let raw = readings();
        DataCleaner::default().clean_at(&raw, instant()).unwrap();
        assert_eq!(raw.column(TEMPERATURE).unwrap().null_count(), 1);
        assert!(raw.equals_missing(&readings()));
    }

    #[test]
    fn test_timestamps_start_and_spacing() {
        let cleaned = DataCleaner::default().clean_at(&readings(), instant()).unwrap();
        let range = cleaned.report().timestamps.clone().unwrap();

        assert_eq!(range.start, instant() - Duration::days(30));
        assert_eq!(range.end, range.start + Duration::minutes(60));
        assert_eq!(cleaned.generated_at(), instant());
    }

    #[test]
    fn test_trims_column_names() {
        let raw = df![
            "MOI" => [1.0, 2.0, 3.0],
            " temp " => [20.0, 21.0, 22.0],
            "humidity" => [50.0, 55.0, 52.0],
            "soil_type" => ["clay", "sand", "clay"],
            "crop ID" => ["Wheat", "Wheat", "Carrot"],
            "Seedling Stage" => ["Germination", "Leaf", "Leaf"],
            "result" => [1i64, 0, 1],
        ]
        .unwrap();

        let cleaned = DataCleaner::default().clean_at(&raw, instant()).unwrap();

        assert!(cleaned.data().column(TEMPERATURE).is_ok());
        assert_eq!(
            cleaned.report().renamed_columns,
            vec![(" temp ".to_string(), "temp".to_string())]
        );
    }

    #[test]
    fn test_clean_observed_stage_order() {
        let mut stages = Vec::new();
        DataCleaner::default()
            .clean_observed(&readings(), instant(), |stage| stages.push(stage))
            .unwrap();

        assert_eq!(
            stages,
            vec![
                PipelineStage::Imputation,
                PipelineStage::OutlierHandling,
                PipelineStage::TimestampSynthesis,
            ]
        );
    }

    #[test]
    fn test_empty_dataset() {
        let raw = readings().head(Some(0));
        let err = DataCleaner::default().clean_at(&raw, instant()).unwrap_err();
        assert_eq!(err.error_code(), "EMPTY_DATASET");
    }

    #[test]
    fn test_missing_column() {
        let raw = readings().drop(HUMIDITY).unwrap();
        let err = DataCleaner::default().clean_at(&raw, instant()).unwrap_err();
        assert_eq!(err.error_code(), "UNEXPECTED_SCHEMA");
    }

    #[test]
    fn test_all_missing_continuous_column() {
        let mut raw = readings();
        raw.replace(
            MOISTURE,
            Series::new(MOISTURE.into(), vec![None::<&str>; 5]),
        )
        .unwrap();

        let err = DataCleaner::default().clean_at(&raw, instant()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientData { ref column, .. } if column == MOISTURE
        ));
    }

    #[test]
    fn test_text_in_continuous_column() {
        let mut raw = readings();
        raw.replace(
            HUMIDITY,
            Series::new(HUMIDITY.into(), vec!["50", "wet", "52", "51", "53"]),
        )
        .unwrap();

        let err = DataCleaner::default().clean_at(&raw, instant()).unwrap_err();
        assert_eq!(err.error_code(), "UNEXPECTED_SCHEMA");
    }

    #[test]
    fn test_recleaning_can_move_interpolated_fences() {
        // Q1 falls 3/4 of the way between the two lowest values, so the
        // clamped minimum pulls the next pass's lower fence inward.
        let raw = df![
            "MOI" => [-100.0, 0.0, 0.0, 0.0],
            "temp" => [20.0, 21.0, 22.0, 23.0],
            "humidity" => [50.0, 51.0, 52.0, 53.0],
            "soil_type" => ["clay", "clay", "sand", "loam"],
            "crop ID" => ["Wheat", "Wheat", "Carrot", "Carrot"],
            "Seedling Stage" => ["Leaf", "Leaf", "Leaf", "Flowering"],
            "result" => [1i64, 0, 1, 1],
        ]
        .unwrap();
        let cleaner = DataCleaner::default();

        let once = cleaner.clean_at(&raw, instant()).unwrap();
        assert_eq!(f64_column(once.data(), MOISTURE), vec![-62.5, 0.0, 0.0, 0.0]);

        let twice = cleaner.clean_at(once.data(), instant()).unwrap();
        assert_eq!(f64_column(twice.data(), MOISTURE), vec![-39.0625, 0.0, 0.0, 0.0]);
        assert_eq!(
            f64_column(twice.data(), TEMPERATURE),
            f64_column(once.data(), TEMPERATURE)
        );
    }
}
