//! The cleaning and scoring pipeline and its builder.

use crate::cleaner::DataCleaner;
use crate::config::{ConfigValidationError, PipelineConfig};
use crate::error::Result;
use crate::loader::DatasetLoader;
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::profiler::DataProfiler;
use crate::quality::QualityScorer;
use crate::types::PipelineRun;
use chrono::{Local, NaiveDateTime};
use polars::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Loads, cleans and scores the sensor dataset.
///
/// Use [`Pipeline::builder()`] to create a new pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use farm_quality::{Pipeline, PipelineConfig};
///
/// let run = Pipeline::builder()
///     .config(PipelineConfig::builder().input_path("readings.csv").build()?)
///     .on_progress(|update| println!("{}", update.message))
///     .build()?
///     .run()?;
///
/// println!("overall quality: {:.1}%", run.score.overall * 100.0);
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    loader: DatasetLoader,
    cleaner: DataCleaner,
    scorer: QualityScorer,
}

static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load the dataset from the first existing candidate path and process it.
    pub fn run(&self) -> Result<PipelineRun> {
        self.finish(self.run_internal())
    }

    /// Process an already loaded raw table using the current time.
    pub fn process(&self, raw: DataFrame) -> Result<PipelineRun> {
        let now = Local::now().naive_local();
        self.finish(self.process_internal(None, raw, now, None))
    }

    /// Process a raw table with an explicit clock.
    ///
    /// Timestamps are synthesized relative to `generated_at` and the
    /// score is taken at the same instant.
    pub fn process_at(&self, raw: DataFrame, generated_at: NaiveDateTime) -> Result<PipelineRun> {
        self.finish(self.process_internal(None, raw, generated_at, Some(generated_at)))
    }

    fn finish(&self, result: Result<PipelineRun>) -> Result<PipelineRun> {
        match result {
            Ok(run) => {
                self.report_progress(ProgressUpdate::complete(format!(
                    "Pipeline completed: overall quality {:.1}%",
                    run.score.overall * 100.0
                )));
                Ok(run)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn run_internal(&self) -> Result<PipelineRun> {
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Loading,
            "Locating dataset...",
        ));
        let (path, raw) = self.loader.load_with_path()?;
        let now = Local::now().naive_local();
        self.process_internal(Some(path), raw, now, None)
    }

    /// `score_now` of `None` reads the clock again after cleaning.
    fn process_internal(
        &self,
        source_path: Option<PathBuf>,
        raw: DataFrame,
        generated_at: NaiveDateTime,
        score_now: Option<NaiveDateTime>,
    ) -> Result<PipelineRun> {
        let start_time = Instant::now();
        info!(
            "Starting pipeline: {} rows x {} columns",
            raw.height(),
            raw.width()
        );

        let cleaned = self.cleaner.clean_observed(&raw, generated_at, |stage| {
            self.report_progress(ProgressUpdate::new(stage, stage.display_name()));
        })?;

        self.report_progress(ProgressUpdate::new(
            PipelineStage::QualityScoring,
            "Computing quality score...",
        ));
        let score = match score_now {
            Some(now) => self.scorer.score_at(&raw, &cleaned, now)?,
            None => self.scorer.score(&raw, &cleaned)?,
        };
        let profile = DataProfiler::profile(&raw)?;

        info!(
            "Pipeline finished in {:.2?}: accuracy={:.4}, completeness={:.4}, timeliness={:.4}, overall={:.4}",
            start_time.elapsed(),
            score.accuracy,
            score.completeness,
            score.timeliness,
            score.overall
        );

        Ok(PipelineRun {
            source_path,
            raw,
            cleaned,
            score,
            profile,
        })
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            loader: DatasetLoader::from_config(&config),
            cleaner: DataCleaner::new(config.cleaning.clone()),
            scorer: QualityScorer::new(config.cleaning.lookback_days),
            progress_reporter: self.progress_reporter,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    fn readings() -> DataFrame {
        df![
            "MOI" => [Some(1.0), Some(2.0), None, Some(4.0)],
            "temp" => [20.0, 21.0, 22.0, 23.0],
            "humidity" => [50.0, 51.0, 52.0, 53.0],
            "soil_type" => ["clay", "sand", "clay", "loam"],
            "crop ID" => ["Wheat", "Wheat", "Carrot", "Carrot"],
            "Seedling Stage" => ["Leaf", "Leaf", "Leaf", "Flowering"],
            "result" => [1i64, 0, 1, 1],
        ]
        .unwrap()
    }

    fn instant() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_pipeline_builder_default() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert_eq!(pipeline.config().cleaning.iqr_multiplier, 1.5);
    }

    #[test]
    fn test_pipeline_builder_rejects_invalid_config() {
        let mut config = PipelineConfig::default();
        config.cleaning.timestamp_interval_minutes = 0;
        assert!(Pipeline::builder().config(config).build().is_err());
    }

    #[test]
    fn test_process_at_reports_stages() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&stages);

        let run = Pipeline::builder()
            .on_progress(move |u| sink.lock().unwrap().push(u.stage))
            .build()
            .unwrap()
            .process_at(readings(), instant())
            .unwrap();

        assert_eq!(run.cleaned.height(), 4);
        assert_eq!(run.score.timeliness, 1.0);
        assert_eq!(run.profile.total_missing, 1);
        assert!(run.source_path.is_none());
        assert_eq!(
            *stages.lock().unwrap(),
            vec![
                PipelineStage::Imputation,
                PipelineStage::OutlierHandling,
                PipelineStage::TimestampSynthesis,
                PipelineStage::QualityScoring,
                PipelineStage::Complete,
            ]
        );
    }

    #[test]
    fn test_failure_reports_failed_stage() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&stages);

        let result = Pipeline::builder()
            .on_progress(move |u| sink.lock().unwrap().push(u.stage))
            .build()
            .unwrap()
            .process_at(readings().head(Some(0)), instant());

        assert!(result.is_err());
        assert_eq!(stages.lock().unwrap().last(), Some(&PipelineStage::Failed));
    }

    #[test]
    fn test_run_without_dataset() {
        let config = PipelineConfig::builder()
            .candidate_paths(vec![PathBuf::from("no/such/file.csv")])
            .build()
            .unwrap();

        let err = Pipeline::builder().config(config).build().unwrap().run().unwrap_err();
        assert_eq!(err.error_code(), "DATA_NOT_FOUND");
    }
}
