//! Progress reporting for the cleaning and scoring pipeline.
//!
//! # Example
//!
//! ```rust,ignore
//! use farm_quality::Pipeline;
//!
//! let run = Pipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run()?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of the pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Resolving and parsing the dataset
    Loading,
    /// Filling missing values
    Imputation,
    /// Capping continuous readings at their IQR fences
    OutlierHandling,
    /// Adding the synthesized timestamp column
    TimestampSynthesis,
    /// Computing the quality score and descriptive statistics
    QualityScoring,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline failed with an error
    Failed,
}

impl PipelineStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Loading => "Loading Data",
            Self::Imputation => "Imputing Values",
            Self::OutlierHandling => "Handling Outliers",
            Self::TimestampSynthesis => "Synthesizing Timestamps",
            Self::QualityScoring => "Scoring Quality",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Loading => 0.0,
            Self::Imputation => 0.30,
            Self::OutlierHandling => 0.55,
            Self::TimestampSynthesis => 0.75,
            Self::QualityScoring => 0.85,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

/// A single progress notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: PipelineStage,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Human-readable message describing current activity
    pub message: String,
}

impl ProgressUpdate {
    pub fn new(stage: PipelineStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            progress: stage.base_progress().clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(PipelineStage::Complete, message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(PipelineStage::Failed, message)
    }
}

/// Receives progress updates from the pipeline.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);
