//! Custom error types for the sensor data quality pipeline.
//!
//! This module provides the error hierarchy using `thiserror`. Every variant
//! is terminal for the current run: the pipeline never retries and never
//! returns a partially cleaned table.
//!
//! Errors are serializable as `{ code, message }` so presenters can show
//! them as a blocking message.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the sensor data quality pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// None of the candidate dataset paths point at a readable file.
    #[error("Dataset not found, tried: {}", .tried.join(", "))]
    DataNotFound { tried: Vec<String> },

    /// A required column is missing or has the wrong shape.
    #[error("Unexpected schema: {0}")]
    UnexpectedSchema(String),

    /// The table has no rows (or no cells) where at least one is required.
    #[error("Dataset is empty: {0}")]
    EmptyDataset(String),

    /// A column has no non-missing values to derive an imputation statistic from.
    #[error("Insufficient data in column '{column}': {reason}")]
    InsufficientData { column: String, reason: String },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PipelineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for [`PipelineError::InsufficientData`].
    pub fn insufficient(column: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::InsufficientData {
            column: column.into(),
            reason: reason.into(),
        }
    }

    /// Get error code for presenter handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DataNotFound { .. } => "DATA_NOT_FOUND",
            Self::UnexpectedSchema(_) => "UNEXPECTED_SCHEMA",
            Self::EmptyDataset(_) => "EMPTY_DATASET",
            Self::InsufficientData { .. } => "INSUFFICIENT_DATA",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// The innermost error, with all context layers removed.
    pub fn root(&self) -> &PipelineError {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for PipelineError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PipelineError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PipelineError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::io::Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PipelineError::Io(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            PipelineError::EmptyDataset("raw".to_string()).error_code(),
            "EMPTY_DATASET"
        );
        assert_eq!(
            PipelineError::insufficient("temp", "all values missing").error_code(),
            "INSUFFICIENT_DATA"
        );
    }

    #[test]
    fn test_data_not_found_lists_paths() {
        let error = PipelineError::DataNotFound {
            tried: vec!["a.csv".to_string(), "b.csv".to_string()],
        };
        assert!(error.to_string().contains("a.csv, b.csv"));
    }

    #[test]
    fn test_error_serialization() {
        let error = PipelineError::UnexpectedSchema("missing column 'MOI'".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("UNEXPECTED_SCHEMA"));
        assert!(json.contains("MOI"));
    }

    #[test]
    fn test_with_context() {
        let error = PipelineError::insufficient("temp", "no values").with_context("During cleaning");
        assert!(error.to_string().contains("During cleaning"));
        assert_eq!(error.error_code(), "INSUFFICIENT_DATA");
        assert!(matches!(error.root(), PipelineError::InsufficientData { .. }));
    }
}
