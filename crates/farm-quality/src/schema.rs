//! Column layout of the smart farming sensor dataset.
//!
//! Names are matched exactly after trimming surrounding whitespace, so a
//! header written as `" temp "` resolves to [`TEMPERATURE`].

use crate::error::{PipelineError, Result};
use polars::prelude::*;

/// Soil moisture index.
pub const MOISTURE: &str = "MOI";
/// Air temperature in degrees Celsius.
pub const TEMPERATURE: &str = "temp";
/// Relative humidity in percent.
pub const HUMIDITY: &str = "humidity";
/// Soil type label.
pub const SOIL_TYPE: &str = "soil_type";
/// Crop identifier.
pub const CROP_ID: &str = "crop ID";
/// Growth phase of the crop at reading time.
pub const SEEDLING_STAGE: &str = "Seedling Stage";
/// Outcome code.
pub const RESULT: &str = "result";
/// Synthesized reading time added by the cleaner.
pub const TIMESTAMP: &str = "timestamp";

/// Every column the loader expects in the raw file.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    MOISTURE,
    TEMPERATURE,
    HUMIDITY,
    SOIL_TYPE,
    CROP_ID,
    SEEDLING_STAGE,
    RESULT,
];

/// Continuous sensor columns subject to IQR capping.
pub const CONTINUOUS_COLUMNS: [&str; 3] = [MOISTURE, TEMPERATURE, HUMIDITY];

/// Categorical columns offered as dashboard filters.
pub const FILTER_COLUMNS: [&str; 3] = [CROP_ID, SOIL_TYPE, SEEDLING_STAGE];

/// Columns used for the correlation matrix.
pub const CORRELATION_COLUMNS: [&str; 4] = [MOISTURE, TEMPERATURE, HUMIDITY, RESULT];

/// Find the raw column whose trimmed name equals `logical`.
pub fn resolve_column(df: &DataFrame, logical: &str) -> Option<String> {
    df.get_column_names()
        .into_iter()
        .find(|name| name.as_str().trim() == logical)
        .map(|name| name.to_string())
}

/// Check that every required column is present.
///
/// Returns the raw column names in [`REQUIRED_COLUMNS`] order.
pub fn validate_schema(df: &DataFrame) -> Result<Vec<String>> {
    let mut resolved = Vec::with_capacity(REQUIRED_COLUMNS.len());
    let mut missing = Vec::new();

    for logical in REQUIRED_COLUMNS {
        match resolve_column(df, logical) {
            Some(raw) => resolved.push(raw),
            None => missing.push(logical),
        }
    }

    if !missing.is_empty() {
        return Err(PipelineError::UnexpectedSchema(format!(
            "missing required column(s) {:?}; found {:?}",
            missing,
            df.get_column_names()
        )));
    }

    Ok(resolved)
}
