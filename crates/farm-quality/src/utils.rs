//! Shared utilities for the sensor data quality pipeline.
//!
//! This module contains common helper functions used across the cleaner,
//! scorer, profiler and presenters so the statistics they report agree.

use polars::prelude::*;
use std::collections::BTreeMap;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Category of a data type for cleaning purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtypeCategory {
    /// Integer or floating point numbers
    Numeric,
    /// Date or datetime types
    Datetime,
    /// String/text type
    String,
    /// Other/unknown types
    Other,
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a datetime type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Datetime(_, _) | DataType::Date | DataType::Time
    )
}

/// Get the category of a DataType.
pub fn get_dtype_category(dtype: &DataType) -> DtypeCategory {
    if is_numeric_dtype(dtype) {
        DtypeCategory::Numeric
    } else if is_datetime_dtype(dtype) {
        DtypeCategory::Datetime
    } else if matches!(dtype, DataType::String) {
        DtypeCategory::String
    } else {
        DtypeCategory::Other
    }
}

// =============================================================================
// Value Extraction
// =============================================================================

/// Read a numeric Series as `f64` cells, treating `NaN` as missing.
pub fn f64_cells(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let floats = series.cast(&DataType::Float64)?;
    Ok(floats
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Non-missing values of a numeric Series, sorted ascending.
pub fn sorted_values(series: &Series) -> PolarsResult<Vec<f64>> {
    let mut values: Vec<f64> = f64_cells(series)?.into_iter().flatten().collect();
    values.sort_by(|a, b| a.total_cmp(b));
    Ok(values)
}

/// Read a Series as string cells, casting non-string columns first.
pub fn string_cells(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    let strings = series.cast(&DataType::String)?;
    Ok(strings
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

// =============================================================================
// Series Statistics Utilities
// =============================================================================

/// Quantile of already-sorted values using linear interpolation between
/// the two closest ranks (`pos = q * (n - 1)`).
///
/// Returns `None` for an empty slice.
pub fn quantile_linear(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let fraction = pos - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Median of a numeric Series over its non-missing values.
pub fn numeric_median(series: &Series) -> PolarsResult<Option<f64>> {
    Ok(quantile_linear(&sorted_values(series)?, 0.5))
}

/// Calculate the mode (most frequent value) of a string Series.
///
/// Ties are broken by taking the lexicographically smallest value, so the
/// result does not depend on row order.
pub fn string_mode(series: &Series) -> Option<String> {
    let cells = string_cells(series).ok()?;

    let mut value_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for val in cells.iter().flatten() {
        *value_counts.entry(val.as_str()).or_insert(0) += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for (val, count) in value_counts {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((val, count));
        }
    }

    best.map(|(val, _)| val.to_string())
}

/// Frequency of each non-missing value, most frequent first.
///
/// Equal counts are ordered by value.
pub fn value_counts(series: &Series) -> PolarsResult<Vec<(String, usize)>> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for val in string_cells(series)?.into_iter().flatten() {
        *counts.entry(val).or_insert(0) += 1;
    }

    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(counts)
}

/// Count missing cells in a Series (nulls, plus `NaN` for float columns).
pub fn missing_count(series: &Series) -> PolarsResult<usize> {
    match series.dtype() {
        DataType::Float32 | DataType::Float64 => {
            Ok(f64_cells(series)?.iter().filter(|v| v.is_none()).count())
        }
        _ => Ok(series.null_count()),
    }
}

/// Count missing cells across every column of a DataFrame.
pub fn total_missing(df: &DataFrame) -> PolarsResult<usize> {
    let mut total = 0;
    for col in df.get_columns() {
        total += missing_count(col.as_materialized_series())?;
    }
    Ok(total)
}

// =============================================================================
// Series Transformation Utilities
// =============================================================================

/// Fill null values in a numeric Series with a specific value.
///
/// The result is always `Float64`.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let filled: Vec<f64> = f64_cells(series)?
        .into_iter()
        .map(|v| v.unwrap_or(fill_value))
        .collect();

    Ok(Series::new(series.name().clone(), filled))
}

/// Fill null values in a string Series with a specific value.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let filled: Vec<String> = string_cells(series)?
        .into_iter()
        .map(|v| v.unwrap_or_else(|| fill_value.to_string()))
        .collect();

    Ok(Series::new(series.name().clone(), filled))
}

/// Replace `NaN` with null in a float Series; other dtypes are returned as-is.
pub fn nan_to_null(series: &Series) -> PolarsResult<Series> {
    match series.dtype() {
        DataType::Float32 | DataType::Float64 => {
            Ok(Series::new(series.name().clone(), f64_cells(series)?))
        }
        _ => Ok(series.clone()),
    }
}

/// Trailing rolling mean; the first `window - 1` positions are `None`.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= values[i - window];
        }
        if i + 1 >= window {
            out.push(Some(sum / window as f64));
        } else {
            out.push(None);
        }
    }
    out
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

// =============================================================================
// Tests
// =============================================================================
