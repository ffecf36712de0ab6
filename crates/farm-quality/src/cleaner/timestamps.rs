//! Synthesized reading timestamps.
//!
//! The raw data carries no time information, so every row gets a timestamp
//! on a fixed grid ending near the generation instant.

use crate::error::{PipelineError, Result};
use crate::types::TimestampRange;
use chrono::{NaiveDateTime, TimeDelta};
use polars::prelude::*;

/// Timestamps for `rows` readings: row `i` is
/// `generated_at - lookback_days + i * interval_minutes`.
///
/// Fails with [`PipelineError::InvalidConfig`] when the grid falls outside
/// the representable date range.
pub fn timestamp_grid(
    generated_at: NaiveDateTime,
    rows: usize,
    lookback_days: i64,
    interval_minutes: i64,
) -> Result<Vec<NaiveDateTime>> {
    let out_of_range = || {
        PipelineError::InvalidConfig(format!(
            "timestamp grid of {} rows every {} minutes from {} days back is out of range",
            rows, interval_minutes, lookback_days
        ))
    };

    let start = TimeDelta::try_days(lookback_days)
        .and_then(|lookback| generated_at.checked_sub_signed(lookback))
        .ok_or_else(out_of_range)?;

    (0..rows)
        .map(|i| {
            i64::try_from(i)
                .ok()
                .and_then(|i| interval_minutes.checked_mul(i))
                .and_then(TimeDelta::try_minutes)
                .and_then(|offset| start.checked_add_signed(offset))
                .ok_or_else(out_of_range)
        })
        .collect()
}

/// Build the timestamp column as a millisecond `Datetime` series.
pub fn timestamp_series(name: &str, timestamps: &[NaiveDateTime]) -> PolarsResult<Series> {
    let millis: Vec<i64> = timestamps
        .iter()
        .map(|ts| ts.and_utc().timestamp_millis())
        .collect();
    Series::new(name.into(), millis).cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
}

/// Read a millisecond `Datetime` column back into naive timestamps.
pub fn read_timestamps(series: &Series) -> Result<Vec<Option<NaiveDateTime>>> {
    let target = DataType::Datetime(TimeUnit::Milliseconds, None);
    if !matches!(series.dtype(), DataType::Datetime(_, _)) {
        return Err(PipelineError::UnexpectedSchema(format!(
            "column '{}' is {}, expected a datetime",
            series.name(),
            series.dtype()
        )));
    }

    let millis = series.cast(&target)?.cast(&DataType::Int64)?;
    Ok(millis
        .i64()?
        .into_iter()
        .map(|v| v.and_then(chrono::DateTime::from_timestamp_millis).map(|dt| dt.naive_utc()))
        .collect())
}

/// Add the synthesized timestamp column to `df`.
pub fn attach_timestamps(
    df: &mut DataFrame,
    name: &str,
    generated_at: NaiveDateTime,
    lookback_days: i64,
    interval_minutes: i64,
) -> Result<Option<TimestampRange>> {
    let grid = timestamp_grid(generated_at, df.height(), lookback_days, interval_minutes)?;
    df.with_column(timestamp_series(name, &grid)?)?;

    Ok(match (grid.first(), grid.last()) {
        (Some(start), Some(end)) => Some(TimestampRange {
            start: *start,
            end: *end,
            interval_minutes,
        }),
        _ => None,
    })
}
