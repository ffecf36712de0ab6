//! Chart data for the batch report and the dashboard.
//!
//! Charts are emitted as plain data series; rendering is left to whatever
//! consumes `charts.json`.

use crate::cleaner::timestamps::read_timestamps;
use crate::error::{PipelineError, Result};
use crate::profiler::DataProfiler;
use crate::schema::{
    CORRELATION_COLUMNS, CROP_ID, HUMIDITY, MOISTURE, RESULT, SOIL_TYPE, TEMPERATURE, TIMESTAMP,
    resolve_column,
};
use crate::types::{CorrelationMatrix, CrossTab, PipelineRun, QualityScore};
use crate::utils::{f64_cells, quantile_linear, rolling_mean, string_cells};
use chrono::NaiveDateTime;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bins per distribution histogram.
pub const HISTOGRAM_BINS: usize = 30;

/// Rows shown in the batch trend chart.
pub const TREND_ROWS: usize = 1000;

/// Rolling window of the batch trend chart.
pub const TREND_WINDOW: usize = 10;

/// Target line drawn on the quality chart.
pub const QUALITY_TARGET: f64 = 0.8;

/// Reading columns in chart order.
pub const READING_COLUMNS: [&str; 3] = [TEMPERATURE, HUMIDITY, MOISTURE];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub column: String,
    pub bins: Vec<HistogramBin>,
}

/// Rolling mean of one reading over the synthesized timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSeries {
    pub column: String,
    pub window: usize,
    pub timestamps: Vec<NaiveDateTime>,
    pub rolling_mean: Vec<Option<f64>>,
}

/// Box plot statistics. Whiskers reach the furthest values within
/// 1.5 IQR of the quartiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxStats {
    pub group: String,
    pub count: usize,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedBoxPlot {
    pub column: String,
    pub group_column: String,
    pub boxes: Vec<BoxStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityChart {
    pub bars: Vec<QualityBar>,
    pub target: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityBar {
    pub metric: String,
    pub value: f64,
}

/// The full chart set written to `charts.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSet {
    /// Raw distributions of `temp`, `humidity` and `MOI`.
    pub distributions: Vec<Histogram>,
    /// Raw result counts per crop.
    pub result_per_crop: CrossTab,
    pub correlation: CorrelationMatrix,
    pub trend: Vec<TrendSeries>,
    pub box_per_crop: Vec<GroupedBoxPlot>,
    pub crop_per_soil: CrossTab,
    pub quality: QualityChart,
}

/// Equal-width histogram over `[min, max]`; the last bin includes `max`.
///
/// A constant input gets a single-unit range centred on its value.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;

    let mut counts = vec![0usize; bins];
    for v in values {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            start: lo + width * i as f64,
            end: lo + width * (i + 1) as f64,
            count,
        })
        .collect()
}

/// Box statistics of a group's values.
pub fn box_stats(group: &str, values: &[f64]) -> Option<BoxStats> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let q1 = quantile_linear(&sorted, 0.25)?;
    let median = quantile_linear(&sorted, 0.5)?;
    let q3 = quantile_linear(&sorted, 0.75)?;
    let iqr = q3 - q1;
    let (lo_fence, hi_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

    let inside: Vec<f64> = sorted
        .iter()
        .copied()
        .filter(|v| *v >= lo_fence && *v <= hi_fence)
        .collect();

    Some(BoxStats {
        group: group.to_string(),
        count: sorted.len(),
        q1,
        median,
        q3,
        lower_whisker: inside.first().copied().unwrap_or(q1),
        upper_whisker: inside.last().copied().unwrap_or(q3),
        outliers: sorted.len() - inside.len(),
    })
}

fn require(df: &DataFrame, logical: &str) -> Result<String> {
    resolve_column(df, logical)
        .ok_or_else(|| PipelineError::UnexpectedSchema(format!("column '{}' not found", logical)))
}

/// Distribution of a numeric column.
pub fn column_histogram(df: &DataFrame, column: &str, bins: usize) -> Result<Histogram> {
    let name = require(df, column)?;
    let values: Vec<f64> = f64_cells(df.column(&name)?.as_materialized_series())?
        .into_iter()
        .flatten()
        .collect();

    Ok(Histogram {
        column: column.to_string(),
        bins: histogram(&values, bins),
    })
}

/// Box statistics of `value_column` for each value of `group_column`,
/// groups in sorted order.
pub fn grouped_box_plot(
    df: &DataFrame,
    group_column: &str,
    value_column: &str,
) -> Result<GroupedBoxPlot> {
    let groups = string_cells(df.column(&require(df, group_column)?)?.as_materialized_series())?;
    let values = f64_cells(df.column(&require(df, value_column)?)?.as_materialized_series())?;

    let mut by_group: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for (g, v) in groups.into_iter().zip(values) {
        if let (Some(g), Some(v)) = (g, v) {
            by_group.entry(g).or_default().push(v);
        }
    }

    Ok(GroupedBoxPlot {
        column: value_column.to_string(),
        group_column: group_column.to_string(),
        boxes: by_group
            .iter()
            .filter_map(|(g, vals)| box_stats(g, vals))
            .collect(),
    })
}

/// Rolling means of `columns` over the first `rows` rows of a cleaned table.
pub fn trend_series(
    df: &DataFrame,
    columns: &[&str],
    rows: usize,
    window: usize,
) -> Result<Vec<TrendSeries>> {
    let subset = df.head(Some(rows));
    let timestamps: Vec<NaiveDateTime> =
        read_timestamps(subset.column(&require(&subset, TIMESTAMP)?)?.as_materialized_series())?
            .into_iter()
            .flatten()
            .collect();

    let mut series = Vec::with_capacity(columns.len());
    for column in columns {
        let name = require(&subset, column)?;
        let values: Vec<f64> = f64_cells(subset.column(&name)?.as_materialized_series())?
            .into_iter()
            .flatten()
            .collect();
        series.push(TrendSeries {
            column: column.to_string(),
            window,
            timestamps: timestamps.clone(),
            rolling_mean: rolling_mean(&values, window),
        });
    }
    Ok(series)
}

pub fn quality_chart(score: &QualityScore) -> QualityChart {
    QualityChart {
        bars: score
            .metrics()
            .iter()
            .map(|(metric, value)| QualityBar {
                metric: metric.to_string(),
                value: *value,
            })
            .collect(),
        target: QUALITY_TARGET,
    }
}

/// Build the fixed chart set of a pipeline run.
pub fn build_charts(run: &PipelineRun) -> Result<ChartSet> {
    let cleaned = run.cleaned.data();

    let distributions = READING_COLUMNS
        .iter()
        .map(|c| column_histogram(&run.raw, c, HISTOGRAM_BINS))
        .collect::<Result<Vec<_>>>()?;

    let box_per_crop = READING_COLUMNS
        .iter()
        .map(|c| grouped_box_plot(cleaned, CROP_ID, c))
        .collect::<Result<Vec<_>>>()?;

    Ok(ChartSet {
        distributions,
        result_per_crop: DataProfiler::crosstab(&run.raw, CROP_ID, RESULT)?,
        correlation: DataProfiler::correlation(cleaned, &CORRELATION_COLUMNS)?,
        trend: trend_series(cleaned, &READING_COLUMNS, TREND_ROWS, TREND_WINDOW)?,
        box_per_crop,
        crop_per_soil: DataProfiler::crosstab(cleaned, SOIL_TYPE, CROP_ID)?,
        quality: quality_chart(&run.score),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_counts_every_value() {
        let values = [0.0, 1.0, 2.0, 3.0, 4.0, 10.0];
        let bins = histogram(&values, 5);

        assert_eq!(bins.len(), 5);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 6);
        assert_eq!(bins[0].start, 0.0);
        assert_eq!(bins[4].end, 10.0);
        assert_eq!(bins[4].count, 1);
        assert_eq!(bins[0].count, 2);
    }

    #[test]
    fn test_histogram_constant() {
        let bins = histogram(&[3.0, 3.0], 2);
        assert_eq!(bins[0].start, 2.5);
        assert_eq!(bins[1].end, 3.5);
        assert_eq!(bins[1].count, 2);
    }

    #[test]
    fn test_box_stats() {
        let stats = box_stats("Wheat", &[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();

        assert_eq!(stats.q1, 2.0);
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.q3, 4.0);
        assert_eq!(stats.lower_whisker, 1.0);
        assert_eq!(stats.upper_whisker, 4.0);
        assert_eq!(stats.outliers, 1);
        assert!(box_stats("empty", &[]).is_none());
    }

    #[test]
    fn test_grouped_box_plot() {
        let df = df![
            "crop ID" => ["Wheat", "Carrot", "Wheat", "Carrot"],
            "temp" => [10.0, 20.0, 12.0, 22.0],
        ]
        .unwrap();

        let plot = grouped_box_plot(&df, CROP_ID, "temp").unwrap();
        let groups: Vec<&str> = plot.boxes.iter().map(|b| b.group.as_str()).collect();
        assert_eq!(groups, vec!["Carrot", "Wheat"]);
        assert_eq!(plot.boxes[1].median, 11.0);
    }

    #[test]
    fn test_quality_chart_has_target() {
        let score = QualityScore {
            accuracy: 0.9,
            completeness: 0.9,
            timeliness: 1.0,
            overall: 14.0 / 15.0,
            breakdown: crate::types::QualityBreakdown {
                missing_cells: 1,
                non_missing_cells: 9,
                total_cells: 10,
                recent_rows: 1,
                total_rows: 1,
            },
        };
        let chart = quality_chart(&score);
        assert_eq!(chart.bars.len(), 4);
        assert_eq!(chart.bars[2].metric, "Timeliness");
        assert_eq!(chart.target, 0.8);
    }
}
