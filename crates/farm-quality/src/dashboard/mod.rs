//! Interactive dashboard view model.
//!
//! The dashboard loads the dataset once per process, then answers view
//! requests for any combination of filters. Filters only subset the cleaned
//! table for display; they never change how data is cleaned or scored.

use crate::error::Result;
use crate::loader::DatasetCache;
use crate::pipeline::Pipeline;
use crate::profiler::DataProfiler;
use crate::reporting::charts::{
    GroupedBoxPlot, Histogram, QualityChart, READING_COLUMNS, TrendSeries, column_histogram,
    grouped_box_plot, quality_chart, trend_series,
};
use crate::schema::{
    CORRELATION_COLUMNS, CROP_ID, HUMIDITY, MOISTURE, RESULT, SEEDLING_STAGE, SOIL_TYPE,
    TEMPERATURE, resolve_column,
};
use crate::types::{CorrelationMatrix, PipelineRun, QualityScore, ValueCount};
use crate::utils::{f64_cells, mean, string_cells, value_counts};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Filter value that keeps every row.
pub const ALL: &str = "all";

/// Bins per dashboard histogram.
pub const DASHBOARD_BINS: usize = 25;

/// Rows shown in the raw data preview.
pub const PREVIEW_ROWS: usize = 100;

pub const MIN_TREND_POINTS: usize = 100;
pub const MAX_TREND_POINTS: usize = 5000;
pub const DEFAULT_TREND_POINTS: usize = 500;

static DATASET: DatasetCache<PipelineRun> = DatasetCache::new();

/// Load and process the dataset on first use; later calls reuse the result.
pub fn cached_run(pipeline: &Pipeline) -> Result<&'static PipelineRun> {
    DATASET.get_or_load(|| {
        info!("Loading dashboard dataset");
        pipeline.run()
    })
}

/// Presentation settings passed in at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub title: String,
    /// Score drawn as the target line on the quality tab.
    pub target_score: f64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            title: "Smart Farming Dashboard".to_string(),
            target_score: 0.8,
        }
    }
}

/// Selected filter values; [`ALL`] disables a filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardFilters {
    pub crop: String,
    pub soil: String,
    pub stage: String,
}

impl Default for DashboardFilters {
    fn default() -> Self {
        Self {
            crop: ALL.to_string(),
            soil: ALL.to_string(),
            stage: ALL.to_string(),
        }
    }
}

impl DashboardFilters {
    fn active(&self) -> Vec<(&'static str, &str)> {
        [
            (CROP_ID, self.crop.as_str()),
            (SOIL_TYPE, self.soil.as_str()),
            (SEEDLING_STAGE, self.stage.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| *value != ALL)
        .collect()
    }
}

/// Values offered by each filter selector, [`ALL`] first then sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub crops: Vec<String>,
    pub soils: Vec<String>,
    pub stages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewMetrics {
    pub avg_temp: Option<f64>,
    pub avg_humidity: Option<f64>,
    pub avg_moi: Option<f64>,
    pub distinct_crops: usize,
    pub rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeanMinMax {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl MeanMinMax {
    fn of(values: &[f64]) -> Option<Self> {
        Some(Self {
            mean: mean(values)?,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

/// Per-crop reading statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropStats {
    pub crop: String,
    pub temp: MeanMinMax,
    pub humidity: MeanMinMax,
    pub moi: MeanMinMax,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendView {
    pub points: usize,
    pub window: usize,
    pub series: Vec<TrendSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityPanel {
    pub score: QualityScore,
    pub chart: QualityChart,
    pub target_met: bool,
}

/// First rows of the filtered table, rendered as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablePreview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Everything the dashboard shows for one set of filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub title: String,
    pub filters: DashboardFilters,
    pub options: FilterOptions,
    pub overview: OverviewMetrics,
    pub distributions: Vec<Histogram>,
    pub result_counts: Vec<ValueCount>,
    pub correlation: CorrelationMatrix,
    pub box_per_crop: Vec<GroupedBoxPlot>,
    pub crop_stats: Vec<CropStats>,
    pub trend: TrendView,
    pub quality: QualityPanel,
    pub preview: TablePreview,
}

/// Clamp a requested trend length to `[100, min(5000, rows)]`.
///
/// With fewer than 100 rows every row is shown.
pub fn clamp_trend_points(requested: Option<usize>, rows: usize) -> usize {
    let upper = MAX_TREND_POINTS.min(rows);
    if upper < MIN_TREND_POINTS {
        return upper;
    }
    requested
        .unwrap_or(DEFAULT_TREND_POINTS)
        .clamp(MIN_TREND_POINTS, upper)
}

/// Rolling window used for a trend of `points` rows.
pub fn rolling_window(points: usize) -> usize {
    (points / 50).max(5)
}

/// Dashboard over one processed dataset.
pub struct Dashboard<'a> {
    config: DashboardConfig,
    run: &'a PipelineRun,
}

impl Dashboard<'static> {
    /// Open the dashboard over the process-wide cached dataset.
    pub fn open(config: DashboardConfig, pipeline: &Pipeline) -> Result<Self> {
        Ok(Self::new(config, cached_run(pipeline)?))
    }
}

impl<'a> Dashboard<'a> {
    pub fn new(config: DashboardConfig, run: &'a PipelineRun) -> Self {
        Self { config, run }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Selector options from the cleaned table.
    pub fn options(&self) -> Result<FilterOptions> {
        let df = self.run.cleaned.data();
        let distinct = |logical: &str| -> Result<Vec<String>> {
            let mut values = vec![ALL.to_string()];
            if let Some(column) = resolve_column(df, logical) {
                let unique: BTreeSet<String> =
                    string_cells(df.column(&column)?.as_materialized_series())?
                        .into_iter()
                        .flatten()
                        .collect();
                values.extend(unique);
            }
            Ok(values)
        };

        Ok(FilterOptions {
            crops: distinct(CROP_ID)?,
            soils: distinct(SOIL_TYPE)?,
            stages: distinct(SEEDLING_STAGE)?,
        })
    }

    /// Rows of the cleaned table matching every active filter.
    pub fn filter(&self, filters: &DashboardFilters) -> Result<DataFrame> {
        let df = self.run.cleaned.data();
        let mut mask_values = vec![true; df.height()];

        for (logical, wanted) in filters.active() {
            let Some(column) = resolve_column(df, logical) else {
                continue;
            };
            let cells = string_cells(df.column(&column)?.as_materialized_series())?;
            for (keep, cell) in mask_values.iter_mut().zip(cells) {
                *keep = *keep && cell.as_deref() == Some(wanted);
            }
        }

        let mask = BooleanChunked::from_slice("mask".into(), &mask_values);
        let filtered = df.filter(&mask)?;
        debug!("Filters {:?} kept {} rows", filters, filtered.height());
        Ok(filtered)
    }

    /// Build every view for `filters`.
    pub fn render(&self, filters: &DashboardFilters, trend_points: Option<usize>) -> Result<DashboardView> {
        let df = self.filter(filters)?;

        let points = clamp_trend_points(trend_points, df.height());
        let window = rolling_window(points);

        let distributions = READING_COLUMNS
            .iter()
            .map(|c| column_histogram(&df, c, DASHBOARD_BINS))
            .collect::<Result<Vec<_>>>()?;
        let box_per_crop = READING_COLUMNS
            .iter()
            .map(|c| grouped_box_plot(&df, CROP_ID, c))
            .collect::<Result<Vec<_>>>()?;

        let mut result_counts: Vec<ValueCount> = match resolve_column(&df, RESULT) {
            Some(column) => value_counts(df.column(&column)?.as_materialized_series())?
                .into_iter()
                .map(|(value, count)| ValueCount { value, count })
                .collect(),
            None => Vec::new(),
        };
        result_counts.sort_by(|a, b| a.value.cmp(&b.value));

        let score = self.run.score;

        Ok(DashboardView {
            title: self.config.title.clone(),
            filters: filters.clone(),
            options: self.options()?,
            overview: Self::overview(&df)?,
            distributions,
            result_counts,
            correlation: DataProfiler::correlation(&df, &CORRELATION_COLUMNS)?,
            box_per_crop,
            crop_stats: Self::crop_stats(&df)?,
            trend: TrendView {
                points,
                window,
                series: trend_series(&df, &READING_COLUMNS, points, window)?,
            },
            quality: QualityPanel {
                score,
                chart: QualityChart {
                    target: self.config.target_score,
                    ..quality_chart(&score)
                },
                target_met: score.meets_target(self.config.target_score),
            },
            preview: Self::preview(&df, PREVIEW_ROWS)?,
        })
    }

    fn overview(df: &DataFrame) -> Result<OverviewMetrics> {
        let avg = |logical: &str| -> Result<Option<f64>> {
            Ok(match resolve_column(df, logical) {
                Some(column) => {
                    let values: Vec<f64> = f64_cells(df.column(&column)?.as_materialized_series())?
                        .into_iter()
                        .flatten()
                        .collect();
                    mean(&values)
                }
                None => None,
            })
        };

        let distinct_crops = match resolve_column(df, CROP_ID) {
            Some(column) => string_cells(df.column(&column)?.as_materialized_series())?
                .into_iter()
                .flatten()
                .collect::<BTreeSet<_>>()
                .len(),
            None => 0,
        };

        Ok(OverviewMetrics {
            avg_temp: avg(TEMPERATURE)?,
            avg_humidity: avg(HUMIDITY)?,
            avg_moi: avg(MOISTURE)?,
            distinct_crops,
            rows: df.height(),
        })
    }

    fn crop_stats(df: &DataFrame) -> Result<Vec<CropStats>> {
        let (Some(crop_col), Some(temp_col), Some(hum_col), Some(moi_col)) = (
            resolve_column(df, CROP_ID),
            resolve_column(df, TEMPERATURE),
            resolve_column(df, HUMIDITY),
            resolve_column(df, MOISTURE),
        ) else {
            return Ok(Vec::new());
        };

        let crops = string_cells(df.column(&crop_col)?.as_materialized_series())?;
        let temp = f64_cells(df.column(&temp_col)?.as_materialized_series())?;
        let humidity = f64_cells(df.column(&hum_col)?.as_materialized_series())?;
        let moi = f64_cells(df.column(&moi_col)?.as_materialized_series())?;

        let mut groups: BTreeMap<String, [Vec<f64>; 3]> = BTreeMap::new();
        for (i, crop) in crops.into_iter().enumerate() {
            let Some(crop) = crop else { continue };
            let entry = groups.entry(crop).or_default();
            for (slot, values) in entry.iter_mut().zip([&temp, &humidity, &moi]) {
                if let Some(v) = values[i] {
                    slot.push(v);
                }
            }
        }

        Ok(groups
            .into_iter()
            .filter_map(|(crop, [t, h, m])| {
                Some(CropStats {
                    crop,
                    temp: MeanMinMax::of(&t)?,
                    humidity: MeanMinMax::of(&h)?,
                    moi: MeanMinMax::of(&m)?,
                })
            })
            .collect())
    }

    fn preview(df: &DataFrame, rows: usize) -> Result<TablePreview> {
        let head = df.head(Some(rows));
        let columns: Vec<String> = head
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut cells = Vec::with_capacity(head.width());
        for col in head.get_columns() {
            cells.push(string_cells(col.as_materialized_series())?);
        }

        let rows = (0..head.height())
            .map(|r| {
                cells
                    .iter()
                    .map(|column| column[r].clone().unwrap_or_default())
                    .collect()
            })
            .collect();

        Ok(TablePreview { columns, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn instant() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn run() -> PipelineRun {
        let raw = df![
            "MOI" => [10.0, 20.0, 30.0, 40.0, 50.0, 60.0],
            "temp" => [20.0, 22.0, 24.0, 26.0, 28.0, 30.0],
            "humidity" => [60.0, 62.0, 64.0, 66.0, 68.0, 70.0],
            "soil_type" => ["clay", "sand", "clay", "loam", "clay", "sand"],
            "crop ID" => ["Wheat", "Wheat", "Carrot", "Carrot", "Wheat", "Tomato"],
            "Seedling Stage" => ["Leaf", "Leaf", "Leaf", "Flowering", "Flowering", "Leaf"],
            "result" => [1i64, 0, 1, 1, 0, 1],
        ]
        .unwrap();
        Pipeline::builder()
            .build()
            .unwrap()
            .process_at(raw, instant())
            .unwrap()
    }

    #[test]
    fn test_clamp_trend_points() {
        assert_eq!(clamp_trend_points(None, 10_000), 500);
        assert_eq!(clamp_trend_points(Some(50), 10_000), 100);
        assert_eq!(clamp_trend_points(Some(9_000), 10_000), 5000);
        assert_eq!(clamp_trend_points(Some(900), 700), 700);
        assert_eq!(clamp_trend_points(None, 40), 40);
    }

    #[test]
    fn test_rolling_window() {
        assert_eq!(rolling_window(100), 5);
        assert_eq!(rolling_window(500), 10);
        assert_eq!(rolling_window(5000), 100);
    }

    #[test]
    fn test_options_sorted_with_all_first() {
        let run = run();
        let options = Dashboard::new(DashboardConfig::default(), &run).options().unwrap();

        assert_eq!(options.crops, vec!["all", "Carrot", "Tomato", "Wheat"]);
        assert_eq!(options.soils, vec!["all", "clay", "loam", "sand"]);
        assert_eq!(options.stages, vec!["all", "Flowering", "Leaf"]);
    }

    #[test]
    fn test_filter_combines_selectors() {
        let run = run();
        let dashboard = Dashboard::new(DashboardConfig::default(), &run);

        assert_eq!(dashboard.filter(&DashboardFilters::default()).unwrap().height(), 6);

        let filters = DashboardFilters {
            crop: "Wheat".to_string(),
            soil: "clay".to_string(),
            ..Default::default()
        };
        assert_eq!(dashboard.filter(&filters).unwrap().height(), 2);
    }

    #[test]
    fn test_render_overview_and_stats() {
        let run = run();
        let dashboard = Dashboard::new(DashboardConfig::default(), &run);
        let filters = DashboardFilters {
            crop: "Wheat".to_string(),
            ..Default::default()
        };

        let view = dashboard.render(&filters, None).unwrap();

        assert_eq!(view.overview.rows, 3);
        assert_eq!(view.overview.distinct_crops, 1);
        assert_eq!(view.overview.avg_temp, Some(70.0 / 3.0));
        assert_eq!(view.crop_stats.len(), 1);
        assert_eq!(view.crop_stats[0].moi.max, 50.0);
        assert_eq!(view.trend.points, 3);
        assert_eq!(view.trend.window, 5);
        assert_eq!(view.preview.rows.len(), 3);
        assert_eq!(view.quality.chart.target, 0.8);
        // filters never change the score
        assert_eq!(view.quality.score, run.score);
    }

    #[test]
    fn test_render_with_no_matching_rows() {
        let run = run();
        let dashboard = Dashboard::new(DashboardConfig::default(), &run);
        let filters = DashboardFilters {
            crop: "Rice".to_string(),
            ..Default::default()
        };

        let view = dashboard.render(&filters, Some(200)).unwrap();

        assert_eq!(view.overview.rows, 0);
        assert_eq!(view.overview.avg_temp, None);
        assert!(view.crop_stats.is_empty());
        assert!(view.preview.rows.is_empty());
    }
}
