//! Statistical helpers for the profiler.

use crate::types::ColumnSummary;
use crate::utils::{f64_cells, quantile_linear, string_cells};
use polars::prelude::*;
use std::collections::BTreeMap;

/// Summarize the non-missing values of a numeric series.
pub(crate) fn summarize(series: &Series) -> PolarsResult<ColumnSummary> {
    let mut values: Vec<f64> = f64_cells(series)?.into_iter().flatten().collect();
    values.sort_by(|a, b| a.total_cmp(b));
    let count = values.len();

    let mean = crate::utils::mean(&values);
    let std = match (mean, count) {
        (Some(m), n) if n > 1 => {
            let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
            Some((ss / (n - 1) as f64).sqrt())
        }
        _ => None,
    };

    Ok(ColumnSummary {
        column: series.name().to_string(),
        count,
        mean,
        std,
        min: values.first().copied(),
        p25: quantile_linear(&values, 0.25),
        p50: quantile_linear(&values, 0.5),
        p75: quantile_linear(&values, 0.75),
        max: values.last().copied(),
    })
}

/// Pearson correlation over rows where both values are present.
///
/// `None` when fewer than two pairs exist or either side is constant.
pub(crate) fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, b)| b).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Contingency table of two columns, keyed by row value then column value.
///
/// Rows missing either value are skipped.
pub(crate) fn contingency(
    rows: &Series,
    cols: &Series,
) -> PolarsResult<BTreeMap<String, BTreeMap<String, usize>>> {
    let row_cells = string_cells(rows)?;
    let col_cells = string_cells(cols)?;

    let mut table: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    for (r, c) in row_cells.into_iter().zip(col_cells) {
        if let (Some(r), Some(c)) = (r, c) {
            *table.entry(r).or_default().entry(c).or_insert(0) += 1;
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize() {
        let series = Series::new("temp".into(), vec![Some(1.0), Some(2.0), None, Some(3.0), Some(4.0)]);
        let summary = summarize(&series).unwrap();

        assert_eq!(summary.count, 4);
        assert_eq!(summary.mean, Some(2.5));
        assert_eq!(summary.min, Some(1.0));
        assert_eq!(summary.max, Some(4.0));
        assert_eq!(summary.p25, Some(1.75));
        assert_eq!(summary.p50, Some(2.5));
        assert_eq!(summary.p75, Some(3.25));
        let std = summary.std.unwrap();
        assert!((std - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_summarize_single_value_has_no_std() {
        let series = Series::new("temp".into(), vec![7.0]);
        let summary = summarize(&series).unwrap();
        assert_eq!(summary.std, None);
        assert_eq!(summary.p75, Some(7.0));
    }

    #[test]
    fn test_pearson() {
        let x = vec![Some(1.0), Some(2.0), Some(3.0), None];
        let y = vec![Some(2.0), Some(4.0), Some(6.0), Some(100.0)];
        let r = pearson(&x, &y).unwrap();
        assert!((r - 1.0).abs() < 1e-12);

        let flat = vec![Some(1.0), Some(1.0), Some(1.0), Some(1.0)];
        assert_eq!(pearson(&flat, &y), None);
    }

    #[test]
    fn test_contingency() {
        let crops = Series::new("crop ID".into(), vec![Some("Wheat"), Some("Wheat"), Some("Carrot"), None]);
        let results = Series::new("result".into(), vec![1i64, 0, 1, 1]);

        let table = contingency(&crops, &results).unwrap();

        assert_eq!(table["Wheat"]["1"], 1);
        assert_eq!(table["Wheat"]["0"], 1);
        assert_eq!(table["Carrot"]["1"], 1);
        assert_eq!(table.len(), 2);
    }
}
