//! Dataset loading.
//!
//! The loader tries a list of candidate paths in order and parses the first
//! file that exists. It performs no cleaning beyond normalizing float `NaN`
//! cells to null, so the raw table seen by the scorer counts every missing
//! reading exactly once.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result, ResultExt};
use crate::utils::nan_to_null;
use once_cell::sync::OnceCell;
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Reads the raw sensor table from the first existing candidate path.
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    candidate_paths: Vec<PathBuf>,
}

impl DatasetLoader {
    pub fn new(candidate_paths: Vec<PathBuf>) -> Self {
        Self { candidate_paths }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.candidate_paths.clone())
    }

    pub fn candidate_paths(&self) -> &[PathBuf] {
        &self.candidate_paths
    }

    /// First candidate that is an existing file.
    pub fn resolve(&self) -> Result<PathBuf> {
        for path in &self.candidate_paths {
            if path.is_file() {
                debug!("Resolved dataset path: {}", path.display());
                return Ok(path.clone());
            }
            debug!("Dataset candidate not found: {}", path.display());
        }

        Err(PipelineError::DataNotFound {
            tried: self
                .candidate_paths
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
        })
    }

    /// Load the raw table.
    pub fn load(&self) -> Result<DataFrame> {
        self.load_with_path().map(|(_, df)| df)
    }

    /// Load the raw table and report which path it came from.
    pub fn load_with_path(&self) -> Result<(PathBuf, DataFrame)> {
        let path = self.resolve()?;
        info!("Loading dataset from: {}", path.display());

        let df = read_csv(&path).context(format!("Failed to read {}", path.display()))?;
        info!("Dataset loaded: {} rows x {} columns", df.height(), df.width());

        Ok((path, df))
    }
}

/// Parse a CSV file, normalizing float `NaN` cells to null.
///
/// Tries a quote-aware read first and falls back to a plain read.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let df = match CsvReadOptions::default()
        .with_infer_schema_length(None)
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
    {
        Ok(df) => df,
        Err(e) => {
            debug!("Quote-aware loading failed: {}", e);
            CsvReadOptions::default()
                .with_infer_schema_length(None)
                .with_has_header(true)
                .try_into_reader_with_file_path(Some(path.to_path_buf()))?
                .finish()?
        }
    };

    normalize_missing(df)
}

/// Replace `NaN` with null in every float column.
pub fn normalize_missing(df: DataFrame) -> Result<DataFrame> {
    let mut columns = Vec::with_capacity(df.width());
    for col in df.get_columns() {
        let series = nan_to_null(col.as_materialized_series())?;
        columns.push(Column::from(series));
    }
    Ok(DataFrame::new(columns)?)
}

/// Process-wide single-entry read-through cache.
///
/// The first successful load is kept for the lifetime of the process and
/// never invalidated. A failed load leaves the cache empty, so the next
/// call tries again.
pub struct DatasetCache<T> {
    cell: OnceCell<T>,
}

impl<T> DatasetCache<T> {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Return the cached value, computing it with `load` on first use.
    pub fn get_or_load<F>(&self, load: F) -> Result<&T>
    where
        F: FnOnce() -> Result<T>,
    {
        if self.cell.get().is_some() {
            debug!("Dataset cache hit");
        }
        self.cell.get_or_try_init(load)
    }

    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T> Default for DatasetCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(DatasetCache<DataFrame>: Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_csv(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("farm_quality_loader_tests");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_resolve_skips_missing_candidates() {
        let existing = temp_csv("resolve.csv", "MOI,temp\n1,2\n");
        let loader = DatasetLoader::new(vec![
            PathBuf::from("definitely/not/here.csv"),
            existing.clone(),
        ]);
        assert_eq!(loader.resolve().unwrap(), existing);
    }

    #[test]
    fn test_resolve_none_found() {
        let loader = DatasetLoader::new(vec![
            PathBuf::from("nope/a.csv"),
            PathBuf::from("nope/b.csv"),
        ]);
        let err = loader.load().unwrap_err();
        assert_eq!(err.error_code(), "DATA_NOT_FOUND");
        assert!(err.to_string().contains("nope/b.csv"));
    }

    #[test]
    fn test_load_keeps_missing_cells() {
        let path = temp_csv(
            "missing.csv",
            "MOI,temp,soil_type\n1.5,20.0,clay\n,21.0,\n2.5,,sand\n",
        );
        let df = DatasetLoader::new(vec![path]).load().unwrap();

        assert_eq!(df.height(), 3);
        assert_eq!(df.column("MOI").unwrap().null_count(), 1);
        assert_eq!(df.column("temp").unwrap().null_count(), 1);
        assert_eq!(df.column("soil_type").unwrap().null_count(), 1);
    }

    #[test]
    fn test_normalize_missing_nan() {
        let df = df![
            "temp" => [Some(1.0), Some(f64::NAN), None],
            "soil_type" => ["clay", "sand", "loam"],
        ]
        .unwrap();
        let df = normalize_missing(df).unwrap();
        assert_eq!(df.column("temp").unwrap().null_count(), 2);
        assert_eq!(df.column("soil_type").unwrap().null_count(), 0);
    }

    #[test]
    fn test_cache_loads_once() {
        let cache: DatasetCache<usize> = DatasetCache::new();
        let mut calls = 0;

        let first = *cache
            .get_or_load(|| {
                calls += 1;
                Ok(7)
            })
            .unwrap();
        assert_eq!(first, 7);
        assert_eq!(calls, 1);

        let second = *cache.get_or_load(|| Ok(99)).unwrap();
        assert_eq!(second, 7);
        assert!(cache.is_loaded());
    }

    #[test]
    fn test_cache_failed_load_stays_empty() {
        let cache: DatasetCache<usize> = DatasetCache::new();
        let result = cache.get_or_load(|| Err(PipelineError::EmptyDataset("raw".to_string())));
        assert!(result.is_err());
        assert!(!cache.is_loaded());
        assert_eq!(*cache.get_or_load(|| Ok(1)).unwrap(), 1);
    }
}
