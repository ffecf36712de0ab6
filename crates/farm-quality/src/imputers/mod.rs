//! Imputation module for handling missing values.
//!
//! Numeric columns are filled with their median and string columns with
//! their mode, both computed over the raw non-missing values.

mod statistical;

pub use statistical::{ColumnFill, FillValue, StatisticalImputer};
