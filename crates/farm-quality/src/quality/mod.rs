//! Data quality scoring.
//!
//! Produces the three ratio metrics shown by the presenters and their
//! unweighted average.

mod scorer;

pub use scorer::QualityScorer;
