//! Pipeline module.
//!
//! Wires the loader, cleaner and scorer together and reports progress.

mod builder;
pub mod progress;

pub use builder::{Pipeline, PipelineBuilder};
pub use progress::{ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate};
