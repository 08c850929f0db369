//! Pipeline orchestration.

pub mod progress;
pub mod transform;

pub use progress::{ProgressCallback, ProgressTracker, ProgressUpdate, StageTiming};
pub use transform::{TransformPipeline, TransformReport};
