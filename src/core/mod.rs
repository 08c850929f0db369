//! Core types shared by the host and device sides of the pipeline.
//!
//! This module contains:
//! - Host image layouts (planar `HostImage`, packed `PackedBuffer`)
//! - Error types and the `Stage` taxonomy
//! - Pipeline configuration

pub mod error;
pub mod options;
pub mod types;

// Re-export commonly used types
pub use error::{LayoutError, PipelineError, PipelineResult, Stage};
pub use options::{PipelineOptions, DEFAULT_INPUT, DEFAULT_OUTPUT};
pub use types::{AccessMode, HostImage, PackedBuffer, RgbaPixel, DEVICE_CHANNELS, DEVICE_FORMAT};
