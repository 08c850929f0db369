//! # imgturn - GPU image transform pipeline
//!
//! imgturn loads a 2D image, uploads it to the GPU as an 8-bit RGBA texture,
//! runs a per-pixel compute kernel over it (a vertical flip by default),
//! reads the result back and writes it to a file.
//!
//! ## Features
//!
//! - **Any channel count**: 1 to 4 channel planar host images are packed to
//!   RGBA for the device and unpacked in place afterwards
//! - **Explicit ownership**: a [`ComputeSession`](gpu::ComputeSession) owns
//!   the device and kernel; images borrow their host staging buffers
//! - **Fail fast**: every device failure becomes a typed
//!   [`PipelineError`](core::PipelineError) naming the stage it came from
//! - **Pluggable kernels**: WGSL or SPIR-V, with an optional host reference
//!   to verify device output
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use imgturn::prelude::*;
//!
//! let options = PipelineOptions::new()
//!     .with_input("lena.png")
//!     .with_output("flipped.png");
//!
//! let report = TransformPipeline::run(&options, &FileCodec::new())?;
//! println!("{}", report.to_json());
//! # Ok::<(), PipelineError>(())
//! ```
//!
//! Reusing one session across several images:
//!
//! ```rust,no_run
//! use imgturn::prelude::*;
//!
//! let session = ComputeSession::open(&PipelineOptions::default())?;
//! let pipeline = TransformPipeline::new(&session).with_verify(true);
//!
//! let mut image = HostImage::new(64, 32, 3).expect("valid shape");
//! pipeline.transform(&mut image)?;
//! # Ok::<(), PipelineError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: host image layouts, errors, configuration
//! - [`buffer`]: planar host image to packed RGBA conversion
//! - [`gpu`]: device, kernel, device images and transfers
//! - [`pipeline`]: the stage machine and progress reporting
//! - [`codec`]: image container I/O

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod codec;
pub mod core;
pub mod gpu;
pub mod pipeline;

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```rust,ignore
/// use imgturn::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::core::types::{AccessMode, HostImage, PackedBuffer, RgbaPixel};

    // Errors
    pub use crate::core::error::{LayoutError, PipelineError, PipelineResult, Stage};

    // Configuration
    pub use crate::core::options::PipelineOptions;

    // Conversion
    pub use crate::buffer::PixelBufferAdapter;

    // Device
    pub use crate::gpu::device::ComputeDeviceContext;
    pub use crate::gpu::image::{DeviceImage, HostRegion};
    pub use crate::gpu::kernel::{KernelProgram, KernelSource, WorkSize};
    pub use crate::gpu::reference::HostReference;
    pub use crate::gpu::session::ComputeSession;

    // Pipeline
    pub use crate::pipeline::progress::{ProgressCallback, ProgressTracker, ProgressUpdate};
    pub use crate::pipeline::transform::{TransformPipeline, TransformReport};

    // I/O
    pub use crate::codec::{FileCodec, ImageCodec};
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
