//! Image container decoding and encoding.

pub mod file;

pub use file::FileCodec;

use crate::core::error::PipelineResult;
use crate::core::types::HostImage;
use std::path::Path;

/// Loads and saves host images.
pub trait ImageCodec {
    /// Decode the image at `path`.
    fn load(&self, path: &Path) -> PipelineResult<HostImage>;

    /// Encode `image` to `path`; the container is chosen by extension.
    fn save(&self, image: &HostImage, path: &Path) -> PipelineResult<()>;
}
