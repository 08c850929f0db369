//! [`ImageCodec`] backed by the `image` crate.

use super::ImageCodec;
use crate::core::error::{PipelineError, PipelineResult};
use crate::core::types::HostImage;
use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};
use std::path::Path;

/// Reads and writes any container the `image` crate supports.
///
/// Samples wider than 8 bits are narrowed; the channel count is kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileCodec;

impl FileCodec {
    /// Create a codec.
    pub fn new() -> Self {
        Self
    }

    fn decode(img: DynamicImage) -> Result<HostImage, String> {
        let (width, height) = (img.width(), img.height());
        let (channels, data) = match img.color().channel_count() {
            1 => (1, img.into_luma8().into_raw()),
            2 => (2, img.into_luma_alpha8().into_raw()),
            3 => (3, img.into_rgb8().into_raw()),
            _ => (4, img.into_rgba8().into_raw()),
        };
        HostImage::from_interleaved(width, height, channels, &data).map_err(|e| e.to_string())
    }

    fn encode(image: &HostImage) -> Option<DynamicImage> {
        let (width, height) = (image.width(), image.height());
        let data = image.to_interleaved();
        match image.channels() {
            1 => GrayImage::from_raw(width, height, data).map(DynamicImage::ImageLuma8),
            2 => GrayAlphaImage::from_raw(width, height, data).map(DynamicImage::ImageLumaA8),
            3 => RgbImage::from_raw(width, height, data).map(DynamicImage::ImageRgb8),
            4 => RgbaImage::from_raw(width, height, data).map(DynamicImage::ImageRgba8),
            _ => None,
        }
    }
}

impl ImageCodec for FileCodec {
    fn load(&self, path: &Path) -> PipelineResult<HostImage> {
        let fail = |detail: String| PipelineError::ImageLoadError {
            path: path.to_path_buf(),
            detail,
        };

        let img = image::open(path).map_err(|e| fail(e.to_string()))?;
        let image = Self::decode(img).map_err(fail)?;

        log::debug!(
            "loaded {} ({}x{}, {} channel(s))",
            path.display(),
            image.width(),
            image.height(),
            image.channels()
        );
        Ok(image)
    }

    fn save(&self, image: &HostImage, path: &Path) -> PipelineResult<()> {
        let fail = |detail: String| PipelineError::ImageSaveError {
            path: path.to_path_buf(),
            detail,
        };

        let encoded = Self::encode(image).ok_or_else(|| {
            fail(format!(
                "cannot encode {} channel(s) at {}x{}",
                image.channels(),
                image.width(),
                image.height()
            ))
        })?;
        encoded.save(path).map_err(|e| fail(e.to_string()))?;

        log::debug!("saved {}", path.display());
        Ok(())
    }
}
