//! Core host-side data types.
//!
//! `HostImage` is what the codec produces and consumes: planar, 8-bit, one to
//! four channels. `PackedBuffer` is the interleaved RGBA staging layout that
//! matches the device image byte for byte.

use crate::core::error::LayoutError;
use bytemuck::{Pod, Zeroable};
use serde::Serialize;
use std::fmt;

/// Number of channels in every device image.
pub const DEVICE_CHANNELS: usize = 4;

/// Device image texel format: 4 channels, 8-bit unsigned integer each.
pub const DEVICE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Uint;

/// Access mode of a device image, as seen by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// Kernel input; written from the host, read by the kernel.
    ReadOnly,
    /// Kernel output; written by the kernel, read back to the host.
    WriteOnly,
}

impl AccessMode {
    /// Texture usages a device image with this access mode requires.
    pub fn texture_usages(self) -> wgpu::TextureUsages {
        match self {
            AccessMode::ReadOnly => {
                wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST
            }
            AccessMode::WriteOnly => {
                wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC
            }
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::ReadOnly => f.write_str("read-only"),
            AccessMode::WriteOnly => f.write_str("write-only"),
        }
    }
}

/// One packed pixel: 4 unsigned 8-bit channels.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct RgbaPixel {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
    /// Alpha
    pub a: u8,
}

impl RgbaPixel {
    /// Create a pixel from its four channels.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Channels as an array, in r, g, b, a order.
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl From<[u8; 4]> for RgbaPixel {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self { r, g, b, a }
    }
}

/// Planar 8-bit host image with 1 to 4 channels.
///
/// Sample `(x, y, c)` lives at `c * width * height + y * width + x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostImage {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

impl HostImage {
    /// Create a zero-filled image.
    pub fn new(width: u32, height: u32, channels: u8) -> Result<Self, LayoutError> {
        Self::check_shape(width, height, channels)?;
        let len = width as usize * height as usize * channels as usize;
        Ok(Self {
            width,
            height,
            channels,
            data: vec![0; len],
        })
    }

    /// Wrap planar sample data.
    pub fn from_planar(
        width: u32,
        height: u32,
        channels: u8,
        data: Vec<u8>,
    ) -> Result<Self, LayoutError> {
        Self::check_shape(width, height, channels)?;
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(LayoutError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Build from interleaved samples (`[c0, c1, .., c0, c1, ..]`, row-major).
    pub fn from_interleaved(
        width: u32,
        height: u32,
        channels: u8,
        samples: &[u8],
    ) -> Result<Self, LayoutError> {
        let mut image = Self::new(width, height, channels)?;
        if samples.len() != image.data.len() {
            return Err(LayoutError::LengthMismatch {
                expected: image.data.len(),
                actual: samples.len(),
            });
        }
        let plane = image.plane_len();
        let c = channels as usize;
        for (i, pixel) in samples.chunks_exact(c).enumerate() {
            for (ch, &value) in pixel.iter().enumerate() {
                image.data[ch * plane + i] = value;
            }
        }
        Ok(image)
    }

    /// Interleaved copy of the samples, the layout image encoders expect.
    pub fn to_interleaved(&self) -> Vec<u8> {
        let plane = self.plane_len();
        let c = self.channels as usize;
        let mut out = vec![0u8; self.data.len()];
        for (i, pixel) in out.chunks_exact_mut(c).enumerate() {
            for (ch, slot) in pixel.iter_mut().enumerate() {
                *slot = self.data[ch * plane + i];
            }
        }
        out
    }

    fn check_shape(width: u32, height: u32, channels: u8) -> Result<(), LayoutError> {
        if !(1..=DEVICE_CHANNELS as u8).contains(&channels) {
            return Err(LayoutError::UnsupportedChannels(channels));
        }
        if width == 0 || height == 0 {
            return Err(LayoutError::EmptyImage { width, height });
        }
        Ok(())
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Channel count (1 to 4).
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Samples per channel plane.
    pub fn plane_len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Raw planar samples.
    pub fn as_planar(&self) -> &[u8] {
        &self.data
    }

    /// One channel plane.
    ///
    /// # Panics
    ///
    /// Panics if `channel >= self.channels()`.
    pub fn plane(&self, channel: u8) -> &[u8] {
        assert!(channel < self.channels, "channel {} out of range", channel);
        let plane = self.plane_len();
        let start = channel as usize * plane;
        &self.data[start..start + plane]
    }

    /// Mutable channel plane.
    ///
    /// # Panics
    ///
    /// Panics if `channel >= self.channels()`.
    pub fn plane_mut(&mut self, channel: u8) -> &mut [u8] {
        assert!(channel < self.channels, "channel {} out of range", channel);
        let plane = self.plane_len();
        let start = channel as usize * plane;
        &mut self.data[start..start + plane]
    }

    /// Sample at `(x, y)` in channel `channel`.
    pub fn sample(&self, x: u32, y: u32, channel: u8) -> u8 {
        self.data[self.index(x, y, channel)]
    }

    /// Overwrite the sample at `(x, y)` in channel `channel`.
    pub fn set_sample(&mut self, x: u32, y: u32, channel: u8, value: u8) {
        let idx = self.index(x, y, channel);
        self.data[idx] = value;
    }

    fn index(&self, x: u32, y: u32, channel: u8) -> usize {
        debug_assert!(x < self.width && y < self.height && channel < self.channels);
        channel as usize * self.plane_len() + y as usize * self.width as usize + x as usize
    }
}

/// Row-major interleaved RGBA staging buffer, `index(x, y) = y * width + x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedBuffer {
    width: u32,
    height: u32,
    pixels: Vec<RgbaPixel>,
}

impl PackedBuffer {
    /// Zero-filled buffer of `width * height` pixels.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![RgbaPixel::default(); width as usize * height as usize],
        }
    }

    /// Wrap existing pixels.
    ///
    /// # Panics
    ///
    /// Panics if `pixels.len() != width * height`.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<RgbaPixel>) -> Self {
        assert_eq!(
            pixels.len(),
            width as usize * height as usize,
            "packed buffer length does not match {}x{}",
            width,
            height
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Whether the buffer holds no pixels.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Bytes per tightly packed row.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * DEVICE_CHANNELS
    }

    /// Pixel at `(x, y)`.
    pub fn get(&self, x: u32, y: u32) -> RgbaPixel {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// Overwrite the pixel at `(x, y)`.
    pub fn set(&mut self, x: u32, y: u32, pixel: RgbaPixel) {
        let idx = y as usize * self.width as usize + x as usize;
        self.pixels[idx] = pixel;
    }

    /// All pixels, row-major.
    pub fn pixels(&self) -> &[RgbaPixel] {
        &self.pixels
    }

    /// All pixels, mutable.
    pub fn pixels_mut(&mut self) -> &mut [RgbaPixel] {
        &mut self.pixels
    }

    /// Byte view matching the device image layout.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Mutable byte view.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.pixels)
    }
}
