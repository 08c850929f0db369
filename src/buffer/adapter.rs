//! Channel-count normalization between planar host images and packed RGBA.
//!
//! Device images always hold 4 channels. On the way in, channels the host
//! image lacks are zero-filled and alpha defaults to fully opaque. On the way
//! out, only channels the destination has are written.

use crate::core::types::{HostImage, PackedBuffer, RgbaPixel};

/// Alpha value synthesized for images without an alpha channel.
pub const OPAQUE: u8 = u8::MAX;

const R: u8 = 0;
const G: u8 = 1;
const B: u8 = 2;
const A: u8 = 3;

/// Converts between `HostImage` and `PackedBuffer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelBufferAdapter;

impl PixelBufferAdapter {
    /// Pack a host image into RGBA, padding missing channels.
    pub fn to_packed(image: &HostImage) -> PackedBuffer {
        let channels = image.channels();
        let plane = |ch: u8| (channels > ch).then(|| image.plane(ch));
        let (r, g, b, a) = (plane(R), plane(G), plane(B), plane(A));

        let pixels = (0..image.plane_len())
            .map(|i| RgbaPixel {
                r: r.map_or(0, |p| p[i]),
                g: g.map_or(0, |p| p[i]),
                b: b.map_or(0, |p| p[i]),
                a: a.map_or(OPAQUE, |p| p[i]),
            })
            .collect();

        PackedBuffer::from_pixels(image.width(), image.height(), pixels)
    }

    /// Write packed RGBA back into `image`, keeping only the channels it has.
    ///
    /// # Panics
    ///
    /// Panics if the buffer and image dimensions differ.
    pub fn from_packed(buffer: &PackedBuffer, image: &mut HostImage) {
        assert_eq!(
            (buffer.width(), buffer.height()),
            (image.width(), image.height()),
            "packed buffer does not match host image dimensions"
        );

        let pixels = buffer.pixels();
        for ch in 0..image.channels() {
            let plane = image.plane_mut(ch);
            for (dst, px) in plane.iter_mut().zip(pixels) {
                *dst = match ch {
                    R => px.r,
                    G => px.g,
                    B => px.b,
                    _ => px.a,
                };
            }
        }
    }
}
