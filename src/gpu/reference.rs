//! Host reference executor for the built-in kernels.
//!
//! Mirrors the device kernel work item by work item, including the bounds
//! check, so device output can be checked without trusting the device and
//! the remap laws can be tested without one.

use crate::core::types::PackedBuffer;
use serde::Serialize;

/// Kernels that have a host reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HostReference {
    /// `(x, y) -> (x, h - 1 - y)`
    FlipVertical,
}

impl HostReference {
    /// Destination of work item `(x, y)` in a `width` x `height` image, or
    /// `None` if the work item lies outside the image.
    pub fn remap(self, x: u32, y: u32, width: u32, height: u32) -> Option<(u32, u32)> {
        if x >= width || y >= height {
            return None;
        }
        match self {
            HostReference::FlipVertical => Some((x, height - 1 - y)),
        }
    }

    /// Run the kernel over a `global` index space, which may exceed the image.
    ///
    /// # Panics
    ///
    /// Panics if `input` and `output` differ in size.
    pub fn execute(self, input: &PackedBuffer, output: &mut PackedBuffer, global: [u32; 2]) {
        assert_eq!(
            (input.width(), input.height()),
            (output.width(), output.height()),
            "reference input and output sizes differ"
        );
        let (width, height) = (input.width(), input.height());
        for y in 0..global[1] {
            for x in 0..global[0] {
                if let Some((dx, dy)) = self.remap(x, y, width, height) {
                    output.set(dx, dy, input.get(x, y));
                }
            }
        }
    }

    /// Convenience: run over exactly the image and return a new buffer.
    pub fn apply(self, input: &PackedBuffer) -> PackedBuffer {
        let mut output = PackedBuffer::new(input.width(), input.height());
        self.execute(input, &mut output, [input.width(), input.height()]);
        output
    }

    /// First pixel where `actual` differs from this kernel applied to
    /// `input`, as `(x, y, expected, actual)`.
    pub fn first_mismatch(
        self,
        input: &PackedBuffer,
        actual: &PackedBuffer,
    ) -> Option<(u32, u32, [u8; 4], [u8; 4])> {
        let expected = self.apply(input);
        let width = input.width().max(1);
        expected
            .pixels()
            .iter()
            .zip(actual.pixels())
            .position(|(e, a)| e != a)
            .map(|i| {
                let (x, y) = (i as u32 % width, i as u32 / width);
                (x, y, expected.get(x, y).to_array(), actual.get(x, y).to_array())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RgbaPixel;
    use proptest::prelude::*;

    fn arb_buffer() -> impl Strategy<Value = PackedBuffer> {
        (1u32..10, 1u32..10).prop_flat_map(|(w, h)| {
            prop::collection::vec(any::<[u8; 4]>(), (w * h) as usize).prop_map(move |px| {
                PackedBuffer::from_pixels(w, h, px.into_iter().map(RgbaPixel::from).collect())
            })
        })
    }

    proptest! {
        #[test]
        fn prop_flip_is_involution(buffer in arb_buffer()) {
            let flip = HostReference::FlipVertical;
            prop_assert_eq!(flip.apply(&flip.apply(&buffer)), buffer);
        }

        #[test]
        fn prop_padded_dispatch_stays_in_bounds(
            buffer in arb_buffer(),
            pad_x in 0u32..16,
            pad_y in 0u32..16,
        ) {
            let flip = HostReference::FlipVertical;
            let global = [buffer.width() + pad_x, buffer.height() + pad_y];
            let mut padded = PackedBuffer::new(buffer.width(), buffer.height());
            flip.execute(&buffer, &mut padded, global);
            prop_assert_eq!(padded, flip.apply(&buffer));
        }
    }

    #[test]
    fn test_remap_bounds() {
        let flip = HostReference::FlipVertical;
        assert_eq!(flip.remap(0, 0, 4, 3), Some((0, 2)));
        assert_eq!(flip.remap(3, 2, 4, 3), Some((3, 0)));
        assert_eq!(flip.remap(4, 0, 4, 3), None);
        assert_eq!(flip.remap(0, 3, 4, 3), None);
    }

    #[test]
    fn test_single_row_is_identity() {
        let row = PackedBuffer::from_pixels(
            3,
            1,
            vec![
                RgbaPixel::new(1, 2, 3, 4),
                RgbaPixel::new(5, 6, 7, 8),
                RgbaPixel::new(9, 10, 11, 12),
            ],
        );
        assert_eq!(HostReference::FlipVertical.apply(&row), row);
    }

    #[test]
    fn test_single_column_reverses() {
        let column = PackedBuffer::from_pixels(
            1,
            3,
            vec![
                RgbaPixel::new(1, 0, 0, 255),
                RgbaPixel::new(2, 0, 0, 255),
                RgbaPixel::new(3, 0, 0, 255),
            ],
        );
        let flipped = HostReference::FlipVertical.apply(&column);
        let reds: Vec<u8> = flipped.pixels().iter().map(|p| p.r).collect();
        assert_eq!(reds, vec![3, 2, 1]);
    }

    #[test]
    fn test_two_by_two_rows_swap() {
        let red = RgbaPixel::new(255, 0, 0, 255);
        let green = RgbaPixel::new(0, 255, 0, 255);
        let blue = RgbaPixel::new(0, 0, 255, 255);
        let white = RgbaPixel::new(255, 255, 255, 255);
        let input = PackedBuffer::from_pixels(2, 2, vec![red, green, blue, white]);

        let output = HostReference::FlipVertical.apply(&input);
        assert_eq!(output.pixels(), &[blue, white, red, green]);
    }

    #[test]
    fn test_first_mismatch() {
        let input = PackedBuffer::from_pixels(
            1,
            2,
            vec![RgbaPixel::new(1, 1, 1, 1), RgbaPixel::new(2, 2, 2, 2)],
        );
        let flip = HostReference::FlipVertical;
        assert_eq!(flip.first_mismatch(&input, &flip.apply(&input)), None);
        assert_eq!(
            flip.first_mismatch(&input, &input),
            Some((0, 0, [2, 2, 2, 2], [1, 1, 1, 1]))
        );
    }
}
