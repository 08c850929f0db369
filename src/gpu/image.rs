//! Device-side 2D images bound to host staging buffers.

use crate::core::error::{PipelineError, PipelineResult};
use crate::core::types::{AccessMode, PackedBuffer, DEVICE_CHANNELS, DEVICE_FORMAT};
use crate::gpu::device::ComputeDeviceContext;
use crate::gpu::scoped;

/// Host memory backing a device image.
///
/// A read-only image shares its buffer, a write-only image holds it
/// exclusively. Either way the borrow outlives the image, so the buffer
/// cannot be mutated or freed while the image exists.
#[derive(Debug)]
pub enum HostRegion<'h> {
    /// Source of the host-to-device write.
    ReadOnly(&'h PackedBuffer),
    /// Destination of the device-to-host read.
    WriteOnly(&'h mut PackedBuffer),
}

impl HostRegion<'_> {
    /// Access mode the backed image gets.
    pub fn access(&self) -> AccessMode {
        match self {
            HostRegion::ReadOnly(_) => AccessMode::ReadOnly,
            HostRegion::WriteOnly(_) => AccessMode::WriteOnly,
        }
    }

    fn dimensions(&self) -> (u32, u32) {
        let buffer: &PackedBuffer = match self {
            HostRegion::ReadOnly(buffer) => buffer,
            HostRegion::WriteOnly(buffer) => buffer,
        };
        (buffer.width(), buffer.height())
    }
}

/// A `Rgba8Uint` 2D texture on the device.
pub struct DeviceImage<'h> {
    view: wgpu::TextureView,
    texture: wgpu::Texture,
    width: u32,
    height: u32,
    host: HostRegion<'h>,
}

impl<'h> DeviceImage<'h> {
    /// Create a `width` x `height` image backed by `host`.
    ///
    /// The access mode follows the host region. Fails with
    /// `ImageCreationFailed` when the size or format is rejected.
    pub fn create(
        ctx: &ComputeDeviceContext,
        width: u32,
        height: u32,
        host: HostRegion<'h>,
    ) -> PipelineResult<Self> {
        let access = host.access();
        let fail = |detail: String| PipelineError::ImageCreationFailed {
            access,
            width,
            height,
            detail,
        };

        if width == 0 || height == 0 {
            return Err(fail("image dimensions must be non-zero".to_string()));
        }
        let max = ctx.max_image_dimension();
        if width > max || height > max {
            return Err(fail(format!("exceeds device limit of {} per side", max)));
        }
        if host.dimensions() != (width, height) {
            let (hw, hh) = host.dimensions();
            return Err(fail(format!("host region is {}x{}", hw, hh)));
        }
        ctx.check_format(access).map_err(fail)?;

        let device = ctx.device();
        let texture = scoped(device, || {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(match access {
                    AccessMode::ReadOnly => "input_image",
                    AccessMode::WriteOnly => "output_image",
                }),
                size: extent(width, height),
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: DEVICE_FORMAT,
                usage: access.texture_usages(),
                view_formats: &[],
            })
        })
        .map_err(fail)?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        log::debug!("created {} image {}x{}", access, width, height);

        Ok(Self {
            view,
            texture,
            width,
            height,
            host,
        })
    }

    /// Access mode of this image.
    pub fn access(&self) -> AccessMode {
        self.host.access()
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Blocking write of region [0,0,0]-[W,H,1] from the host buffer.
    pub fn write(&self, ctx: &ComputeDeviceContext) -> PipelineResult<()> {
        let HostRegion::ReadOnly(buffer) = &self.host else {
            return Err(PipelineError::TransferError {
                access: self.access(),
                detail: "only read-only images are written from the host".to_string(),
            });
        };

        let device = ctx.device();
        scoped(device, || {
            ctx.queue().write_texture(
                wgpu::ImageCopyTexture {
                    texture: &self.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                buffer.as_bytes(),
                wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(buffer.row_bytes() as u32),
                    rows_per_image: Some(self.height),
                },
                extent(self.width, self.height),
            );
            ctx.queue().submit(std::iter::empty());
        })
        .map_err(|detail| PipelineError::TransferError {
            access: AccessMode::ReadOnly,
            detail,
        })?;
        ctx.wait_idle();

        log::debug!("wrote {} bytes to input image", buffer.as_bytes().len());
        Ok(())
    }

    /// Blocking read of the whole image into the host buffer.
    pub fn read(&mut self, ctx: &ComputeDeviceContext) -> PipelineResult<()> {
        let access = self.access();
        let fail = |detail: String| PipelineError::TransferError { access, detail };

        let (width, height) = (self.width, self.height);
        let row_bytes = width * DEVICE_CHANNELS as u32;
        let padded_row = padded_bytes_per_row(width);
        let device = ctx.device();

        let HostRegion::WriteOnly(buffer) = &mut self.host else {
            return Err(fail("only write-only images are read back".to_string()));
        };

        let staging = scoped(device, || {
            let staging = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("readback_staging"),
                size: padded_row as u64 * height as u64,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            });
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback_encoder"),
            });
            encoder.copy_texture_to_buffer(
                wgpu::ImageCopyTexture {
                    texture: &self.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::ImageCopyBuffer {
                    buffer: &staging,
                    layout: wgpu::ImageDataLayout {
                        offset: 0,
                        bytes_per_row: Some(padded_row),
                        rows_per_image: Some(height),
                    },
                },
                extent(width, height),
            );
            ctx.queue().submit(std::iter::once(encoder.finish()));
            staging
        })
        .map_err(fail)?;

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        ctx.wait_idle();

        rx.recv()
            .map_err(|_| fail("map callback was dropped".to_string()))?
            .map_err(|e| fail(format!("map failed: {}", e)))?;

        {
            let mapped = slice.get_mapped_range();
            let dst = buffer.as_bytes_mut();
            for (src_row, dst_row) in mapped
                .chunks_exact(padded_row as usize)
                .zip(dst.chunks_exact_mut(row_bytes as usize))
            {
                dst_row.copy_from_slice(&src_row[..row_bytes as usize]);
            }
        }
        staging.unmap();

        log::debug!("read {} bytes from output image", row_bytes as u64 * height as u64);
        Ok(())
    }
}

impl std::fmt::Debug for DeviceImage<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceImage")
            .field("access", &self.access())
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

/// Row pitch for texture-to-buffer copies, aligned to
/// `COPY_BYTES_PER_ROW_ALIGNMENT`.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * DEVICE_CHANNELS as u32;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}
