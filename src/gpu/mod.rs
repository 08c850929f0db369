//! GPU execution layer built on wgpu.
//!
//! This module owns everything that touches the device: adapter selection
//! and device creation, kernel builds, device images and the transfers
//! between them and host staging buffers.
//!
//! wgpu reports most failures asynchronously through error scopes rather
//! than return values. Every fallible device call here is wrapped in
//! [`scoped`] so the failure surfaces as a typed [`PipelineError`] at the
//! call site instead of reaching the uncaptured-error handler.
//!
//! [`PipelineError`]: crate::core::error::PipelineError

pub mod device;
pub mod image;
pub mod kernel;
pub mod reference;
pub mod session;
pub mod shaders;

pub use device::ComputeDeviceContext;
pub use image::{DeviceImage, HostRegion};
pub use kernel::{KernelArguments, KernelCode, KernelProgram, KernelSource, WorkSize};
pub use session::ComputeSession;

/// Run `op` inside validation and out-of-memory error scopes.
///
/// Returns the op's value, or the first error the device reported for it.
pub(crate) fn scoped<T>(device: &wgpu::Device, op: impl FnOnce() -> T) -> Result<T, String> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = op();
    let validation = pollster::block_on(device.pop_error_scope());
    let out_of_memory = pollster::block_on(device.pop_error_scope());
    match validation.or(out_of_memory) {
        Some(err) => Err(err.to_string()),
        None => Ok(value),
    }
}
