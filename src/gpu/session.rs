//! Per-process device state, owned explicitly.

use crate::core::error::PipelineResult;
use crate::core::options::PipelineOptions;
use crate::gpu::device::ComputeDeviceContext;
use crate::gpu::kernel::KernelProgram;

/// The device context and the kernel built on it.
///
/// Dropping the session releases the kernel, then the program, then the
/// queue, device and instance.
#[derive(Debug)]
pub struct ComputeSession {
    kernel: KernelProgram,
    context: ComputeDeviceContext,
}

impl ComputeSession {
    /// Acquire a device and build the configured kernel on it.
    pub fn open(options: &PipelineOptions) -> PipelineResult<Self> {
        let context = ComputeDeviceContext::acquire(options)?;
        log::debug!("selected {}", context.describe());
        let kernel = KernelProgram::build(&context, &options.kernel)?;
        Ok(Self { kernel, context })
    }

    /// Device context.
    pub fn context(&self) -> &ComputeDeviceContext {
        &self.context
    }

    /// Built kernel.
    pub fn kernel(&self) -> &KernelProgram {
        &self.kernel
    }
}

impl Drop for ComputeSession {
    fn drop(&mut self) {
        log::debug!("releasing compute session on {}", self.context.device_name());
    }
}
