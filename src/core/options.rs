//! Pipeline configuration.

use crate::gpu::kernel::KernelSource;
use crate::pipeline::progress::{ProgressCallback, ProgressUpdate};
use std::path::PathBuf;
use std::sync::Arc;

/// Input path used when none is given.
pub const DEFAULT_INPUT: &str = "lena.png";

/// Output path; the CLI always writes here.
pub const DEFAULT_OUTPUT: &str = "./output_img.png";

/// Options for a full pipeline run.
#[derive(Clone)]
pub struct PipelineOptions {
    /// Image to load.
    pub input_path: PathBuf,
    /// Where the transformed image is written.
    pub output_path: PathBuf,
    /// Kernel artifact to build.
    pub kernel: KernelSource,
    /// wgpu backends to enumerate adapters from.
    pub backends: wgpu::Backends,
    /// Request timestamp queries on the device when the adapter has them.
    pub profiling: bool,
    /// Compare device output against the host reference executor.
    pub verify: bool,
    /// Progress callback.
    pub progress_callback: Option<Arc<ProgressCallback>>,
}

impl std::fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("input_path", &self.input_path)
            .field("output_path", &self.output_path)
            .field("kernel", &self.kernel)
            .field("backends", &self.backends)
            .field("profiling", &self.profiling)
            .field("verify", &self.verify)
            .field("progress_callback", &self.progress_callback.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT),
            output_path: PathBuf::from(DEFAULT_OUTPUT),
            kernel: KernelSource::flip_vertical(),
            backends: wgpu::Backends::all(),
            profiling: true,
            verify: false,
            progress_callback: None,
        }
    }
}

impl PipelineOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the input image path.
    pub fn with_input(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_path = path.into();
        self
    }

    /// Set the output image path.
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    /// Use a different kernel artifact.
    pub fn with_kernel(mut self, kernel: KernelSource) -> Self {
        self.kernel = kernel;
        self
    }

    /// Restrict adapter enumeration to these backends.
    pub fn with_backends(mut self, backends: wgpu::Backends) -> Self {
        self.backends = backends;
        self
    }

    /// Enable/disable profiling capability on the queue.
    pub fn with_profiling(mut self, profiling: bool) -> Self {
        self.profiling = profiling;
        self
    }

    /// Enable/disable host verification of the device output.
    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Set progress callback.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(Box::new(callback)));
        self
    }
}
