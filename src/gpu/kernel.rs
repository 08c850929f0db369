//! Kernel build, argument binding and dispatch.

use crate::core::error::{PipelineError, PipelineResult};
use crate::core::types::AccessMode;
use crate::gpu::device::ComputeDeviceContext;
use crate::gpu::image::DeviceImage;
use crate::gpu::reference::HostReference;
use crate::gpu::{scoped, shaders};
use serde::Serialize;
use std::borrow::Cow;
use std::path::Path;

/// Compiled kernel payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelCode {
    /// WGSL source text.
    Wgsl(Cow<'static, str>),
    /// SPIR-V binary.
    SpirV(Vec<u8>),
}

/// A kernel artifact selected at configuration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelSource {
    label: String,
    code: KernelCode,
    entry_point: String,
    workgroup_size: [u32; 2],
    reference: Option<HostReference>,
}

impl KernelSource {
    /// The embedded vertical flip kernel.
    pub fn flip_vertical() -> Self {
        Self {
            label: "flip_vertical".to_string(),
            code: KernelCode::Wgsl(Cow::Borrowed(shaders::FLIP_VERTICAL)),
            entry_point: shaders::FLIP_VERTICAL_ENTRY.to_string(),
            workgroup_size: shaders::FLIP_VERTICAL_WORKGROUP,
            reference: Some(HostReference::FlipVertical),
        }
    }

    /// WGSL source text with the given entry point and workgroup size.
    pub fn wgsl(
        source: impl Into<String>,
        entry_point: impl Into<String>,
        workgroup_size: [u32; 2],
    ) -> Self {
        Self {
            label: "custom_wgsl".to_string(),
            code: KernelCode::Wgsl(Cow::Owned(source.into())),
            entry_point: entry_point.into(),
            workgroup_size,
            reference: None,
        }
    }

    /// Load a kernel from disk. A `.spv` extension selects SPIR-V, anything
    /// else is read as WGSL text.
    pub fn from_path(
        path: impl AsRef<Path>,
        entry_point: impl Into<String>,
        workgroup_size: [u32; 2],
    ) -> std::io::Result<Self> {
        let path = path.as_ref();
        let is_spirv = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("spv"))
            .unwrap_or(false);

        let code = if is_spirv {
            KernelCode::SpirV(std::fs::read(path)?)
        } else {
            KernelCode::Wgsl(Cow::Owned(std::fs::read_to_string(path)?))
        };

        Ok(Self {
            label: path.display().to_string(),
            code,
            entry_point: entry_point.into(),
            workgroup_size,
            reference: None,
        })
    }

    /// Attach a host reference used to verify device output.
    pub fn with_reference(mut self, reference: HostReference) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Kernel payload.
    pub fn code(&self) -> &KernelCode {
        &self.code
    }

    /// Entry point name.
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Workgroup size the kernel declares.
    pub fn workgroup_size(&self) -> [u32; 2] {
        self.workgroup_size
    }

    /// Host reference for this kernel, if any.
    pub fn reference(&self) -> Option<HostReference> {
        self.reference
    }

    fn shader_source(&self) -> wgpu::ShaderSource<'_> {
        match &self.code {
            KernelCode::Wgsl(text) => wgpu::ShaderSource::Wgsl(Cow::Borrowed(text.as_ref())),
            KernelCode::SpirV(bytes) => wgpu::util::make_spirv(bytes),
        }
    }
}

/// Global index space of a dispatch and the workgroup it is tiled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkSize {
    /// One work item per pixel: `[width, height]`.
    pub global: [u32; 2],
    /// Workgroup size declared by the kernel.
    pub local: [u32; 2],
}

impl WorkSize {
    /// Work size for a `width` x `height` image.
    pub fn for_image(width: u32, height: u32, local: [u32; 2]) -> Self {
        Self {
            global: [width, height],
            local,
        }
    }

    /// Workgroups to dispatch per axis.
    pub fn groups(&self) -> [u32; 2] {
        [
            self.global[0].div_ceil(self.local[0].max(1)),
            self.global[1].div_ceil(self.local[1].max(1)),
        ]
    }

    /// Index space actually launched, including workgroup overshoot.
    pub fn launched(&self) -> [u32; 2] {
        let [gx, gy] = self.groups();
        [gx * self.local[0].max(1), gy * self.local[1].max(1)]
    }
}

/// A built kernel: compute pipeline plus the program it came from.
///
/// The pipeline is declared first so it is released before the module.
pub struct KernelProgram {
    pipeline: wgpu::ComputePipeline,
    #[allow(dead_code)]
    module: wgpu::ShaderModule,
    entry_point: String,
    workgroup_size: [u32; 2],
    reference: Option<HostReference>,
}

impl KernelProgram {
    /// Compile `source` and resolve its entry point.
    pub fn build(ctx: &ComputeDeviceContext, source: &KernelSource) -> PipelineResult<Self> {
        let device = ctx.device();

        if let KernelCode::SpirV(bytes) = source.code() {
            check_spirv(bytes).map_err(|log| PipelineError::CompileError { log })?;
        }

        let created = scoped(device, || {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(source.label()),
                source: source.shader_source(),
            })
        });

        let module = match created {
            Ok(module) => {
                let info = pollster::block_on(module.get_compilation_info());
                let (errors, log) = format_messages(&info.messages);
                if errors > 0 {
                    return Err(PipelineError::CompileError { log });
                }
                if !log.is_empty() {
                    log::warn!("kernel '{}' compiled with messages:\n{}", source.label(), log);
                }
                module
            }
            Err(detail) => return Err(PipelineError::CompileError { log: detail }),
        };

        let pipeline = scoped(device, || {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(source.entry_point()),
                layout: None,
                module: &module,
                entry_point: Some(source.entry_point()),
                compilation_options: Default::default(),
                cache: None,
            })
        })
        .map_err(|detail| PipelineError::KernelResolutionError {
            entry_point: source.entry_point().to_string(),
            detail,
        })?;

        log::debug!(
            "built kernel '{}' from {}",
            source.entry_point(),
            source.label()
        );

        Ok(Self {
            pipeline,
            module,
            entry_point: source.entry_point().to_string(),
            workgroup_size: source.workgroup_size(),
            reference: source.reference(),
        })
    }

    /// Entry point name.
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Workgroup size the kernel was built with.
    pub fn workgroup_size(&self) -> [u32; 2] {
        self.workgroup_size
    }

    /// Host reference for verification, if the kernel has one.
    pub fn reference(&self) -> Option<HostReference> {
        self.reference
    }

    /// Work size covering a `width` x `height` image.
    pub fn work_size(&self, width: u32, height: u32) -> WorkSize {
        WorkSize::for_image(width, height, self.workgroup_size)
    }

    /// Bind argument 0 to `input` and argument 1 to `output`.
    pub fn bind(
        &self,
        ctx: &ComputeDeviceContext,
        input: &DeviceImage<'_>,
        output: &DeviceImage<'_>,
    ) -> PipelineResult<KernelArguments> {
        for (index, image, expected) in [
            (0, input, AccessMode::ReadOnly),
            (1, output, AccessMode::WriteOnly),
        ] {
            if image.access() != expected {
                return Err(PipelineError::ArgumentBindingError {
                    detail: format!(
                        "argument {} must be a {} image, got {}",
                        index,
                        expected,
                        image.access()
                    ),
                });
            }
        }

        let device = ctx.device();
        let bind_group = scoped(device, || {
            let layout = self.pipeline.get_bind_group_layout(0);
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("kernel_arguments"),
                layout: &layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(input.view()),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(output.view()),
                    },
                ],
            })
        })
        .map_err(|detail| PipelineError::ArgumentBindingError { detail })?;

        Ok(KernelArguments { bind_group })
    }

    /// Enqueue the kernel over `work` on the context's queue.
    pub fn dispatch(
        &self,
        ctx: &ComputeDeviceContext,
        args: &KernelArguments,
        work: WorkSize,
    ) -> PipelineResult<()> {
        let [gx, gy] = work.groups();
        let device = ctx.device();

        scoped(device, || {
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("kernel_encoder"),
            });
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some(self.entry_point.as_str()),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.pipeline);
                pass.set_bind_group(0, &args.bind_group, &[]);
                pass.dispatch_workgroups(gx, gy, 1);
            }
            ctx.queue().submit(std::iter::once(encoder.finish()));
        })
        .map_err(|detail| PipelineError::DispatchFailed { detail })?;

        log::debug!(
            "dispatched '{}' global {:?} as {}x{} groups of {:?}",
            self.entry_point,
            work.global,
            gx,
            gy,
            work.local
        );
        Ok(())
    }
}

impl std::fmt::Debug for KernelProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelProgram")
            .field("entry_point", &self.entry_point)
            .field("workgroup_size", &self.workgroup_size)
            .finish()
    }
}

/// Kernel arguments bound for one dispatch.
#[derive(Debug)]
pub struct KernelArguments {
    bind_group: wgpu::BindGroup,
}

const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Reject payloads that are not word-aligned SPIR-V before handing them to
/// wgpu, which panics on them.
fn check_spirv(bytes: &[u8]) -> Result<(), String> {
    if bytes.len() < 4 || bytes.len() % 4 != 0 {
        return Err(format!(
            "SPIR-V payload must be a non-empty multiple of 4 bytes, got {}",
            bytes.len()
        ));
    }
    let word = [bytes[0], bytes[1], bytes[2], bytes[3]];
    if u32::from_le_bytes(word) != SPIRV_MAGIC && u32::from_be_bytes(word) != SPIRV_MAGIC {
        return Err("SPIR-V payload has no magic number".to_string());
    }
    Ok(())
}

fn format_messages(messages: &[wgpu::CompilationMessage]) -> (usize, String) {
    let mut errors = 0;
    let lines: Vec<String> = messages
        .iter()
        .map(|msg| {
            let kind = match msg.message_type {
                wgpu::CompilationMessageType::Error => {
                    errors += 1;
                    "error"
                }
                wgpu::CompilationMessageType::Warning => "warning",
                wgpu::CompilationMessageType::Info => "info",
            };
            match &msg.location {
                Some(loc) => format!(
                    "{}:{}: {}: {}",
                    loc.line_number, loc.line_position, kind, msg.message
                ),
                None => format!("{}: {}", kind, msg.message),
            }
        })
        .collect();
    (errors, lines.join("\n"))
}
