//! Device discovery and context/queue creation.

use crate::core::error::{PipelineError, PipelineResult};
use crate::core::options::PipelineOptions;
use crate::core::types::{AccessMode, DEVICE_FORMAT};

/// A GPU device with its queue.
///
/// Fields are declared in reverse-dependency order so that dropping the
/// context releases the queue first and the instance last.
pub struct ComputeDeviceContext {
    queue: wgpu::Queue,
    device: wgpu::Device,
    adapter: wgpu::Adapter,
    #[allow(dead_code)]
    instance: wgpu::Instance,
    info: wgpu::AdapterInfo,
    profiling: bool,
}

impl ComputeDeviceContext {
    /// Select the first GPU adapter and create a device and queue on it.
    ///
    /// Fails with `DeviceUnavailable` before any device creation is attempted
    /// when no GPU-class adapter is enumerated.
    pub fn acquire(options: &PipelineOptions) -> PipelineResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: options.backends,
            ..Default::default()
        });

        let mut adapters = instance.enumerate_adapters(options.backends);
        if adapters.is_empty() {
            return Err(PipelineError::DeviceUnavailable {
                reason: format!("no adapters enumerated for backends {:?}", options.backends),
            });
        }

        let infos: Vec<wgpu::AdapterInfo> = adapters.iter().map(|a| a.get_info()).collect();
        let index = select_gpu(&infos).ok_or_else(|| PipelineError::DeviceUnavailable {
            reason: format!(
                "{} adapter(s) enumerated but none is a GPU: {}",
                infos.len(),
                infos
                    .iter()
                    .map(|i| format!("{} ({:?})", i.name, i.device_type))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        })?;
        let adapter = adapters.swap_remove(index);
        let info = infos[index].clone();

        log::info!("Device: {}", info.name);

        let mut required_features = wgpu::Features::empty();
        let profiling = options.profiling
            && adapter.features().contains(wgpu::Features::TIMESTAMP_QUERY);
        if profiling {
            required_features |= wgpu::Features::TIMESTAMP_QUERY;
        } else if options.profiling {
            log::warn!("{} does not support timestamp queries; profiling disabled", info.name);
        }

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("imgturn-device"),
                required_features,
                required_limits: adapter.limits(),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))
        .map_err(|e| PipelineError::ContextCreationFailed {
            device: info.name.clone(),
            detail: e.to_string(),
        })?;

        device.on_uncaptured_error(Box::new(|err: wgpu::Error| {
            log::error!("uncaptured device error: {}", err);
        }));

        Ok(Self {
            queue,
            device,
            adapter,
            instance,
            info,
            profiling,
        })
    }

    /// The wgpu device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// The in-order submission queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Adapter information of the selected device.
    pub fn info(&self) -> &wgpu::AdapterInfo {
        &self.info
    }

    /// Human-readable device name.
    pub fn device_name(&self) -> &str {
        &self.info.name
    }

    /// Whether timestamp queries were enabled at device creation.
    pub fn profiling_enabled(&self) -> bool {
        self.profiling
    }

    /// Largest width or height a device image may have.
    pub fn max_image_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    /// Check that the device image format supports the usages `access` needs.
    pub fn check_format(&self, access: AccessMode) -> Result<(), String> {
        let features = self.adapter.get_texture_format_features(DEVICE_FORMAT);
        let needed = access.texture_usages();
        if features.allowed_usages.contains(needed) {
            Ok(())
        } else {
            Err(format!(
                "{:?} does not support {:?} on {} (allowed: {:?})",
                DEVICE_FORMAT, needed, self.info.name, features.allowed_usages
            ))
        }
    }

    /// Block until all submitted work has finished.
    pub fn wait_idle(&self) {
        self.device.poll(wgpu::Maintain::Wait);
    }

    /// One-line summary of the selected device.
    pub fn describe(&self) -> String {
        format!(
            "{} [{:?}, {:?}, driver {} {}]",
            self.info.name,
            self.info.backend,
            self.info.device_type,
            self.info.driver,
            self.info.driver_info
        )
    }
}

impl std::fmt::Debug for ComputeDeviceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputeDeviceContext")
            .field("device", &self.info.name)
            .field("backend", &self.info.backend)
            .field("profiling", &self.profiling)
            .finish()
    }
}

/// Index of the first GPU-class adapter, in enumeration order.
pub fn select_gpu(adapters: &[wgpu::AdapterInfo]) -> Option<usize> {
    adapters.iter().position(|info| is_gpu(info.device_type))
}

fn is_gpu(device_type: wgpu::DeviceType) -> bool {
    matches!(
        device_type,
        wgpu::DeviceType::DiscreteGpu
            | wgpu::DeviceType::IntegratedGpu
            | wgpu::DeviceType::VirtualGpu
    )
}
