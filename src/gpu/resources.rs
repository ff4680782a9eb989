//! Device, queue, and kernel-library ownership (spec §2 row 1, §5 "Shared
//! resources" — "a single GPU device and kernel library ... shared
//! process-wide; creation is lazy on first use").

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use crate::error::{IconLayerError, Result};

/// The process-wide compute device, queue, and compiled shader cache.
///
/// Command queues are conceptually "created per operation call" per spec
/// §5; in `wgpu` terms that is a fresh `CommandEncoder` per dispatch against
/// the one shared `wgpu::Queue`, which is what [`GpuResources::dispatch`]
/// does.
pub struct GpuResources {
    pub(crate) device: wgpu::Device,
    pub(crate) queue: wgpu::Queue,
    shaders: Mutex<HashMap<&'static str, Arc<wgpu::ShaderModule>>>,
}

static GLOBAL: OnceLock<std::result::Result<Arc<GpuResources>, String>> = OnceLock::new();

impl GpuResources {
    /// The process-wide [`GpuResources`] instance, created lazily on first
    /// access.
    pub fn global() -> Result<Arc<GpuResources>> {
        GLOBAL
            .get_or_init(|| pollster::block_on(Self::new()).map(Arc::new).map_err(|e| e.to_string()))
            .clone()
            .map_err(|_| IconLayerError::DeviceUnavailable)
    }

    async fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(IconLayerError::DeviceUnavailable)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("icon-layers-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults(),
                },
                None,
            )
            .await
            .map_err(|e| IconLayerError::Gpu(e.to_string()))?;

        Ok(Self {
            device,
            queue,
            shaders: Mutex::new(HashMap::new()),
        })
    }

    /// Compile (or fetch from cache) the named kernel.
    pub(crate) fn shader(&self, name: &'static str, source: &str) -> Result<Arc<wgpu::ShaderModule>> {
        let mut cache = self
            .shaders
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(module) = cache.get(name) {
            return Ok(module.clone());
        }

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(name),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            tracing::error!(shader = name, error = %err, "shader compilation failed");
            return Err(IconLayerError::ShaderLoadFailed(name.to_string()));
        }

        let module = Arc::new(module);
        cache.insert(name, module.clone());
        Ok(module)
    }
}

impl std::fmt::Debug for GpuResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuResources").finish_non_exhaustive()
    }
}
