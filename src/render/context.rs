//! GPU context management using wgpu

use std::sync::Arc;
use winit::window::Window;
use crate::core::error::Error;

/// Frames the surface may queue ahead of presentation
pub const FRAMES_IN_FLIGHT: usize = 2;

/// GPU rendering context
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
    /// Whether the device was created with `TIMESTAMP_QUERY`
    pub timestamps: bool,
}

impl GpuContext {
    /// Create new GPU context from window
    pub async fn new(window: Arc<Window>, want_timestamps: bool) -> Result<Self, Error> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())
            .map_err(|e| Error::Gpu(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| Error::Gpu(format!("No suitable adapter found: {:?}", e)))?;

        let info = adapter.get_info();
        log::info!("Adapter: {} ({:?}, {:?})", info.name, info.device_type, info.backend);

        let timestamps = want_timestamps && adapter.features().contains(wgpu::Features::TIMESTAMP_QUERY);
        if want_timestamps && !timestamps {
            log::warn!("Adapter lacks TIMESTAMP_QUERY, GPU profiling disabled");
        }

        let (device, queue) = request_device(&adapter, timestamps).await?;

        let size = window.inner_size();
        let capabilities = surface.get_capabilities(&adapter);
        let format = capabilities
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| capabilities.formats.first().copied())
            .ok_or_else(|| Error::Surface("surface reports no supported formats".to_string()))?;
        let alpha_mode = capabilities
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: FRAMES_IN_FLIGHT as u32,
        };

        surface.configure(&device, &config);

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            surface,
            config,
            timestamps,
        })
    }

    /// Resize the surface
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Re-apply the current configuration after the surface went stale
    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }

    /// Get surface size
    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Get surface format
    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }
}

async fn request_device(adapter: &wgpu::Adapter, timestamps: bool) -> Result<(wgpu::Device, wgpu::Queue), Error> {
    let adapter_limits = adapter.limits();

    let required_features = if timestamps {
        wgpu::Features::TIMESTAMP_QUERY
    } else {
        wgpu::Features::empty()
    };

    let device_desc = wgpu::DeviceDescriptor {
        label: Some("meadow_device"),
        required_features,
        required_limits: wgpu::Limits {
            max_storage_buffer_binding_size: adapter_limits.max_storage_buffer_binding_size,
            max_buffer_size: adapter_limits.max_buffer_size,
            ..wgpu::Limits::downlevel_defaults()
        },
        memory_hints: wgpu::MemoryHints::Performance,
        experimental_features: Default::default(),
        trace: Default::default(),
    };

    let (device, queue) = adapter
        .request_device(&device_desc)
        .await
        .map_err(|e| Error::Gpu(e.to_string()))?;

    log::info!("GPU buffer limits: max_buffer_size={}MB, max_storage_binding={}MB",
        adapter_limits.max_buffer_size / 1024 / 1024,
        adapter_limits.max_storage_buffer_binding_size / 1024 / 1024);

    Ok((device, queue))
}

/// Device and queue without a surface, for tests and offline tools.
pub async fn headless() -> Result<(wgpu::Device, wgpu::Queue), Error> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|e| Error::Gpu(format!("No suitable adapter found: {:?}", e)))?;
    request_device(&adapter, false).await
}
