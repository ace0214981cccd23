use std::sync::Arc;

use wgpu::{Device, Instance, Queue};

use crate::error::{Error, Result};

/// Headless wgpu device shared by a [`super::GpuRenderer`] and its
/// buffers.
pub struct GpuContext {
    pub instance: Instance,
    pub device: Arc<Device>,
    pub queue: Arc<Queue>,
}

impl GpuContext {
    /// Pick an adapter and open a device. Fails when no adapter is
    /// available, so callers can fall back to the canvas renderer.
    pub fn new() -> Result<Self> {
        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| Error::Gpu(format!("no adapter: {e}")))?;

        log::info!("Using GPU adapter {:?}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Stagecraft Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| Error::Gpu(format!("device request failed: {e}")))?;

        Ok(Self {
            instance,
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }
}
