//! Vulkan driver backed by wgpu, with devices handed to Burn.

use burn::backend::wgpu::{init_device, RuntimeOptions, WgpuDevice, WgpuSetup};
use kiln_core::hal::{Device, Driver, DriverFactory, HalResult, Status};
use std::any::Any;
use std::sync::Arc;
use wgpu::{
    Backends, DeviceDescriptor, Features, MemoryHints, PowerPreference, RequestAdapterOptions,
};

/// Registers the wgpu Vulkan driver under `name`.
#[derive(Debug, Clone)]
pub struct WgpuDriverFactory {
    name: String,
}

impl WgpuDriverFactory {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl DriverFactory for WgpuDriverFactory {
    fn driver_name(&self) -> &str {
        &self.name
    }

    fn create_driver(&self) -> HalResult<Arc<dyn Driver>> {
        Ok(Arc::new(WgpuDriver::new(&self.name)))
    }
}

#[derive(Debug)]
pub struct WgpuDriver {
    name: String,
    backends: Backends,
}

impl WgpuDriver {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            backends: Backends::VULKAN,
        }
    }

    /// Open a device on the highest-performance Vulkan adapter with the
    /// adapter's full limits rather than the WebGPU defaults.
    async fn open_vulkan(&self) -> HalResult<WgpuSetup> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: self.backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .map_err(|e| {
                Status::unavailable(format!("driver '{}' found no adapter: {}", self.name, e))
            })?;
        let info = adapter.get_info();
        tracing::debug!(
            "Driver '{}' using {} ({:?}, {})",
            self.name,
            info.name,
            info.device_type,
            info.driver_info
        );

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some(self.name.as_str()),
                required_features: Features::empty(),
                required_limits: adapter.limits(),
                memory_hints: MemoryHints::Performance,
                trace: Default::default(),
            })
            .await
            .map_err(|e| {
                Status::unavailable(format!(
                    "driver '{}' could not open {}: {}",
                    self.name, info.name, e
                ))
            })?;

        Ok(WgpuSetup {
            instance,
            adapter,
            device,
            queue,
            backend: info.backend,
        })
    }
}

impl Driver for WgpuDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_default_device(&self) -> HalResult<Arc<dyn Device>> {
        let setup = pollster::block_on(self.open_vulkan())?;
        let adapter_info = setup.adapter.get_info();
        let device = init_device(setup, RuntimeOptions::default());

        Ok(Arc::new(WgpuHalDevice {
            identifier: self.name.clone(),
            adapter_info,
            device,
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A GPU device created by [`WgpuDriver`].
#[derive(Debug)]
pub struct WgpuHalDevice {
    identifier: String,
    adapter_info: wgpu::AdapterInfo,
    device: WgpuDevice,
}

impl WgpuHalDevice {
    pub fn burn_device(&self) -> &WgpuDevice {
        &self.device
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }
}

impl Device for WgpuHalDevice {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
