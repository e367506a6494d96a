//! Shared handle to a compute device and the HAL module bound to it.

use crate::error::CaptureStage;
use crate::hal::{
    Device, ExecutionMode, HalRuntime, QueueSet, Status, SyncDeviceParams, VmInstance, VmModule,
};
use crate::rendering::{HostVulkanContext, RenderingApi, RenderingDevice, RenderingServer};
use crate::{Error, Result};
use std::sync::Arc;

/// A device and the module that was created against it.
#[derive(Debug, Clone)]
struct Bound {
    // Declaration order is drop order: the module goes before its device.
    module: Arc<dyn VmModule>,
    device: Arc<dyn Device>,
}

/// Owns a compute device and an execution module bound to that device.
///
/// A handle is either empty or holds both references; it is never half
/// populated. Cloning shares both resources (each reference count goes up by
/// one). [`take`](Self::take) moves them out and leaves the source empty.
/// Dropping the handle releases both.
///
/// # Capturing
///
/// - [`capture_cpu`](Self::capture_cpu) builds a software device that runs
///   compiled programs inline on the calling thread.
/// - [`capture_gpu`](Self::capture_gpu) builds a Vulkan device, either from a
///   freshly created driver or by wrapping the device the host renderer is
///   already using.
///
/// Modules are always built in [`ExecutionMode::Synchronous`]: calls into a
/// captured device complete before they return.
///
/// Both release whatever the handle held before starting. If construction
/// fails at any step the objects created so far are released in reverse
/// order and the handle is left empty.
///
/// ```rust,ignore
/// let runtime = kiln_burn::BurnRuntime::default();
/// let instance = runtime.create_instance();
///
/// let device = ComputeDevice::create_gpu(&runtime, &host, Some(&instance))
///     .or_else(|_| ComputeDevice::create_cpu(&runtime, Some(&instance)))?;
/// assert!(device.is_valid());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ComputeDevice {
    bound: Option<Bound>,
}

impl ComputeDevice {
    /// An empty (invalid) handle.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_cpu(
        runtime: &dyn HalRuntime,
        instance: Option<&Arc<dyn VmInstance>>,
    ) -> Result<Self> {
        let mut device = Self::new();
        device.capture_cpu(runtime, instance)?;
        Ok(device)
    }

    pub fn create_gpu(
        runtime: &dyn HalRuntime,
        host: &dyn RenderingServer,
        instance: Option<&Arc<dyn VmInstance>>,
    ) -> Result<Self> {
        let mut device = Self::new();
        device.capture_gpu(runtime, host, instance)?;
        Ok(device)
    }

    /// Capture a software device: one software executable loader, a heap
    /// allocator, a synchronous device over both, and a synchronous module
    /// over the device.
    ///
    /// `instance` is `None` when the host has not brought up a VM instance;
    /// this fails with [`Error::InvalidParameter`] and leaves the handle
    /// untouched.
    pub fn capture_cpu(
        &mut self,
        runtime: &dyn HalRuntime,
        instance: Option<&Arc<dyn VmInstance>>,
    ) -> Result<()> {
        let Some(instance) = instance else {
            return Err(missing_instance());
        };

        self.release();

        let config = runtime.config();
        let identifier = config.cpu_identifier.as_str();

        let loader = runtime
            .create_vmvx_loader(instance, &[])
            .map_err(|status| cant_create(CaptureStage::Loader, status))?;
        let allocator = runtime
            .create_heap_allocator(identifier)
            .map_err(|status| cant_create(CaptureStage::Allocator, status))?;
        let params = SyncDeviceParams {
            identifier: identifier.to_string(),
        };
        let device = runtime
            .create_sync_device(&params, std::slice::from_ref(&loader), &allocator)
            .map_err(|status| cant_create(CaptureStage::Device, status))?;
        let module = runtime
            .create_hal_module(instance, &device, ExecutionMode::Synchronous)
            .map_err(|status| cant_create(CaptureStage::Module, status))?;

        tracing::debug!("Captured software device '{}'", device.identifier());
        self.bound = Some(Bound { module, device });
        Ok(())
    }

    /// Capture a Vulkan device.
    ///
    /// If the host renders through Vulkan, its instance, physical device,
    /// logical device and queue family are wrapped. Otherwise the runtime's
    /// GPU driver is registered in the driver registry (a process-wide side
    /// effect, repeated registration is harmless) and asked for its default
    /// device. The host is inspected once, at the start of the call.
    pub fn capture_gpu(
        &mut self,
        runtime: &dyn HalRuntime,
        host: &dyn RenderingServer,
        instance: Option<&Arc<dyn VmInstance>>,
    ) -> Result<()> {
        let Some(instance) = instance else {
            return Err(missing_instance());
        };

        self.release();

        let bound = match host.rendering_device() {
            Some(rendering_device) if rendering_device.api() == RenderingApi::Vulkan => {
                tracing::debug!("Host renders through Vulkan, wrapping its device");
                Self::wrap_host_device(runtime, rendering_device, instance)?
            }
            Some(rendering_device) => {
                tracing::debug!(
                    "Host renders through {:?}, creating a Vulkan device",
                    rendering_device.api()
                );
                Self::create_driver_device(runtime, instance)?
            }
            None => {
                tracing::debug!("No host rendering device, creating a Vulkan device");
                Self::create_driver_device(runtime, instance)?
            }
        };

        tracing::debug!("Captured GPU device '{}'", bound.device.identifier());
        self.bound = Some(bound);
        Ok(())
    }

    fn create_driver_device(
        runtime: &dyn HalRuntime,
        instance: &Arc<dyn VmInstance>,
    ) -> Result<Bound> {
        let config = runtime.config();
        let registry = runtime.driver_registry();

        registry
            .register(runtime.gpu_driver_factory())
            .map_err(|status| {
                tracing::error!("Unable to register Vulkan HAL driver: {}", status);
                Error::Failed {
                    stage: CaptureStage::DriverRegistration,
                    status,
                }
            })?;

        let driver = registry
            .try_create(&config.gpu_identifier)
            .map_err(|status| cant_create(CaptureStage::Driver, status))?;
        let device = driver
            .create_default_device()
            .map_err(|status| cant_create(CaptureStage::DefaultDevice, status))?;
        let module = runtime
            .create_hal_module(instance, &device, ExecutionMode::Synchronous)
            .map_err(|status| cant_create(CaptureStage::Module, status))?;

        Ok(Bound { module, device })
    }

    fn wrap_host_device(
        runtime: &dyn HalRuntime,
        rendering_device: &dyn RenderingDevice,
        instance: &Arc<dyn VmInstance>,
    ) -> Result<Bound> {
        let config = runtime.config();
        let host = HostVulkanContext::query(rendering_device)?;

        let compute_queue_set =
            QueueSet::new(host.queue_family_index, config.compute_queue_indices);
        let transfer_queue_set = if config.transfer_queue_indices == 0 {
            QueueSet::empty()
        } else {
            QueueSet::new(host.queue_family_index, config.transfer_queue_indices)
        };
        let options = config.vulkan_device_options();

        let syms = runtime
            .create_vulkan_syms()
            .map_err(|status| cant_create(CaptureStage::Syms, status))?;
        let device = runtime
            .wrap_vulkan_device(
                &config.gpu_identifier,
                &options,
                &syms,
                host.handles,
                &compute_queue_set,
                &transfer_queue_set,
            )
            .map_err(|status| cant_create(CaptureStage::WrapDevice, status))?;
        let module = runtime
            .create_hal_module(instance, &device, ExecutionMode::Synchronous)
            .map_err(|status| cant_create(CaptureStage::Module, status))?;

        Ok(Bound { module, device })
    }

    /// Drop the module, then the device. No-op on an empty handle.
    pub fn release(&mut self) {
        if let Some(Bound { module, device }) = self.bound.take() {
            tracing::trace!(
                "Releasing HAL module '{}' of device '{}'",
                module.name(),
                device.identifier()
            );
            drop(module);
            drop(device);
        }
    }

    pub fn is_valid(&self) -> bool {
        self.bound.is_some()
    }

    pub fn borrow_hal_device(&self) -> Option<&Arc<dyn Device>> {
        self.bound.as_ref().map(|b| &b.device)
    }

    pub fn borrow_hal_module(&self) -> Option<&Arc<dyn VmModule>> {
        self.bound.as_ref().map(|b| &b.module)
    }

    /// Move the resources into a new handle, leaving this one empty.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

impl Drop for ComputeDevice {
    fn drop(&mut self) {
        self.release();
    }
}

fn missing_instance() -> Error {
    tracing::error!("Capture requires a VM instance");
    Error::InvalidParameter("instance")
}

fn cant_create(stage: CaptureStage, status: Status) -> Error {
    tracing::error!("Capture failed while {}: {}", stage, status);
    Error::CantCreate { stage, status }
}
