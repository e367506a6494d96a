//! Burn HAL runtime for Kiln.
//!
//! Implements [`HalRuntime`] with [Burn](https://burn.dev): the software path
//! runs on the NdArray backend, the driver path creates a wgpu Vulkan device,
//! and the wrap path borrows the host renderer's Vulkan device through the
//! system loader.
//!
//! ```rust,ignore
//! let runtime = kiln_burn::BurnRuntime::default();
//! let instance = runtime.create_instance();
//! let device = ComputeDevice::create_cpu(&runtime, Some(&instance))?;
//! ```

mod cpu;
mod gpu;
mod instance;
mod module;
mod vulkan;

pub use cpu::{HeapAllocator, SyncDevice, VmvxLoader, VMVX_FORMAT};
pub use gpu::{WgpuDriver, WgpuDriverFactory, WgpuHalDevice};
pub use instance::BurnInstance;
pub use module::{HalModule, HAL_MODULE_NAME};
pub use vulkan::{SystemVulkanSyms, WrappedVulkanDevice};

use kiln_core::hal::{
    Allocator, Device, DriverFactory, ExecutableLoader, ExecutionMode, HalResult, HalRuntime,
    QueueSet, SyncDeviceParams, VmInstance, VmModule, VulkanDeviceOptions, VulkanHandles,
    VulkanSyms,
};
use kiln_core::DeviceConfig;
use std::sync::Arc;

/// Burn-based HAL runtime.
#[derive(Debug, Clone, Default)]
pub struct BurnRuntime {
    config: DeviceConfig,
}

impl BurnRuntime {
    pub fn new(config: DeviceConfig) -> kiln_core::Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn create_instance(&self) -> Arc<dyn VmInstance> {
        Arc::new(BurnInstance::new())
    }
}

impl HalRuntime for BurnRuntime {
    fn config(&self) -> &DeviceConfig {
        &self.config
    }

    fn create_vmvx_loader(
        &self,
        instance: &Arc<dyn VmInstance>,
        user_modules: &[Arc<dyn VmModule>],
    ) -> HalResult<Arc<dyn ExecutableLoader>> {
        Ok(Arc::new(VmvxLoader::new(instance, user_modules)))
    }

    fn create_heap_allocator(&self, identifier: &str) -> HalResult<Arc<dyn Allocator>> {
        Ok(Arc::new(HeapAllocator::new(identifier)))
    }

    fn create_sync_device(
        &self,
        params: &SyncDeviceParams,
        loaders: &[Arc<dyn ExecutableLoader>],
        allocator: &Arc<dyn Allocator>,
    ) -> HalResult<Arc<dyn Device>> {
        Ok(Arc::new(SyncDevice::new(params, loaders, allocator)?))
    }

    fn create_hal_module(
        &self,
        instance: &Arc<dyn VmInstance>,
        device: &Arc<dyn Device>,
        mode: ExecutionMode,
    ) -> HalResult<Arc<dyn VmModule>> {
        Ok(Arc::new(HalModule::new(instance, device, mode)))
    }

    fn gpu_driver_factory(&self) -> Arc<dyn DriverFactory> {
        Arc::new(WgpuDriverFactory::new(&self.config.gpu_identifier))
    }

    fn create_vulkan_syms(&self) -> HalResult<Arc<dyn VulkanSyms>> {
        Ok(Arc::new(SystemVulkanSyms::load()?))
    }

    fn wrap_vulkan_device(
        &self,
        identifier: &str,
        options: &VulkanDeviceOptions,
        syms: &Arc<dyn VulkanSyms>,
        handles: VulkanHandles,
        compute_queue_set: &QueueSet,
        transfer_queue_set: &QueueSet,
    ) -> HalResult<Arc<dyn Device>> {
        Ok(Arc::new(WrappedVulkanDevice::wrap(
            identifier,
            options,
            syms,
            handles,
            compute_queue_set,
            transfer_queue_set,
        )?))
    }
}
