//! Hardware abstraction layer seam.
//!
//! The compute runtime is an external collaborator. This module describes the
//! part of it [`ComputeDevice`](crate::ComputeDevice) needs: opaque,
//! reference-counted resources (`Arc<dyn ..>`) and a [`HalRuntime`] that
//! constructs them. Backends such as `kiln-burn` implement these traits; the
//! handle never looks inside the resources.
//!
//! # Lifecycle
//!
//! Every constructor hands back a new strong reference. Resources that depend
//! on others (a device on its loaders and allocator, a module on its device)
//! keep their own references, so the caller may drop its scaffolding as soon
//! as the dependent object exists.

mod registry;
mod status;
mod vulkan;

pub use registry::{DriverFactory, DriverRegistry, MAX_DRIVER_FACTORIES};
pub use status::{HalResult, Status, StatusCode};
pub use vulkan::{
    api_version_major, api_version_minor, make_api_version, QueueSet, VkDeviceHandle,
    VkInstanceHandle, VkPhysicalDeviceHandle, VulkanDeviceOptions, VulkanFeatures,
    VulkanHandles, API_VERSION_1_0,
};

use crate::config::DeviceConfig;
use core::any::Any;
use core::fmt::Debug;
use std::sync::Arc;

/// The VM execution context modules are created in.
pub trait VmInstance: Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

/// Loads compiled kernel code for one backend.
pub trait ExecutableLoader: Debug + Send + Sync {
    /// Backend format this loader accepts, e.g. `"vmvx"`.
    fn format(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}

/// Device memory allocator.
pub trait Allocator: Debug + Send + Sync {
    fn identifier(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}

/// A compute device.
pub trait Device: Debug + Send + Sync {
    fn identifier(&self) -> &str;

    /// Downcast to the backend's concrete device type.
    fn as_any(&self) -> &dyn Any;
}

/// Execution module exposing a device's operations to compiled programs.
pub trait VmModule: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}

/// A backend driver able to enumerate and create devices.
pub trait Driver: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn create_default_device(&self) -> HalResult<Arc<dyn Device>>;

    fn as_any(&self) -> &dyn Any;
}

/// Resolved Vulkan entry points.
pub trait VulkanSyms: Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

/// How a module runs submitted work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Calls block until the work completes.
    #[default]
    Synchronous,
    /// Calls return once work is queued.
    Asynchronous,
}

/// Parameters for a synchronous (inline-executing) device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncDeviceParams {
    pub identifier: String,
}

/// Constructors for every runtime resource [`ComputeDevice`](crate::ComputeDevice)
/// acquires.
///
/// All methods report failure as a [`Status`]; none of them retry.
pub trait HalRuntime: Send + Sync {
    fn config(&self) -> &DeviceConfig;

    /// Loader for software (non-GPU) execution.
    fn create_vmvx_loader(
        &self,
        instance: &Arc<dyn VmInstance>,
        user_modules: &[Arc<dyn VmModule>],
    ) -> HalResult<Arc<dyn ExecutableLoader>>;

    /// Heap-backed allocator for the device named `identifier`.
    fn create_heap_allocator(&self, identifier: &str) -> HalResult<Arc<dyn Allocator>>;

    /// Device that executes inline on the calling thread.
    fn create_sync_device(
        &self,
        params: &SyncDeviceParams,
        loaders: &[Arc<dyn ExecutableLoader>],
        allocator: &Arc<dyn Allocator>,
    ) -> HalResult<Arc<dyn Device>>;

    /// Execution module bound to `device`.
    fn create_hal_module(
        &self,
        instance: &Arc<dyn VmInstance>,
        device: &Arc<dyn Device>,
        mode: ExecutionMode,
    ) -> HalResult<Arc<dyn VmModule>>;

    /// Registry drivers are registered into and created from.
    fn driver_registry(&self) -> &DriverRegistry {
        DriverRegistry::global()
    }

    /// Factory for the GPU driver backend.
    fn gpu_driver_factory(&self) -> Arc<dyn DriverFactory>;

    /// Resolve the Vulkan API from the system's dynamic loader.
    fn create_vulkan_syms(&self) -> HalResult<Arc<dyn VulkanSyms>>;

    /// Wrap a device the host already created. The host keeps ownership of
    /// the Vulkan objects; the returned device only borrows them.
    fn wrap_vulkan_device(
        &self,
        identifier: &str,
        options: &VulkanDeviceOptions,
        syms: &Arc<dyn VulkanSyms>,
        handles: VulkanHandles,
        compute_queue_set: &QueueSet,
        transfer_queue_set: &QueueSet,
    ) -> HalResult<Arc<dyn Device>>;
}
