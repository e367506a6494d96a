//! Wrapping a host-owned Vulkan device.
//!
//! The host renderer already created the instance and device. Entry points are
//! resolved from the system Vulkan loader and the compute queue is looked up
//! on the host device; nothing here creates or destroys Vulkan objects.

use kiln_core::hal::{
    Device, HalResult, QueueSet, Status, StatusCode, VulkanDeviceOptions, VulkanHandles,
    VulkanSyms, API_VERSION_1_0,
};
use std::any::Any;
use std::ffi::{c_char, c_void, CStr};
use std::ptr;
use std::sync::Arc;

type PfnVoidFunction = Option<unsafe extern "system" fn()>;
type PfnGetInstanceProcAddr =
    unsafe extern "system" fn(instance: *mut c_void, name: *const c_char) -> PfnVoidFunction;
type PfnGetDeviceProcAddr =
    unsafe extern "system" fn(device: *mut c_void, name: *const c_char) -> PfnVoidFunction;
type PfnEnumerateInstanceVersion = unsafe extern "system" fn(api_version: *mut u32) -> i32;
type PfnGetDeviceQueue = unsafe extern "system" fn(
    device: *mut c_void,
    queue_family_index: u32,
    queue_index: u32,
    queue: *mut *mut c_void,
);

#[cfg(target_os = "windows")]
const LOADER_NAMES: &[&str] = &["vulkan-1.dll"];
#[cfg(target_os = "macos")]
const LOADER_NAMES: &[&str] = &["libvulkan.1.dylib", "libvulkan.dylib", "libMoltenVK.dylib"];
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const LOADER_NAMES: &[&str] = &["libvulkan.so.1", "libvulkan.so"];

/// Vulkan entry points resolved from the system loader.
pub struct SystemVulkanSyms {
    get_instance_proc_addr: PfnGetInstanceProcAddr,
    loader_version: u32,
    _library: libloading::Library,
}

impl SystemVulkanSyms {
    /// Open the platform's Vulkan loader.
    pub fn load() -> HalResult<Self> {
        let mut errors = Vec::new();
        for name in LOADER_NAMES {
            match unsafe { libloading::Library::new(name) } {
                Ok(library) => {
                    tracing::debug!("Loaded Vulkan loader {}", name);
                    return Self::from_library(library);
                }
                Err(e) => errors.push(format!("{}: {}", name, e)),
            }
        }
        Err(Status::unavailable(format!(
            "Vulkan loader not found ({})",
            errors.join("; ")
        )))
    }

    fn from_library(library: libloading::Library) -> HalResult<Self> {
        let get_instance_proc_addr: PfnGetInstanceProcAddr = unsafe {
            *library
                .get::<PfnGetInstanceProcAddr>(b"vkGetInstanceProcAddr\0")
                .map_err(|e| {
                    Status::unavailable(format!("vkGetInstanceProcAddr not exported: {}", e))
                })?
        };

        // vkEnumerateInstanceVersion only exists on 1.1+ loaders.
        let loader_version = match unsafe {
            get_instance_proc_addr(ptr::null_mut(), c"vkEnumerateInstanceVersion".as_ptr())
        } {
            Some(f) => {
                let enumerate: PfnEnumerateInstanceVersion = unsafe { std::mem::transmute(f) };
                let mut version = 0u32;
                let result = unsafe { enumerate(&mut version) };
                enumerated_version(result, version)
            }
            None => API_VERSION_1_0,
        };

        Ok(Self {
            get_instance_proc_addr,
            loader_version,
            _library: library,
        })
    }

    /// Highest instance-level API version the loader supports.
    pub fn loader_version(&self) -> u32 {
        self.loader_version
    }

    /// Resolve an instance-level command. `instance` is a raw `VkInstance`.
    pub fn instance_proc(&self, instance: u64, name: &CStr) -> PfnVoidFunction {
        unsafe { (self.get_instance_proc_addr)(instance as usize as *mut c_void, name.as_ptr()) }
    }
}

/// Loader version from a `vkEnumerateInstanceVersion` call, 1.0 if it failed.
fn enumerated_version(result: i32, version: u32) -> u32 {
    match Status::check(result, "vkEnumerateInstanceVersion failed") {
        Ok(()) => version,
        Err(status) => {
            tracing::warn!("{} (VkResult {}), assuming Vulkan 1.0", status, result);
            API_VERSION_1_0
        }
    }
}

impl std::fmt::Debug for SystemVulkanSyms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemVulkanSyms")
            .field("loader_version", &self.loader_version)
            .finish()
    }
}

impl VulkanSyms for SystemVulkanSyms {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A host-owned Vulkan device made usable as a compute device.
///
/// This records the host's handles and resolves the compute queue
/// ([`compute_queue`](Self::compute_queue)), but it has no Burn backend
/// attached: unlike [`SyncDevice`](crate::SyncDevice) and
/// [`WgpuHalDevice`](crate::WgpuHalDevice) there is no way to run tensor
/// work on it yet. Callers needing Burn execution should capture through the
/// driver path (a host without a Vulkan rendering device).
#[derive(Debug)]
pub struct WrappedVulkanDevice {
    identifier: String,
    handles: VulkanHandles,
    options: VulkanDeviceOptions,
    compute_queue_set: QueueSet,
    transfer_queue_set: QueueSet,
    compute_queue: u64,
    debug_utils: bool,
    _syms: Arc<dyn VulkanSyms>,
}

impl WrappedVulkanDevice {
    pub fn wrap(
        identifier: &str,
        options: &VulkanDeviceOptions,
        syms: &Arc<dyn VulkanSyms>,
        handles: VulkanHandles,
        compute_queue_set: &QueueSet,
        transfer_queue_set: &QueueSet,
    ) -> HalResult<Self> {
        let system = syms
            .as_any()
            .downcast_ref::<SystemVulkanSyms>()
            .ok_or_else(|| {
                Status::invalid_argument("Vulkan symbols were not loaded by kiln-burn")
            })?;

        if system.loader_version() < options.api_version {
            return Err(Status::new(
                StatusCode::Incompatible,
                format!(
                    "requested Vulkan API {:#x} but the loader supports {:#x}",
                    options.api_version,
                    system.loader_version()
                ),
            ));
        }

        let queue_index = compute_queue_set
            .first_queue()
            .ok_or_else(|| Status::invalid_argument("compute queue set selects no queue"))?;

        let get_device_proc_addr: PfnGetDeviceProcAddr = system
            .instance_proc(handles.instance.as_raw(), c"vkGetDeviceProcAddr")
            .map(|f| unsafe { std::mem::transmute(f) })
            .ok_or_else(|| Status::unavailable("vkGetDeviceProcAddr not available"))?;

        let raw_device = handles.device.as_raw() as usize as *mut c_void;
        let get_device_queue: PfnGetDeviceQueue =
            unsafe { get_device_proc_addr(raw_device, c"vkGetDeviceQueue".as_ptr()) }
                .map(|f| unsafe { std::mem::transmute(f) })
                .ok_or_else(|| Status::unavailable("vkGetDeviceQueue not available"))?;

        let mut queue: *mut c_void = ptr::null_mut();
        // SAFETY: the host guarantees `raw_device` is a live VkDevice created
        // with at least one queue in `queue_family_index`.
        unsafe {
            get_device_queue(
                raw_device,
                compute_queue_set.queue_family_index,
                queue_index,
                &mut queue,
            )
        };
        if queue.is_null() {
            return Err(Status::unavailable(format!(
                "host device has no queue {} in family {}",
                queue_index, compute_queue_set.queue_family_index
            )));
        }

        let debug_utils = options.requested_features.debug_utils
            && system
                .instance_proc(handles.instance.as_raw(), c"vkSetDebugUtilsObjectNameEXT")
                .is_some();
        if options.requested_features.debug_utils && !debug_utils {
            tracing::warn!(
                "Debug utils requested but VK_EXT_debug_utils is not enabled on the host instance"
            );
        }

        Ok(Self {
            identifier: identifier.to_string(),
            handles,
            options: *options,
            compute_queue_set: *compute_queue_set,
            transfer_queue_set: *transfer_queue_set,
            compute_queue: queue as usize as u64,
            debug_utils,
            _syms: Arc::clone(syms),
        })
    }

    pub fn handles(&self) -> VulkanHandles {
        self.handles
    }

    pub fn options(&self) -> &VulkanDeviceOptions {
        &self.options
    }

    pub fn compute_queue_set(&self) -> &QueueSet {
        &self.compute_queue_set
    }

    pub fn transfer_queue_set(&self) -> &QueueSet {
        &self.transfer_queue_set
    }

    /// Raw `VkQueue` used for compute submissions.
    pub fn compute_queue(&self) -> u64 {
        self.compute_queue
    }

    pub fn debug_utils_enabled(&self) -> bool {
        self.debug_utils
    }
}

impl Device for WrappedVulkanDevice {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
