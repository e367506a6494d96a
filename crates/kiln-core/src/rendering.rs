//! Host rendering context.
//!
//! The host engine owns the renderer. When it already runs on Vulkan, the
//! GPU capture path borrows its instance, physical device, logical device and
//! queue family instead of creating new ones.

use crate::hal::{VkDeviceHandle, VkInstanceHandle, VkPhysicalDeviceHandle, VulkanHandles};
use crate::{Error, Result};

/// Kind of driver object a [`RenderingDevice`] can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverResource {
    VulkanInstance,
    VulkanPhysicalDevice,
    VulkanDevice,
    VulkanQueueFamilyIndex,
}

impl std::fmt::Display for DriverResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverResource::VulkanInstance => write!(f, "Vulkan instance"),
            DriverResource::VulkanPhysicalDevice => write!(f, "Vulkan physical device"),
            DriverResource::VulkanDevice => write!(f, "Vulkan device"),
            DriverResource::VulkanQueueFamilyIndex => write!(f, "Vulkan queue family index"),
        }
    }
}

/// Opaque identifier of a host resource. The null id addresses the device
/// itself rather than one of its resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rid(pub u64);

impl Rid {
    pub const NULL: Rid = Rid(0);

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

/// Graphics API a host rendering device runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderingApi {
    Vulkan,
    Direct3D12,
    Metal,
    OpenGl,
}

/// A host rendering device answering resource-kind queries.
pub trait RenderingDevice {
    /// Raw driver value for `resource`; `0` when unavailable.
    fn driver_resource(&self, resource: DriverResource, rid: Rid, index: u64) -> u64;

    fn api(&self) -> RenderingApi {
        RenderingApi::Vulkan
    }
}

/// Entry point into the host's renderer.
pub trait RenderingServer {
    /// The active rendering device, if the host has one.
    fn rendering_device(&self) -> Option<&dyn RenderingDevice>;
}

/// A host without any rendering device (dedicated servers, tools, tests).
#[derive(Debug, Clone, Copy, Default)]
pub struct Headless;

impl RenderingServer for Headless {
    fn rendering_device(&self) -> Option<&dyn RenderingDevice> {
        None
    }
}

/// Everything the wrap path borrows from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostVulkanContext {
    pub handles: VulkanHandles,
    pub queue_family_index: u32,
}

impl HostVulkanContext {
    /// Query the host device. Fails with [`Error::QueryFailed`] on the first
    /// null handle, before anything has been allocated.
    pub fn query(device: &dyn RenderingDevice) -> Result<Self> {
        let instance = VkInstanceHandle::from_raw(query(device, DriverResource::VulkanInstance))
            .ok_or_else(|| query_failed(DriverResource::VulkanInstance))?;
        let physical_device =
            VkPhysicalDeviceHandle::from_raw(query(device, DriverResource::VulkanPhysicalDevice))
                .ok_or_else(|| query_failed(DriverResource::VulkanPhysicalDevice))?;
        let vk_device = VkDeviceHandle::from_raw(query(device, DriverResource::VulkanDevice))
            .ok_or_else(|| query_failed(DriverResource::VulkanDevice))?;
        // Family 0 is a valid index, so only out-of-range values are rejected.
        let queue_family_index =
            u32::try_from(query(device, DriverResource::VulkanQueueFamilyIndex))
                .map_err(|_| query_failed(DriverResource::VulkanQueueFamilyIndex))?;

        Ok(Self {
            handles: VulkanHandles {
                instance,
                physical_device,
                device: vk_device,
            },
            queue_family_index,
        })
    }
}

fn query(device: &dyn RenderingDevice, resource: DriverResource) -> u64 {
    device.driver_resource(resource, Rid::NULL, 0)
}

fn query_failed(resource: DriverResource) -> Error {
    tracing::error!("Unable to retrieve {}.", resource);
    Error::QueryFailed { resource }
}
