//! Vulkan-specific HAL parameters: queue sets, device options and raw handles.

use core::num::NonZeroU64;
use serde::{Deserialize, Serialize};

/// Pack a Vulkan API version the way `VK_MAKE_API_VERSION(0, ..)` does.
pub const fn make_api_version(major: u32, minor: u32, patch: u32) -> u32 {
    (major << 22) | (minor << 12) | patch
}

pub const fn api_version_major(version: u32) -> u32 {
    (version >> 22) & 0x7f
}

pub const fn api_version_minor(version: u32) -> u32 {
    (version >> 12) & 0x3ff
}

pub const API_VERSION_1_0: u32 = make_api_version(1, 0, 0);

/// Hardware queues assigned to one workload class.
///
/// `queue_indices` is a bitmask over the queues of `queue_family_index`;
/// bit `n` selects queue `n`. An empty mask requests no queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueSet {
    pub queue_family_index: u32,
    pub queue_indices: u64,
}

impl QueueSet {
    pub fn new(queue_family_index: u32, queue_indices: u64) -> Self {
        Self {
            queue_family_index,
            queue_indices,
        }
    }

    /// No queues requested.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.queue_indices == 0
    }

    /// Index of the first selected queue in the family.
    pub fn first_queue(&self) -> Option<u32> {
        if self.is_empty() {
            None
        } else {
            Some(self.queue_indices.trailing_zeros())
        }
    }

    pub fn queue_count(&self) -> u32 {
        self.queue_indices.count_ones()
    }
}

/// Optional device features requested when wrapping a Vulkan device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VulkanFeatures {
    /// Enable `VK_EXT_debug_utils` labels and object names.
    pub debug_utils: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VulkanDeviceOptions {
    pub api_version: u32,
    pub requested_features: VulkanFeatures,
}

impl Default for VulkanDeviceOptions {
    fn default() -> Self {
        Self {
            api_version: API_VERSION_1_0,
            requested_features: VulkanFeatures::default(),
        }
    }
}

macro_rules! raw_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(NonZeroU64);

        impl $name {
            /// `None` for `VK_NULL_HANDLE`.
            pub fn from_raw(raw: u64) -> Option<Self> {
                NonZeroU64::new(raw).map(Self)
            }

            pub fn as_raw(self) -> u64 {
                self.0.get()
            }
        }
    };
}

raw_handle!(
    /// Host-owned `VkInstance`.
    VkInstanceHandle
);
raw_handle!(
    /// Host-owned `VkPhysicalDevice`.
    VkPhysicalDeviceHandle
);
raw_handle!(
    /// Host-owned `VkDevice`.
    VkDeviceHandle
);

/// The instance / physical device / logical device triple owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VulkanHandles {
    pub instance: VkInstanceHandle,
    pub physical_device: VkPhysicalDeviceHandle,
    pub device: VkDeviceHandle,
}
