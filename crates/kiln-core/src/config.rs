//! Device capture configuration.

use crate::hal::{api_version_major, VulkanDeviceOptions, VulkanFeatures, API_VERSION_1_0};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Settings used when capturing a [`ComputeDevice`](crate::ComputeDevice).
///
/// Unknown keys are rejected. Can be loaded from TOML:
///
/// ```toml
/// gpu_identifier = "vulkan"
/// vulkan_api_version = 4198400  # 1.1
/// debug_utils = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    /// Identifier of the software device and its allocator.
    pub cpu_identifier: String,
    /// Identifier of the GPU driver and wrapped devices.
    pub gpu_identifier: String,
    /// Packed Vulkan API version requested when wrapping a host device.
    pub vulkan_api_version: u32,
    pub debug_utils: bool,
    /// Queue bitmask within the host's queue family used for compute.
    pub compute_queue_indices: u64,
    /// Queue bitmask for dedicated transfer work; zero requests none.
    pub transfer_queue_indices: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            cpu_identifier: "vmvx".into(),
            gpu_identifier: "vulkan".into(),
            vulkan_api_version: API_VERSION_1_0,
            debug_utils: true,
            compute_queue_indices: 1 << 0,
            transfer_queue_indices: 0,
        }
    }
}

impl DeviceConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cpu_identifier.is_empty() || self.gpu_identifier.is_empty() {
            return Err(Error::InvalidConfig(
                "device identifiers must not be empty".into(),
            ));
        }
        if self.compute_queue_indices == 0 {
            return Err(Error::InvalidConfig(
                "compute_queue_indices must select at least one queue".into(),
            ));
        }
        if api_version_major(self.vulkan_api_version) == 0 {
            return Err(Error::InvalidConfig(format!(
                "vulkan_api_version {:#x} is below Vulkan 1.0",
                self.vulkan_api_version
            )));
        }
        Ok(())
    }

    pub fn vulkan_device_options(&self) -> VulkanDeviceOptions {
        VulkanDeviceOptions {
            api_version: self.vulkan_api_version,
            requested_features: VulkanFeatures {
                debug_utils: self.debug_utils,
            },
        }
    }
}
