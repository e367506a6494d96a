//! KilnEngine: a Burn runtime plus the VM instance devices are bound to.

use crate::core::{ComputeDevice, DeviceConfig, HalRuntime, RenderingServer, VmInstance};
use crate::{KilnEngineBuilder, Result};
use kiln_burn::BurnRuntime;
use std::sync::Arc;

/// Owns the runtime and a VM instance so callers don't have to thread them
/// through every capture.
///
/// Devices returned by the capture methods hold their own references and may
/// outlive the engine.
///
/// # Example
///
/// ```ignore
/// use kiln::prelude::*;
///
/// let engine = KilnEngine::builder().build()?;
///
/// // Wraps the host's Vulkan device when it has one
/// let device = engine.capture_gpu(&rendering_server)?;
/// ```
#[derive(Debug)]
pub struct KilnEngine {
    runtime: BurnRuntime,
    instance: Arc<dyn VmInstance>,
}

impl KilnEngine {
    pub fn builder() -> KilnEngineBuilder {
        KilnEngineBuilder::default()
    }

    pub(crate) fn from_runtime(runtime: BurnRuntime) -> Self {
        let instance = runtime.create_instance();
        Self { runtime, instance }
    }

    pub fn capture_cpu(&self) -> Result<ComputeDevice> {
        Ok(ComputeDevice::create_cpu(&self.runtime, Some(&self.instance))?)
    }

    pub fn capture_gpu(&self, host: &dyn RenderingServer) -> Result<ComputeDevice> {
        Ok(ComputeDevice::create_gpu(
            &self.runtime,
            host,
            Some(&self.instance),
        )?)
    }

    pub fn runtime(&self) -> &BurnRuntime {
        &self.runtime
    }

    pub fn instance(&self) -> &Arc<dyn VmInstance> {
        &self.instance
    }

    pub fn config(&self) -> &DeviceConfig {
        self.runtime.config()
    }
}
