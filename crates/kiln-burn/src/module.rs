//! HAL execution module.

use kiln_core::hal::{Device, ExecutionMode, VmInstance, VmModule};
use std::any::Any;
use std::sync::Arc;

pub const HAL_MODULE_NAME: &str = "hal";

/// Exposes one device's operations to programs running in an instance.
#[derive(Debug)]
pub struct HalModule {
    _instance: Arc<dyn VmInstance>,
    device: Arc<dyn Device>,
    mode: ExecutionMode,
}

impl HalModule {
    pub fn new(
        instance: &Arc<dyn VmInstance>,
        device: &Arc<dyn Device>,
        mode: ExecutionMode,
    ) -> Self {
        Self {
            _instance: Arc::clone(instance),
            device: Arc::clone(device),
            mode,
        }
    }

    pub fn device(&self) -> &Arc<dyn Device> {
        &self.device
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        self.mode
    }
}

impl VmModule for HalModule {
    fn name(&self) -> &str {
        HAL_MODULE_NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
