//! VM execution context.

use kiln_core::hal::VmInstance;
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Execution context modules are created in.
#[derive(Debug)]
pub struct BurnInstance {
    id: u64,
}

impl BurnInstance {
    pub fn new() -> Self {
        Self {
            id: NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Default for BurnInstance {
    fn default() -> Self {
        Self::new()
    }
}

impl VmInstance for BurnInstance {
    fn as_any(&self) -> &dyn Any {
        self
    }
}
