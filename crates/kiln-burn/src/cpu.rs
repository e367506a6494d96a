//! Software execution: loader, heap allocator and an inline device on NdArray.

use burn::backend::ndarray::NdArrayDevice;
use burn::backend::NdArray;
use burn::prelude::*;
use kiln_core::hal::{
    Allocator, Device, ExecutableLoader, HalResult, Status, SyncDeviceParams, VmInstance,
    VmModule,
};
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub const VMVX_FORMAT: &str = "vmvx";

/// Loader for programs compiled to the portable VMVX format.
#[derive(Debug)]
pub struct VmvxLoader {
    _instance: Arc<dyn VmInstance>,
    user_modules: Vec<Arc<dyn VmModule>>,
}

impl VmvxLoader {
    pub fn new(instance: &Arc<dyn VmInstance>, user_modules: &[Arc<dyn VmModule>]) -> Self {
        Self {
            _instance: Arc::clone(instance),
            user_modules: user_modules.to_vec(),
        }
    }

    pub fn user_module_count(&self) -> usize {
        self.user_modules.len()
    }
}

impl ExecutableLoader for VmvxLoader {
    fn format(&self) -> &str {
        VMVX_FORMAT
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Host-heap allocator. Device memory on the software path is plain host
/// memory, so this only keeps statistics.
#[derive(Debug)]
pub struct HeapAllocator {
    identifier: String,
    bytes_allocated: AtomicU64,
}

impl HeapAllocator {
    pub fn new(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            bytes_allocated: AtomicU64::new(0),
        }
    }

    pub fn record_allocation(&self, bytes: u64) {
        self.bytes_allocated.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Total bytes allocated through this allocator since creation.
    pub fn bytes_allocated(&self) -> u64 {
        self.bytes_allocated.load(Ordering::Relaxed)
    }
}

impl Allocator for HeapAllocator {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Device that executes work inline on the calling thread.
#[derive(Debug)]
pub struct SyncDevice {
    identifier: String,
    loaders: Vec<Arc<dyn ExecutableLoader>>,
    allocator: Arc<dyn Allocator>,
    device: NdArrayDevice,
}

impl SyncDevice {
    pub fn new(
        params: &SyncDeviceParams,
        loaders: &[Arc<dyn ExecutableLoader>],
        allocator: &Arc<dyn Allocator>,
    ) -> HalResult<Self> {
        if loaders.is_empty() {
            return Err(Status::invalid_argument(
                "a synchronous device needs at least one executable loader",
            ));
        }
        Ok(Self {
            identifier: params.identifier.clone(),
            loaders: loaders.to_vec(),
            allocator: Arc::clone(allocator),
            device: NdArrayDevice::default(),
        })
    }

    pub fn burn_device(&self) -> &NdArrayDevice {
        &self.device
    }

    pub fn allocator(&self) -> &Arc<dyn Allocator> {
        &self.allocator
    }

    /// Whether any loader accepts programs in `format`.
    pub fn supports_format(&self, format: &str) -> bool {
        self.loaders.iter().any(|l| l.format() == format)
    }

    /// Copy `data` onto the device as a `[batch, features]` tensor.
    pub fn upload(&self, data: &[f32], shape: [usize; 2]) -> Tensor<NdArray, 2> {
        if let Some(heap) = self.allocator.as_any().downcast_ref::<HeapAllocator>() {
            heap.record_allocation(std::mem::size_of_val(data) as u64);
        }
        Tensor::<NdArray, 1>::from_floats(data, &self.device).reshape(shape)
    }
}

impl Device for SyncDevice {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
