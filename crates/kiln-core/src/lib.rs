//! # kiln-core
//!
//! Binds a game engine's renderer to an ML compute runtime's HAL.
//!
//! - [`ComputeDevice`] - shared handle to a compute device and its HAL module
//! - [`hal`] - the runtime seam: resource traits, [`HalRuntime`], driver registry
//! - [`rendering`] - the host seam: [`RenderingServer`] / [`RenderingDevice`]
//! - [`DeviceConfig`] - identifiers, Vulkan version and queue selection
//!
//! The crate implements no runtime itself; `kiln-burn` provides one.

pub mod config;
mod device;
pub mod error;
pub mod hal;
pub mod rendering;

pub use config::DeviceConfig;
pub use device::ComputeDevice;
pub use error::{CaptureStage, Error, ErrorKind, Result};
pub use hal::{
    Allocator, Device, Driver, DriverFactory, DriverRegistry, ExecutableLoader, ExecutionMode,
    HalResult, HalRuntime, QueueSet, Status, StatusCode, VmInstance, VmModule, VulkanSyms,
};
pub use rendering::{
    DriverResource, Headless, HostVulkanContext, RenderingApi, RenderingDevice, RenderingServer,
    Rid,
};
