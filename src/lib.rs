//! # Kiln - ML compute on a game engine's GPU
//!
//! Binds a host renderer to an ML runtime's HAL through a [`ComputeDevice`]
//! handle that owns a HAL device and the module bound to it.
//!
//! ## Architecture
//!
//! Kiln is an umbrella crate that coordinates:
//! - **kiln-core** - HAL traits, driver registry, host rendering seam, `ComputeDevice`
//! - **kiln-burn** - Burn runtime (NdArray CPU path, wgpu and host-wrapped Vulkan)
//!
//! ## Quick Start
//!
//! ```ignore
//! use kiln::prelude::*;
//!
//! let engine = KilnEngine::builder().build()?;
//!
//! // Software device, no GPU needed
//! let cpu = engine.capture_cpu()?;
//!
//! // Shares the host's Vulkan device, or creates one when running headless
//! let gpu = engine.capture_gpu(&Headless)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Burn runtime
//! - `burn` - `KilnEngine` and the `kiln-burn` runtime; disable to bring your
//!   own [`HalRuntime`]

/// Re-export of kiln-core for direct access
pub use kiln_core as core;

pub use kiln_core::{
    // Device handle
    ComputeDevice,
    // Config
    DeviceConfig,
    // Driver registry
    DriverFactory,
    DriverRegistry,
    ErrorKind,
    ExecutionMode,
    // Runtime seam
    HalRuntime,
    // Host rendering
    Headless,
    RenderingDevice,
    RenderingServer,
    Status,
    StatusCode,
};

// Burn runtime
#[cfg(feature = "burn")]
pub use kiln_burn as burn;

#[cfg(feature = "burn")]
pub use kiln_burn::BurnRuntime;

mod error;

pub use error::{Error, Result};

#[cfg(feature = "burn")]
mod builder;
#[cfg(feature = "burn")]
mod engine;

#[cfg(feature = "burn")]
pub use builder::KilnEngineBuilder;
#[cfg(feature = "burn")]
pub use engine::KilnEngine;

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{ComputeDevice, DeviceConfig, ExecutionMode, HalRuntime};

    // Host rendering
    pub use crate::{Headless, RenderingDevice, RenderingServer};

    // Engine
    #[cfg(feature = "burn")]
    pub use crate::{BurnRuntime, KilnEngine, KilnEngineBuilder};
}
