//! Driver registry.
//!
//! Drivers are created by name from registered [`DriverFactory`] values. The
//! runtime keeps one registry per process ([`DriverRegistry::global`]);
//! registering a factory there is a process-wide side effect that outlives
//! any single [`ComputeDevice`](crate::ComputeDevice).

use super::status::{HalResult, Status, StatusCode};
use super::Driver;
use parking_lot::RwLock;
use std::sync::{Arc, OnceLock};

/// Maximum number of factories one registry accepts.
pub const MAX_DRIVER_FACTORIES: usize = 8;

/// Creates drivers for one backend.
pub trait DriverFactory: Send + Sync {
    /// Identifier drivers are requested by, e.g. `"vulkan"`.
    fn driver_name(&self) -> &str;

    fn create_driver(&self) -> HalResult<Arc<dyn Driver>>;
}

#[derive(Default)]
pub struct DriverRegistry {
    factories: RwLock<Vec<Arc<dyn DriverFactory>>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static DriverRegistry {
        static GLOBAL: OnceLock<DriverRegistry> = OnceLock::new();
        GLOBAL.get_or_init(DriverRegistry::new)
    }

    /// Register `factory`. Registering a name that is already present is a
    /// no-op, so callers may register on every capture.
    pub fn register(&self, factory: Arc<dyn DriverFactory>) -> HalResult<()> {
        let mut factories = self.factories.write();
        if factories
            .iter()
            .any(|f| f.driver_name() == factory.driver_name())
        {
            return Ok(());
        }
        if factories.len() >= MAX_DRIVER_FACTORIES {
            return Err(Status::new(
                StatusCode::ResourceExhausted,
                format!(
                    "driver registry full ({} factories), cannot add '{}'",
                    MAX_DRIVER_FACTORIES,
                    factory.driver_name()
                ),
            ));
        }
        tracing::debug!("Registered HAL driver factory '{}'", factory.driver_name());
        factories.push(factory);
        Ok(())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.factories.read().iter().any(|f| f.driver_name() == name)
    }

    pub fn driver_names(&self) -> Vec<String> {
        self.factories
            .read()
            .iter()
            .map(|f| f.driver_name().to_string())
            .collect()
    }

    /// Create a driver from the factory registered under `name`.
    pub fn try_create(&self, name: &str) -> HalResult<Arc<dyn Driver>> {
        // Clone the factory out so driver creation runs without the lock held.
        let factory = self
            .factories
            .read()
            .iter()
            .find(|f| f.driver_name() == name)
            .cloned();
        match factory {
            Some(factory) => factory.create_driver(),
            None => Err(Status::not_found(format!(
                "no driver factory registered for '{}'",
                name
            ))),
        }
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.driver_names())
            .finish()
    }
}
