//! Builder for configuring and constructing a `KilnEngine`.

use crate::core::DeviceConfig;
use crate::{Error, KilnEngine, Result};
use kiln_burn::BurnRuntime;
use std::path::PathBuf;

/// A config file, when set, replaces the config passed to [`config`](Self::config).
///
/// # Example
///
/// ```ignore
/// use kiln::prelude::*;
///
/// let engine = KilnEngine::builder()
///     .config_file("kiln.toml")
///     .build()?;
///
/// let device = engine.capture_cpu()?;
/// ```
#[derive(Debug, Default)]
pub struct KilnEngineBuilder {
    config: DeviceConfig,
    config_file: Option<PathBuf>,
}

impl KilnEngineBuilder {
    pub fn config(mut self, config: DeviceConfig) -> Self {
        self.config = config;
        self
    }

    /// Load settings from a TOML file at build time.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    pub fn build(self) -> Result<KilnEngine> {
        let config = match self.config_file {
            Some(path) => {
                let source = std::fs::read_to_string(&path).map_err(|source| {
                    Error::ConfigFile {
                        path: path.clone(),
                        source,
                    }
                })?;
                tracing::debug!("Loaded device config from {}", path.display());
                DeviceConfig::from_toml_str(&source)?
            }
            None => self.config,
        };

        let runtime = BurnRuntime::new(config)?;
        Ok(KilnEngine::from_runtime(runtime))
    }
}
