//! Centralized error type for the kiln umbrella crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] kiln_core::Error),

    #[error("Config file {path}: {source}")]
    ConfigFile {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
