//! Error types for kiln-core.

use crate::hal::Status;
use crate::rendering::DriverResource;
use thiserror::Error;

/// Step of a device capture, used to report where construction stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStage {
    Loader,
    Allocator,
    Device,
    Module,
    DriverRegistration,
    Driver,
    DefaultDevice,
    Syms,
    WrapDevice,
}

impl std::fmt::Display for CaptureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureStage::Loader => write!(f, "creating executable loader"),
            CaptureStage::Allocator => write!(f, "creating device allocator"),
            CaptureStage::Device => write!(f, "creating device"),
            CaptureStage::Module => write!(f, "creating HAL module"),
            CaptureStage::DriverRegistration => write!(f, "registering GPU driver"),
            CaptureStage::Driver => write!(f, "creating GPU driver"),
            CaptureStage::DefaultDevice => write!(f, "creating default GPU device"),
            CaptureStage::Syms => write!(f, "loading Vulkan symbols"),
            CaptureStage::WrapDevice => write!(f, "wrapping host Vulkan device"),
        }
    }
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidParameter,
    CantCreate,
    QueryFailed,
    Failed,
    InvalidConfig,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("Cannot create resource while {stage}: {status}")]
    CantCreate { stage: CaptureStage, status: Status },

    #[error("Unable to retrieve {resource} from the host rendering device")]
    QueryFailed { resource: DriverResource },

    #[error("Failed while {stage}: {status}")]
    Failed { stage: CaptureStage, status: Status },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Config parse error: {0}")]
    ConfigParse(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Error::CantCreate { .. } => ErrorKind::CantCreate,
            Error::QueryFailed { .. } => ErrorKind::QueryFailed,
            Error::Failed { .. } => ErrorKind::Failed,
            Error::InvalidConfig(_) | Error::ConfigParse(_) => ErrorKind::InvalidConfig,
        }
    }

    /// Runtime status behind the error, if the runtime reported one.
    pub fn status(&self) -> Option<&Status> {
        match self {
            Error::CantCreate { status, .. } | Error::Failed { status, .. } => Some(status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
