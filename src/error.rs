use std::io;
use thiserror::Error;

/// Errors that can occur while locating or reading a mass-storage device.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Unsupported platform: {0} (only macOS and Linux are supported)")]
    UnsupportedPlatform(&'static str),

    #[error("No device found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0} - try running with sudo")]
    PermissionDenied(String),

    #[error("Failed to run {command}: {source}")]
    Enumeration {
        command: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Could not parse {command} output: {message}")]
    Parse {
        command: &'static str,
        message: String,
    },

    #[error("Boot sector truncated: {0} bytes")]
    TruncatedBootSector(usize),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
