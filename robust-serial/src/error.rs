//! Error types for robust-serial.

use std::io;

use thiserror::Error;

use crate::port::PortPath;

/// Result type for robust-serial operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for robust-serial operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Host OS is not one of the supported platform families.
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// Discovery found no usable port and no port was given.
    #[error("No serial port found")]
    NoPortFound,

    /// The transport failed to open a device.
    #[error("Serial port {path}: {source}")]
    Device {
        /// Path the operation was attempted on.
        path: PortPath,
        /// Underlying transport error.
        #[source]
        source: DeviceError,
    },

    /// The transport failed to release a handle.
    #[error("Failed to close serial port: {0}")]
    Close(#[source] DeviceError),

    /// A port path was rejected at construction.
    #[error("Invalid port path: {0}")]
    InvalidPortPath(String),

    /// Invalid connection configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// `task_done` was called more times than items were queued.
    #[error("task_done() called too many times")]
    TaskDoneOverflow,
}

impl Error {
    /// Whether this error comes from host or caller setup rather than the device.
    ///
    /// Setup errors are not fixed by retrying the same call.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedPlatform(_)
                | Self::NoPortFound
                | Self::InvalidPortPath(_)
                | Self::Config(_)
        )
    }
}

/// Broad classification of transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceErrorKind {
    /// Device does not exist or was unplugged.
    NoDevice,
    /// Caller lacks permission to open the device.
    PermissionDenied,
    /// Device is held by another process.
    Busy,
    /// A parameter was rejected by the driver.
    InvalidInput,
    /// Any other OS-level I/O failure.
    Io,
    /// Unclassified failure.
    Other,
}

/// Transport-level failure, carrying the OS error text verbatim.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DeviceError {
    kind: DeviceErrorKind,
    message: String,
}

impl DeviceError {
    /// Create a new device error.
    pub fn new(kind: DeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Error classification.
    pub fn kind(&self) -> DeviceErrorKind {
        self.kind
    }

    /// OS error text.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<io::Error> for DeviceError {
    fn from(err: io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::NotFound => DeviceErrorKind::NoDevice,
            io::ErrorKind::PermissionDenied => DeviceErrorKind::PermissionDenied,
            io::ErrorKind::ResourceBusy | io::ErrorKind::AddrInUse => DeviceErrorKind::Busy,
            io::ErrorKind::InvalidInput => DeviceErrorKind::InvalidInput,
            _ => DeviceErrorKind::Io,
        };
        Self::new(kind, err.to_string())
    }
}

#[cfg(feature = "native")]
impl From<serialport::Error> for DeviceError {
    fn from(err: serialport::Error) -> Self {
        let kind = match err.kind() {
            serialport::ErrorKind::NoDevice => DeviceErrorKind::NoDevice,
            serialport::ErrorKind::InvalidInput => DeviceErrorKind::InvalidInput,
            serialport::ErrorKind::Io(io_kind) => match io_kind {
                io::ErrorKind::NotFound => DeviceErrorKind::NoDevice,
                io::ErrorKind::PermissionDenied => DeviceErrorKind::PermissionDenied,
                io::ErrorKind::ResourceBusy | io::ErrorKind::AddrInUse => DeviceErrorKind::Busy,
                _ => DeviceErrorKind::Io,
            },
            serialport::ErrorKind::Unknown => DeviceErrorKind::Other,
        };
        Self::new(kind, err.description)
    }
}
