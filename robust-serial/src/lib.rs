//! # robust-serial
//!
//! A library for finding and opening serial ports, typically to talk to an
//! Arduino-class microcontroller.
//!
//! This crate provides:
//!
//! - Platform-aware discovery of candidate devices (`COM1..COM256`,
//!   `/dev/tty[A-Za-z]*`, `/dev/tty.*`)
//! - Probing that keeps only ports that can actually be opened
//! - Opening a configured connection with explicit blocking / non-blocking
//!   read semantics
//! - A thread-safe work queue that can discard everything pending
//!
//! ## Supported Platforms
//!
//! - Windows, Linux (and Cygwin), macOS. Other hosts fail discovery with
//!   [`Error::UnsupportedPlatform`].
//!
//! ## Features
//!
//! - `native` (default): Native serial port support via `serialport`
//! - `serde`: Serialization support for [`PortPath`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::io::Write;
//! use robust_serial::{ConnectionConfig, PortResolver};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let resolver = PortResolver::native();
//!
//!     // Blocking reads, non-blocking writes.
//!     let config = ConnectionConfig::new(115200)?.with_read_timeout(None);
//!     let mut port = resolver.open(None, &config)?;
//!     port.write_all(b"hello\n")?;
//!
//!     resolver.close(port)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
#[cfg(feature = "native")]
pub mod host;
pub mod platform;
pub mod port;
pub mod queue;
pub mod resolver;

// Re-exports for convenience
#[cfg(feature = "native")]
pub use {
    host::{list_ports, open_port},
    port::native::{NativePort, NativeTransport},
};
pub use {
    error::{DeviceError, DeviceErrorKind, Error, Result},
    platform::{Platform, PlatformFamily},
    port::{
        ConnectionConfig, DEFAULT_BAUD_RATE, DataBits, FlowControl, Parity, PortPath, ReadMode,
        SerialTransport, StopBits,
    },
    queue::ClearableQueue,
    resolver::PortResolver,
};
