//! Port abstraction: paths, connection settings and the transport capability.
//!
//! The resolver never talks to the OS directly. Everything device-specific
//! goes through [`SerialTransport`], which has a native implementation built
//! on the `serialport` crate and can be replaced by a test double.
//!
//! ```text
//! +-------------------+
//! |   PortResolver    |   discovery, probing, default selection
//! +---------+---------+
//!           |
//!           v
//! +---------+---------+
//! |  SerialTransport  |   enumerate / open / close
//! +---------+---------+
//!           |
//!           v
//! +---------+---------+
//! |  NativeTransport  |   (serialport)
//! +-------------------+
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use robust_serial::port::{ConnectionConfig, ReadMode};
//!
//! let config = ConnectionConfig::new(9600)
//!     .unwrap()
//!     .with_read_timeout(None)
//!     .with_write_timeout(Duration::from_millis(50));
//!
//! assert_eq!(config.read_mode(), ReadMode::Blocking);
//! ```

#[cfg(feature = "native")]
pub mod native;

use std::{fmt, str::FromStr, time::Duration};

use crate::{
    error::{DeviceError, Error, Result},
    platform::PlatformFamily,
};

/// Default baud rate for new connections.
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Platform-specific address of a serial device (e.g. `/dev/ttyUSB0`, `COM3`).
///
/// The only invariant is that the path is non-empty. Whether it names a real
/// device is up to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct PortPath(pub(crate) String);

impl PortPath {
    /// Create a port path, rejecting empty strings.
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if path.is_empty() {
            return Err(Error::InvalidPortPath("path is empty".to_string()));
        }
        Ok(Self(path))
    }

    /// The path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PortPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PortPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for PortPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for PortPath {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<PortPath> for String {
    fn from(path: PortPath) -> Self {
        path.0
    }
}

/// How a read behaves when no data is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Wait until at least one byte arrives.
    Blocking,
    /// Return immediately with whatever is buffered.
    NonBlocking,
    /// Wait up to the given duration.
    Timeout(Duration),
}

/// Number of data bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataBits {
    /// 5 data bits.
    Five,
    /// 6 data bits.
    Six,
    /// 7 data bits.
    Seven,
    /// 8 data bits.
    #[default]
    Eight,
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parity {
    /// No parity.
    #[default]
    None,
    /// Odd parity.
    Odd,
    /// Even parity.
    Even,
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopBits {
    /// 1 stop bit.
    #[default]
    One,
    /// 2 stop bits.
    Two,
}

/// Flow control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowControl {
    /// No flow control.
    #[default]
    None,
    /// Hardware flow control (RTS/CTS).
    Hardware,
    /// Software flow control (XON/XOFF).
    Software,
}

/// Settings for a single connection attempt.
///
/// Built once and never mutated; the `with_*` methods consume and return a
/// new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    baud_rate: u32,
    read_timeout: Option<Duration>,
    write_timeout: Duration,
    data_bits: DataBits,
    parity: Parity,
    stop_bits: StopBits,
    flow_control: FlowControl,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: Some(Duration::ZERO),
            write_timeout: Duration::ZERO,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
        }
    }
}

impl ConnectionConfig {
    /// Create a configuration with the given baud rate and default timeouts.
    pub fn new(baud_rate: u32) -> Result<Self> {
        if baud_rate == 0 {
            return Err(Error::Config("baud rate must be positive".to_string()));
        }
        Ok(Self {
            baud_rate,
            ..Default::default()
        })
    }

    /// Set the read timeout. `None` selects a blocking read, zero a
    /// non-blocking one.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the write timeout. Zero returns immediately.
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the number of data bits.
    #[must_use]
    pub fn with_data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    /// Set the parity mode.
    #[must_use]
    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    /// Set the number of stop bits.
    #[must_use]
    pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    /// Set the flow control mode.
    #[must_use]
    pub fn with_flow_control(mut self, flow_control: FlowControl) -> Self {
        self.flow_control = flow_control;
        self
    }

    /// Baud rate.
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Read timeout as configured (`None` = blocking).
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// Read behaviour derived from the read timeout.
    pub fn read_mode(&self) -> ReadMode {
        match self.read_timeout {
            None => ReadMode::Blocking,
            Some(d) if d.is_zero() => ReadMode::NonBlocking,
            Some(d) => ReadMode::Timeout(d),
        }
    }

    /// Write timeout.
    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }

    /// Data bits.
    pub fn data_bits(&self) -> DataBits {
        self.data_bits
    }

    /// Parity.
    pub fn parity(&self) -> Parity {
        self.parity
    }

    /// Stop bits.
    pub fn stop_bits(&self) -> StopBits {
        self.stop_bits
    }

    /// Flow control.
    pub fn flow_control(&self) -> FlowControl {
        self.flow_control
    }
}

/// Device access capability consumed by the resolver.
///
/// Implementations own the OS-specific details: how candidate paths are
/// listed and what an open connection looks like.
pub trait SerialTransport {
    /// Open connection owned by the caller.
    type Handle;

    /// List candidate device paths for a platform family without opening them.
    ///
    /// Order is enumeration order. Failure to enumerate yields an empty list.
    fn enumerate_platform_candidates(&self, family: PlatformFamily) -> Vec<PortPath>;

    /// Open a device with the given settings.
    fn open(
        &self,
        path: &PortPath,
        config: &ConnectionConfig,
    ) -> std::result::Result<Self::Handle, DeviceError>;

    /// Close a device opened by [`SerialTransport::open`].
    fn close(&self, handle: Self::Handle) -> std::result::Result<(), DeviceError>;

    /// Check that a device can be opened, leaving nothing open afterwards.
    fn probe_open_close(&self, path: &PortPath) -> std::result::Result<(), DeviceError> {
        let handle = self.open(path, &ConnectionConfig::default())?;
        self.close(handle)
    }
}
