//! Native serial transport using the `serialport` crate.
//!
//! `serialport` keeps a single timeout per port, shared by reads and writes.
//! [`NativePort`] stores both configured timeouts and switches the OS value
//! before each operation when they differ.

use {
    crate::{
        error::DeviceError,
        platform::PlatformFamily,
        port::{
            ConnectionConfig, DataBits, FlowControl, Parity, PortPath, ReadMode, SerialTransport,
            StopBits,
        },
    },
    log::{debug, trace},
    serialport::ClearBuffer,
    std::{
        io::{self, Read, Write},
        path::{Path, PathBuf},
        time::Duration,
    },
};

/// Device directory scanned on Unix-like hosts.
pub const DEFAULT_DEVICE_DIR: &str = "/dev";

/// OS timeout used for blocking reads.
///
/// `serialport` has no "wait forever" setting. This value stays inside the
/// millisecond range every backend accepts; reads that hit it are retried.
pub const BLOCKING_READ_TIMEOUT: Duration = Duration::from_millis(4_294_967_294);

/// OS-level timeout for a read mode.
pub fn os_read_timeout(mode: ReadMode) -> Duration {
    match mode {
        ReadMode::Blocking => BLOCKING_READ_TIMEOUT,
        ReadMode::NonBlocking => Duration::ZERO,
        ReadMode::Timeout(d) => d,
    }
}

/// Smallest OS write timeout. Windows reads a zero write timeout as
/// "wait until done", so a zero write timeout is sent as this instead.
pub const NON_BLOCKING_WRITE_TIMEOUT: Duration = Duration::from_millis(1);

/// OS-level timeout for a configured write timeout.
pub fn os_write_timeout(timeout: Duration) -> Duration {
    if timeout.is_zero() {
        NON_BLOCKING_WRITE_TIMEOUT
    } else {
        timeout
    }
}

/// Native serial port connection.
pub struct NativePort {
    port: Option<Box<dyn serialport::SerialPort>>,
    name: PortPath,
    baud_rate: u32,
    read_mode: ReadMode,
    write_timeout: Duration,
    active_timeout: Duration,
}

impl NativePort {
    /// Open a serial port with the given configuration.
    pub fn open(path: &PortPath, config: &ConnectionConfig) -> Result<Self, DeviceError> {
        let read_timeout = os_read_timeout(config.read_mode());
        let port = serialport::new(path.as_str(), config.baud_rate())
            .timeout(read_timeout)
            .data_bits(config.data_bits().into())
            .parity(config.parity().into())
            .stop_bits(config.stop_bits().into())
            .flow_control(config.flow_control().into())
            .open()?;

        Ok(Self {
            port: Some(port),
            name: path.clone(),
            baud_rate: config.baud_rate(),
            read_mode: config.read_mode(),
            write_timeout: config.write_timeout(),
            active_timeout: read_timeout,
        })
    }

    /// Port path this connection was opened on.
    pub fn name(&self) -> &PortPath {
        &self.name
    }

    /// Configured baud rate.
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Configured read behaviour.
    pub fn read_mode(&self) -> ReadMode {
        self.read_mode
    }

    /// Configured write timeout.
    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }

    /// Whether the port is still open.
    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    /// Discard pending input and output.
    pub fn clear_buffers(&mut self) -> Result<(), DeviceError> {
        self.port_mut()?.clear(ClearBuffer::All)?;
        Ok(())
    }

    /// Set DTR (Data Terminal Ready) pin state.
    pub fn set_dtr(&mut self, level: bool) -> Result<(), DeviceError> {
        trace!("Setting DTR to {level}");
        self.port_mut()?.write_data_terminal_ready(level)?;
        Ok(())
    }

    /// Set RTS (Request To Send) pin state.
    pub fn set_rts(&mut self, level: bool) -> Result<(), DeviceError> {
        trace!("Setting RTS to {level}");
        self.port_mut()?.write_request_to_send(level)?;
        Ok(())
    }

    /// Close the port. Further I/O fails with `NotConnected`.
    pub fn close(&mut self) -> Result<(), DeviceError> {
        if self.port.take().is_some() {
            debug!("Closed {}", self.name);
        }
        Ok(())
    }

    fn port_mut(&mut self) -> io::Result<&mut Box<dyn serialport::SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "port closed"))
    }

    fn use_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        if self.active_timeout != timeout {
            self.port_mut()?
                .set_timeout(timeout)
                .map_err(io::Error::from)?;
            self.active_timeout = timeout;
        }
        Ok(())
    }
}

impl Read for NativePort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mode = self.read_mode;
        self.use_timeout(os_read_timeout(mode))?;
        let port = self.port_mut()?;
        loop {
            match port.read(buf) {
                Err(e) if e.kind() == io::ErrorKind::TimedOut => match mode {
                    ReadMode::Blocking => {},
                    ReadMode::NonBlocking => return Err(io::ErrorKind::WouldBlock.into()),
                    ReadMode::Timeout(_) => return Err(e),
                },
                other => return other,
            }
        }
    }
}

impl Write for NativePort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let timeout = self.write_timeout;
        self.use_timeout(os_write_timeout(timeout))?;
        match self.port_mut()?.write(buf) {
            Err(e) if e.kind() == io::ErrorKind::TimedOut && timeout.is_zero() => {
                Err(io::ErrorKind::WouldBlock.into())
            },
            other => other,
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port_mut()?.flush()
    }
}

/// Transport backed by the host's serial devices.
#[derive(Debug, Clone)]
pub struct NativeTransport {
    device_dir: PathBuf,
}

impl Default for NativeTransport {
    fn default() -> Self {
        Self {
            device_dir: PathBuf::from(DEFAULT_DEVICE_DIR),
        }
    }
}

impl NativeTransport {
    /// Transport scanning the default device directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport scanning a custom device directory.
    pub fn with_device_dir(device_dir: impl Into<PathBuf>) -> Self {
        Self {
            device_dir: device_dir.into(),
        }
    }

    /// Directory scanned for Linux/Darwin candidates.
    pub fn device_dir(&self) -> &Path {
        &self.device_dir
    }
}

impl SerialTransport for NativeTransport {
    type Handle = NativePort;

    fn enumerate_platform_candidates(&self, family: PlatformFamily) -> Vec<PortPath> {
        family.candidates(&self.device_dir)
    }

    fn open(&self, path: &PortPath, config: &ConnectionConfig) -> Result<NativePort, DeviceError> {
        NativePort::open(path, config)
    }

    fn close(&self, mut handle: NativePort) -> Result<(), DeviceError> {
        handle.close()
    }
}

// Type conversions from our types to serialport types

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => Self::Five,
            DataBits::Six => Self::Six,
            DataBits::Seven => Self::Seven,
            DataBits::Eight => Self::Eight,
        }
    }
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => Self::None,
            Parity::Odd => Self::Odd,
            Parity::Even => Self::Even,
        }
    }
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => Self::One,
            StopBits::Two => Self::Two,
        }
    }
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => Self::None,
            FlowControl::Hardware => Self::Hardware,
            FlowControl::Software => Self::Software,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeviceErrorKind;

    #[test]
    fn test_os_read_timeout_mapping() {
        assert_eq!(os_read_timeout(ReadMode::NonBlocking), Duration::ZERO);
        assert_eq!(os_read_timeout(ReadMode::Blocking), BLOCKING_READ_TIMEOUT);
        assert_eq!(
            os_read_timeout(ReadMode::Timeout(Duration::from_millis(20))),
            Duration::from_millis(20)
        );
        assert_ne!(
            os_read_timeout(ReadMode::Blocking),
            os_read_timeout(ReadMode::NonBlocking)
        );
    }

    #[test]
    fn test_os_write_timeout_is_never_zero() {
        assert_eq!(os_write_timeout(Duration::ZERO), NON_BLOCKING_WRITE_TIMEOUT);
        assert!(!os_write_timeout(Duration::ZERO).is_zero());
        assert_eq!(
            os_write_timeout(Duration::from_millis(250)),
            Duration::from_millis(250)
        );
    }

    fn closed_port() -> NativePort {
        NativePort {
            port: None,
            name: PortPath::new("/dev/ttyUSB0").unwrap(),
            baud_rate: 115200,
            read_mode: ReadMode::NonBlocking,
            write_timeout: Duration::ZERO,
            active_timeout: Duration::ZERO,
        }
    }

    #[test]
    fn test_line_control_after_close_fails() {
        let mut port = closed_port();
        port.close().unwrap();
        assert!(!port.is_open());

        for err in [
            port.clear_buffers().unwrap_err(),
            port.set_dtr(true).unwrap_err(),
            port.set_rts(false).unwrap_err(),
        ] {
            assert_eq!(err.kind(), DeviceErrorKind::Io);
            assert_eq!(err.message(), "port closed");
        }
    }

    #[test]
    fn test_io_after_close_is_not_connected() {
        let mut port = closed_port();
        let mut buf = [0u8; 4];
        assert_eq!(
            port.read(&mut buf).unwrap_err().kind(),
            io::ErrorKind::NotConnected
        );
        assert_eq!(
            port.write(b"ping").unwrap_err().kind(),
            io::ErrorKind::NotConnected
        );
        assert_eq!(port.flush().unwrap_err().kind(), io::ErrorKind::NotConnected);
    }

    #[test]
    fn test_open_nonexistent_port_fails() {
        let transport = NativeTransport::new();
        let path = PortPath::new("/nonexistent/ttyUSB99").unwrap();
        let err = transport
            .open(&path, &ConnectionConfig::default())
            .err()
            .expect("opening a missing device must fail");
        assert!(!err.message().is_empty());
    }

    #[test]
    fn test_probe_nonexistent_port_fails() {
        let transport = NativeTransport::new();
        let path = PortPath::new("/nonexistent/ttyACM42").unwrap();
        assert!(transport.probe_open_close(&path).is_err());
    }

    #[test]
    fn test_regular_file_is_not_a_serial_port() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("ttyUSB0");
        std::fs::write(&fake, b"").unwrap();

        let transport = NativeTransport::with_device_dir(dir.path());
        let candidates = transport.enumerate_platform_candidates(PlatformFamily::Linux);
        assert_eq!(candidates.len(), 1);

        let err = transport.probe_open_close(&candidates[0]).unwrap_err();
        assert_ne!(err.kind(), DeviceErrorKind::PermissionDenied);
    }

    #[test]
    fn test_default_device_dir() {
        assert_eq!(NativeTransport::default().device_dir(), Path::new("/dev"));
    }
}
