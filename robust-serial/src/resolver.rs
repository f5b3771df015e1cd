//! Serial port discovery and connection establishment.
//!
//! [`PortResolver`] turns the platform's candidate device names into a list of
//! ports that could actually be opened, and opens a configured connection on
//! either an explicit port or the first discovered one.
//!
//! Probe failures during discovery are expected (most candidates, and on
//! Windows almost all of the 256 synthetic COM names, are not attached) and
//! are never reported. Failures of an explicit [`PortResolver::open`] always
//! are.
//!
//! ## Example
//!
//! ```rust,no_run
//! use robust_serial::{ConnectionConfig, PortResolver};
//!
//! fn main() -> robust_serial::Result<()> {
//!     let resolver = PortResolver::native();
//!     for port in resolver.list_ports()? {
//!         println!("{port}");
//!     }
//!
//!     let config = ConnectionConfig::new(9600)?.with_read_timeout(None);
//!     let handle = resolver.open(None, &config)?;
//!     resolver.close(handle)?;
//!     Ok(())
//! }
//! ```

use std::thread;

use log::{debug, info, trace};

use crate::{
    error::{Error, Result},
    platform::{Platform, PlatformFamily},
    port::{ConnectionConfig, PortPath, SerialTransport},
};

#[cfg(feature = "native")]
use crate::port::native::NativeTransport;

/// Discovers usable ports and opens connections through a transport.
#[derive(Debug, Clone)]
pub struct PortResolver<T> {
    transport: T,
    platform: Platform,
}

#[cfg(feature = "native")]
impl PortResolver<NativeTransport> {
    /// Resolver over the host's serial devices.
    pub fn native() -> Self {
        Self::new(NativeTransport::new())
    }
}

impl<T: SerialTransport> PortResolver<T> {
    /// Resolver over `transport` on the running host's platform.
    pub fn new(transport: T) -> Self {
        Self::with_platform(transport, Platform::current())
    }

    /// Resolver with an explicit platform identity.
    pub fn with_platform(transport: T, platform: Platform) -> Self {
        Self {
            transport,
            platform,
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The platform identity used for discovery.
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// List ports that could be opened at the time of the call.
    ///
    /// Every candidate is opened and closed again. Candidates that fail are
    /// left out. Order is enumeration order.
    pub fn list_ports(&self) -> Result<Vec<PortPath>> {
        let candidates = self.candidates()?;
        let ports: Vec<PortPath> = candidates
            .into_iter()
            .filter(|path| self.probe(path))
            .collect();

        debug!("{} usable port(s)", ports.len());
        Ok(ports)
    }

    /// Pick the port to use when the caller has none.
    pub fn default_port(&self) -> Result<PortPath> {
        let port = self
            .list_ports()?
            .into_iter()
            .next()
            .ok_or(Error::NoPortFound)?;
        info!("Using first available port: {port}");
        Ok(port)
    }

    /// Open a connection.
    ///
    /// With `path` absent the first discovered port is used. With `path`
    /// present no discovery happens. The returned handle belongs to the
    /// caller.
    pub fn open(&self, path: Option<&PortPath>, config: &ConnectionConfig) -> Result<T::Handle> {
        let path = match path {
            Some(path) => path.clone(),
            None => self.default_port()?,
        };

        debug!(
            "Opening {path} at {} baud ({:?}, write timeout {:?})",
            config.baud_rate(),
            config.read_mode(),
            config.write_timeout()
        );
        self.transport
            .open(&path, config)
            .map_err(|source| Error::Device { path, source })
    }

    /// Close a handle returned by [`PortResolver::open`].
    pub fn close(&self, handle: T::Handle) -> Result<()> {
        self.transport
            .close(handle)
            .map_err(Error::Close)
    }

    fn candidates(&self) -> Result<Vec<PortPath>> {
        let family = self.platform.family()?;
        let candidates = self
            .transport
            .enumerate_platform_candidates(family);
        debug!("{} candidate(s) on {family}", candidates.len());
        Ok(candidates)
    }

    fn probe(&self, path: &PortPath) -> bool {
        match self.transport.probe_open_close(path) {
            Ok(()) => {
                trace!("Probe ok: {path}");
                true
            },
            Err(e) => {
                trace!("Probe failed: {path}: {e}");
                false
            },
        }
    }
}

impl<T: SerialTransport + Sync> PortResolver<T> {
    /// Like [`PortResolver::list_ports`], probing on up to `workers` threads.
    ///
    /// The result is identical to the sequential version, including order.
    pub fn list_ports_parallel(&self, workers: usize) -> Result<Vec<PortPath>> {
        let candidates = self.candidates()?;
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let workers = workers.clamp(1, candidates.len());
        let chunk_size = candidates.len().div_ceil(workers);

        let usable: Vec<bool> = thread::scope(|scope| {
            let handles: Vec<_> = candidates
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|path| self.probe(path))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        });

        let ports: Vec<PortPath> = candidates
            .into_iter()
            .zip(usable)
            .filter_map(|(path, ok)| ok.then_some(path))
            .collect();

        debug!("{} usable port(s) ({workers} worker(s))", ports.len());
        Ok(ports)
    }
}
