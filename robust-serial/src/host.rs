//! Host-side shortcuts over the native transport.

use crate::{
    PortResolver,
    error::Result,
    port::{ConnectionConfig, PortPath, native::NativePort},
};

/// List the serial ports on this host that can currently be opened.
pub fn list_ports() -> Result<Vec<PortPath>> {
    PortResolver::native().list_ports()
}

/// Open `path`, or the first usable port when `path` is `None`.
pub fn open_port(path: Option<&PortPath>, config: &ConnectionConfig) -> Result<NativePort> {
    PortResolver::native().open(path, config)
}
