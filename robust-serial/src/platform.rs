//! Host platform identification and candidate path generation.
//!
//! The platform family is resolved once from the host OS name. Each family
//! maps to one candidate generator; none of them touch hardware.
//!
//! | Family  | Candidates                         |
//! |---------|------------------------------------|
//! | Windows | `COM1` ..= `COM256` (synthetic)    |
//! | Linux   | `<dev>/tty[A-Za-z]*`               |
//! | Darwin  | `<dev>/tty.*`                      |

use std::{fmt, fs, path::Path};

use log::debug;

use crate::{
    error::{Error, Result},
    port::PortPath,
};

/// Number of synthetic COM port names generated on Windows.
pub const WINDOWS_COM_PORT_COUNT: u16 = 256;

/// Candidate generator: takes the device directory, returns candidate paths.
pub type CandidateGenerator = fn(&Path) -> Vec<PortPath>;

/// Supported platform families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformFamily {
    /// Windows (COM ports).
    Windows,
    /// Linux and Cygwin (`/dev/tty*`).
    Linux,
    /// macOS and other Darwin systems (`/dev/tty.*`).
    Darwin,
}

impl PlatformFamily {
    /// Candidate generator for this family.
    pub fn candidate_generator(self) -> CandidateGenerator {
        match self {
            Self::Windows => windows_candidates,
            Self::Linux => linux_candidates,
            Self::Darwin => darwin_candidates,
        }
    }

    /// Generate candidate paths below `device_dir`.
    pub fn candidates(self, device_dir: &Path) -> Vec<PortPath> {
        (self.candidate_generator())(device_dir)
    }

    /// Human-readable family name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Windows => "Windows",
            Self::Linux => "Linux",
            Self::Darwin => "Darwin",
        }
    }
}

impl fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Host platform identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    /// A supported family.
    Family(PlatformFamily),
    /// Any other OS, by name.
    Other(String),
}

impl Platform {
    /// Platform of the running host.
    pub fn current() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Classify an OS name as reported by `std::env::consts::OS`.
    pub fn from_os_name(os: &str) -> Self {
        match os {
            "windows" => Self::Family(PlatformFamily::Windows),
            "linux" | "cygwin" | "android" => Self::Family(PlatformFamily::Linux),
            "macos" | "ios" | "darwin" => Self::Family(PlatformFamily::Darwin),
            other => Self::Other(other.to_string()),
        }
    }

    /// The supported family, or `UnsupportedPlatform`.
    pub fn family(&self) -> Result<PlatformFamily> {
        match self {
            Self::Family(family) => Ok(*family),
            Self::Other(name) => Err(Error::UnsupportedPlatform(name.clone())),
        }
    }
}

impl From<PlatformFamily> for Platform {
    fn from(family: PlatformFamily) -> Self {
        Self::Family(family)
    }
}

fn windows_candidates(_device_dir: &Path) -> Vec<PortPath> {
    (1..=WINDOWS_COM_PORT_COUNT)
        .map(|n| PortPath(format!("COM{n}")))
        .collect()
}

/// `tty` followed by a letter. Leaves out the controlling terminal `tty`
/// and the numbered consoles `tty0`, `tty1`, ...
fn is_linux_candidate(name: &str) -> bool {
    name.strip_prefix("tty")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_alphabetic())
}

fn is_darwin_candidate(name: &str) -> bool {
    name.starts_with("tty.")
}

fn linux_candidates(device_dir: &Path) -> Vec<PortPath> {
    scan_device_dir(device_dir, is_linux_candidate)
}

fn darwin_candidates(device_dir: &Path) -> Vec<PortPath> {
    scan_device_dir(device_dir, is_darwin_candidate)
}

/// Directory entries whose file name matches, in directory order.
fn scan_device_dir(device_dir: &Path, matches: fn(&str) -> bool) -> Vec<PortPath> {
    let entries = match fs::read_dir(device_dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Failed to read {}: {e}", device_dir.display());
            return Vec::new();
        },
    };

    let mut result = Vec::new();
    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if matches(name) {
            let full = device_dir.join(name);
            if let Some(path) = full.to_str() {
                result.push(PortPath(path.to_string()));
            }
        }
    }

    debug!(
        "Found {} candidate(s) in {}",
        result.len(),
        device_dir.display()
    );
    result
}
