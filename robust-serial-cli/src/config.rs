//! Configuration file support for robust-serial.
//!
//! Configuration is loaded from multiple sources with the following priority (highest first):
//! 1. Command-line arguments
//! 2. Environment variables (ROBUST_SERIAL_*)
//! 3. Local config file (./robust-serial.toml)
//! 4. Global config file (~/.config/robust-serial/config.toml)

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use directories::ProjectDirs;
use log::{debug, warn};
use robust_serial::{ConnectionConfig, DEFAULT_BAUD_RATE, PortPath};
use serde::{Deserialize, Serialize};

/// Name of the per-directory config file.
pub const LOCAL_CONFIG_FILE: &str = "robust-serial.toml";

/// `[connection]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Preferred serial port (e.g., "/dev/ttyUSB0" or "COM3").
    pub port: Option<String>,
    /// Default baud rate.
    pub baud: Option<u32>,
    /// Read timeout in milliseconds.
    pub read_timeout_ms: Option<u64>,
    /// Block on reads. Wins over `read_timeout_ms`.
    #[serde(default)]
    pub blocking: bool,
    /// Write timeout in milliseconds.
    pub write_timeout_ms: Option<u64>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Connection settings.
    #[serde(default)]
    pub connection: ConnectionSettings,
}

/// Values given on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub port: Option<String>,
    pub baud: Option<u32>,
    pub read_timeout_ms: Option<u64>,
    pub blocking: bool,
    pub write_timeout_ms: Option<u64>,
}

/// Per-command fallbacks used when nothing else sets a value.
#[derive(Debug, Clone, Copy)]
pub struct Defaults {
    pub read_timeout: Option<Duration>,
    pub write_timeout: Duration,
}

impl Default for Defaults {
    fn default() -> Self {
        let config = ConnectionConfig::default();
        Self {
            read_timeout: config.read_timeout(),
            write_timeout: config.write_timeout(),
        }
    }
}

/// Fully resolved connection request.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Explicit port, or `None` to auto-select.
    pub port: Option<PortPath>,
    pub connection: ConnectionConfig,
}

impl Config {
    /// Load configuration from all available sources.
    pub fn load() -> Self {
        let mut config = Self::default();

        // Load global config
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global_config) = Self::load_from_file(&global_path) {
                debug!("Loaded global config from {}", global_path.display());
                config.merge(global_config);
            }
        }

        // Load local config (overrides global)
        if let Some(local_config) = Self::load_from_file(Path::new(LOCAL_CONFIG_FILE)) {
            debug!("Loaded local config from {LOCAL_CONFIG_FILE}");
            config.merge(local_config);
        }

        config
    }

    /// Load configuration from a specific file path (--config flag).
    pub fn load_from_path(path: &Path) -> Self {
        if let Some(config) = Self::load_from_file(path) {
            debug!("Loaded config from {}", path.display());
            config
        } else {
            warn!(
                "Could not load config from {}, using defaults",
                path.display()
            );
            Self::default()
        }
    }

    fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!("Failed to parse config file {}: {}", path.display(), e);
                    None
                },
            },
            Err(e) => {
                warn!("Failed to read config file {}: {}", path.display(), e);
                None
            },
        }
    }

    /// Get the global configuration directory.
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "robust-serial").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the global configuration file path.
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Merge another config into this one.
    fn merge(&mut self, other: Self) {
        let ours = &mut self.connection;
        let theirs = other.connection;
        if theirs.port.is_some() {
            ours.port = theirs.port;
        }
        if theirs.baud.is_some() {
            ours.baud = theirs.baud;
        }
        if theirs.read_timeout_ms.is_some() {
            ours.read_timeout_ms = theirs.read_timeout_ms;
        }
        if theirs.blocking {
            ours.blocking = true;
        }
        if theirs.write_timeout_ms.is_some() {
            ours.write_timeout_ms = theirs.write_timeout_ms;
        }
    }

    /// Combine command-line overrides, this config and `defaults` into a
    /// validated connection request.
    pub fn resolve(
        &self,
        overrides: &Overrides,
        defaults: Defaults,
    ) -> robust_serial::Result<Settings> {
        let file = &self.connection;

        let port = overrides
            .port
            .clone()
            .or_else(|| file.port.clone())
            .map(PortPath::new)
            .transpose()?;

        let baud = overrides.baud.or(file.baud).unwrap_or(DEFAULT_BAUD_RATE);

        // An explicit timeout on the command line beats `blocking` from a file.
        let read_timeout = if overrides.blocking {
            None
        } else if let Some(ms) = overrides.read_timeout_ms {
            Some(Duration::from_millis(ms))
        } else if file.blocking {
            None
        } else {
            file.read_timeout_ms
                .map(Duration::from_millis)
                .or(defaults.read_timeout)
        };

        let write_timeout = overrides
            .write_timeout_ms
            .or(file.write_timeout_ms)
            .map_or(defaults.write_timeout, Duration::from_millis);

        let connection = ConnectionConfig::new(baud)?
            .with_read_timeout(read_timeout)
            .with_write_timeout(write_timeout);

        Ok(Settings { port, connection })
    }
}

#[cfg(test)]
mod tests {
    use robust_serial::{Error, ReadMode};

    use super::*;

    // ---- Default values ----

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.connection.port.is_none());
        assert!(config.connection.baud.is_none());
        assert!(config.connection.read_timeout_ms.is_none());
        assert!(!config.connection.blocking);
        assert!(config.connection.write_timeout_ms.is_none());
    }

    // ---- Config merge ----

    #[test]
    fn test_config_merge_port_and_baud() {
        let mut base = Config::default();
        base.connection.baud = Some(9600);

        let mut other = Config::default();
        other.connection.port = Some("/dev/ttyACM0".to_string());
        other.connection.baud = Some(57600);

        base.merge(other);
        assert_eq!(base.connection.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(base.connection.baud, Some(57600));
    }

    #[test]
    fn test_config_merge_does_not_overwrite_with_none() {
        let mut base = Config::default();
        base.connection.port = Some("COM4".to_string());
        base.connection.read_timeout_ms = Some(250);

        base.merge(Config::default());

        assert_eq!(base.connection.port.as_deref(), Some("COM4"));
        assert_eq!(base.connection.read_timeout_ms, Some(250));
    }

    #[test]
    fn test_config_merge_blocking_is_sticky() {
        let mut base = Config::default();
        let mut other = Config::default();
        other.connection.blocking = true;
        base.merge(other);
        base.merge(Config::default());
        assert!(base.connection.blocking);
    }

    // ---- TOML ----

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
[connection]
port = "/dev/ttyUSB0"
baud = 9600
read_timeout_ms = 500
write_timeout_ms = 20
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.connection.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(config.connection.baud, Some(9600));
        assert_eq!(config.connection.read_timeout_ms, Some(500));
        assert!(!config.connection.blocking);
        assert_eq!(config.connection.write_timeout_ms, Some(20));
    }

    #[test]
    fn test_config_from_empty_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.connection.port.is_none());
    }

    // ---- resolve ----

    #[test]
    fn test_resolve_library_defaults() {
        let settings = Config::default()
            .resolve(&Overrides::default(), Defaults::default())
            .unwrap();
        assert!(settings.port.is_none());
        assert_eq!(settings.connection.baud_rate(), DEFAULT_BAUD_RATE);
        assert_eq!(settings.connection.read_mode(), ReadMode::NonBlocking);
        assert_eq!(settings.connection.write_timeout(), Duration::ZERO);
    }

    #[test]
    fn test_resolve_command_defaults() {
        let defaults = Defaults {
            read_timeout: Some(Duration::from_millis(100)),
            write_timeout: Duration::from_secs(1),
        };
        let settings = Config::default()
            .resolve(&Overrides::default(), defaults)
            .unwrap();
        assert_eq!(
            settings.connection.read_mode(),
            ReadMode::Timeout(Duration::from_millis(100))
        );
        assert_eq!(settings.connection.write_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_resolve_overrides_beat_file() {
        let mut config = Config::default();
        config.connection.port = Some("/dev/ttyUSB0".to_string());
        config.connection.baud = Some(9600);
        config.connection.write_timeout_ms = Some(5);

        let overrides = Overrides {
            port: Some("/dev/ttyACM1".to_string()),
            baud: Some(57600),
            write_timeout_ms: Some(50),
            ..Overrides::default()
        };
        let settings = config.resolve(&overrides, Defaults::default()).unwrap();

        assert_eq!(settings.port.unwrap().as_str(), "/dev/ttyACM1");
        assert_eq!(settings.connection.baud_rate(), 57600);
        assert_eq!(settings.connection.write_timeout(), Duration::from_millis(50));
    }

    #[test]
    fn test_resolve_file_blocking() {
        let mut config = Config::default();
        config.connection.blocking = true;
        config.connection.read_timeout_ms = Some(300);

        let settings = config
            .resolve(&Overrides::default(), Defaults::default())
            .unwrap();
        assert_eq!(settings.connection.read_mode(), ReadMode::Blocking);
    }

    #[test]
    fn test_resolve_cli_timeout_beats_file_blocking() {
        let mut config = Config::default();
        config.connection.blocking = true;

        let overrides = Overrides {
            read_timeout_ms: Some(0),
            ..Overrides::default()
        };
        let settings = config.resolve(&overrides, Defaults::default()).unwrap();
        assert_eq!(settings.connection.read_mode(), ReadMode::NonBlocking);
    }

    #[test]
    fn test_resolve_cli_blocking() {
        let overrides = Overrides {
            blocking: true,
            ..Overrides::default()
        };
        let settings = Config::default()
            .resolve(&overrides, Defaults::default())
            .unwrap();
        assert_eq!(settings.connection.read_mode(), ReadMode::Blocking);
    }

    #[test]
    fn test_resolve_rejects_zero_baud() {
        let overrides = Overrides {
            baud: Some(0),
            ..Overrides::default()
        };
        let err = Config::default()
            .resolve(&overrides, Defaults::default())
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.is_setup_error());
    }

    #[test]
    fn test_resolve_rejects_empty_port() {
        let overrides = Overrides {
            port: Some(String::new()),
            ..Overrides::default()
        };
        let err = Config::default()
            .resolve(&overrides, Defaults::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPortPath(_)));
    }

    // ---- load_from_path with tempfile ----

    #[test]
    fn test_load_from_path_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(
            &path,
            r#"
[connection]
port = "/dev/ttyUSB1"
blocking = true
"#,
        )
        .unwrap();

        let config = Config::load_from_path(&path);
        assert_eq!(config.connection.port.as_deref(), Some("/dev/ttyUSB1"));
        assert!(config.connection.blocking);
    }

    #[test]
    fn test_load_from_path_invalid_toml_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[connection\nport = ").unwrap();

        let config = Config::load_from_path(&path);
        assert!(config.connection.port.is_none());
    }

    #[test]
    fn test_load_from_path_nonexistent() {
        let config = Config::load_from_path(Path::new("/nonexistent/path/config.toml"));
        assert!(config.connection.port.is_none());
    }

    // ---- global_config_path ----

    #[test]
    fn test_global_config_path_shape() {
        if let Some(p) = Config::global_config_path() {
            let text = p.to_string_lossy();
            assert!(text.contains("robust-serial"));
            assert!(text.ends_with("config.toml"));
        }
    }
}
