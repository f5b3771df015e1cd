//! robust-serial CLI - list, monitor and write to serial ports.
//!
//! ## Features
//!
//! - List serial ports that can actually be opened
//! - Monitor a port (auto-selected if not given)
//! - Send raw or hex-encoded bytes
//! - Configuration file and environment variable support
//! - Shell completion generation

use std::{env, path::PathBuf, process::ExitCode, time::Duration};

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use console::style;
use env_logger::Env;
use log::debug;
use thiserror::Error;

mod commands;
mod config;

use config::{Config, Defaults, Overrides};

/// Errors classified for the CLI exit code contract.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// Invalid usage or setup (exit code 2).
    #[error("{0}")]
    Usage(String),
}

/// robust-serial - find, monitor and talk to serial devices.
///
/// Environment variables:
///   ROBUST_SERIAL_PORT              - Default serial port
///   ROBUST_SERIAL_BAUD              - Default baud rate (default: 115200)
///   ROBUST_SERIAL_READ_TIMEOUT_MS   - Read timeout in milliseconds
///   ROBUST_SERIAL_WRITE_TIMEOUT_MS  - Write timeout in milliseconds
#[derive(Parser)]
#[command(name = "robust-serial")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    /// Serial port to use (auto-detected if not specified).
    #[arg(short, long, global = true, env = "ROBUST_SERIAL_PORT")]
    port: Option<String>,

    /// Baud rate.
    #[arg(short, long, global = true, env = "ROBUST_SERIAL_BAUD")]
    baud: Option<u32>,

    /// Read timeout in milliseconds (0 = non-blocking).
    #[arg(
        long,
        global = true,
        env = "ROBUST_SERIAL_READ_TIMEOUT_MS",
        conflicts_with = "blocking"
    )]
    read_timeout_ms: Option<u64>,

    /// Block on reads until data arrives.
    #[arg(long, global = true)]
    blocking: bool,

    /// Write timeout in milliseconds (0 = non-blocking).
    #[arg(long, global = true, env = "ROBUST_SERIAL_WRITE_TIMEOUT_MS")]
    write_timeout_ms: Option<u64>,

    /// Verbose output level (-v, -vv, -vvv for increasing detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-essential output).
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to a configuration file.
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            port: self.port.clone(),
            baud: self.baud,
            read_timeout_ms: self.read_timeout_ms,
            blocking: self.blocking,
            write_timeout_ms: self.write_timeout_ms,
        }
    }
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// List serial ports that can be opened.
    ListPorts {
        /// Output port list as JSON to stdout.
        #[arg(long)]
        json: bool,

        /// Probe candidates on this many threads.
        #[arg(long, value_name = "N")]
        parallel: Option<usize>,
    },

    /// Print everything received on a serial port until Ctrl+C.
    Monitor,

    /// Write bytes to a serial port.
    Send {
        /// Data to send.
        data: String,

        /// Interpret DATA as hex bytes (e.g. "de ad be ef").
        #[arg(long)]
        hex: bool,

        /// Append a newline.
        #[arg(short, long)]
        newline: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell type.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Read timeout used by `monitor` when none is configured.
const MONITOR_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Write timeout used by `send` when none is configured.
const SEND_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

fn main() -> ExitCode {
    // --- NO_COLOR and TTY detection ---
    let stderr_is_tty = console::Term::stderr().is_term();
    if env::var("NO_COLOR").is_ok() || !stderr_is_tty {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_target(cli.verbose >= 2)
        .format_timestamp(if cli.verbose >= 2 {
            Some(env_logger::TimestampPrecision::Millis)
        } else {
            None
        })
        .init();

    debug!(
        "robust-serial v{} (verbose level: {})",
        env!("CARGO_PKG_VERSION"),
        cli.verbose
    );

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}", style("Error:").red().bold(), render_error(&err));
            ExitCode::from(exit_code(&err))
        },
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = if let Some(ref path) = cli.config_path {
        Config::load_from_path(path)
    } else {
        Config::load()
    };

    match &cli.command {
        Commands::ListPorts { json, parallel } => {
            commands::ports::cmd_list_ports(cli.quiet, *json, *parallel)
        },
        Commands::Monitor => {
            let settings = config.resolve(
                &cli.overrides(),
                Defaults {
                    read_timeout: Some(MONITOR_READ_TIMEOUT),
                    ..Defaults::default()
                },
            )?;
            commands::monitor::cmd_monitor(cli.quiet, &settings)
        },
        Commands::Send { data, hex, newline } => {
            let payload = commands::send::build_payload(data, *hex, *newline)?;
            let settings = config.resolve(
                &cli.overrides(),
                Defaults {
                    write_timeout: SEND_WRITE_TIMEOUT,
                    ..Defaults::default()
                },
            )?;
            commands::send::cmd_send(cli.quiet, &settings, &payload)
        },
        Commands::Completions { shell } => {
            commands::completions::cmd_completions(*shell);
            Ok(())
        },
    }
}

/// Join the error chain, skipping causes already spelled out by their parent.
fn render_error(err: &anyhow::Error) -> String {
    let mut text = err.to_string();
    for cause in err.chain().skip(1) {
        let cause = cause.to_string();
        if !text.contains(&cause) {
            text.push_str(": ");
            text.push_str(&cause);
        }
    }
    text
}

/// Map an error onto the exit code contract: 2 for usage/setup, 1 otherwise.
fn exit_code(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<CliError>().is_some() {
        return 2;
    }
    match err.downcast_ref::<robust_serial::Error>() {
        Some(lib_err) if lib_err.is_setup_error() => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use robust_serial::{DeviceError, DeviceErrorKind, PortPath};

    #[test]
    fn test_exit_code_usage() {
        let err = anyhow::Error::from(CliError::Usage("bad".into()));
        assert_eq!(exit_code(&err), 2);
    }

    #[test]
    fn test_exit_code_setup_errors() {
        assert_eq!(
            exit_code(&anyhow::Error::from(robust_serial::Error::NoPortFound)),
            2
        );
        assert_eq!(
            exit_code(&anyhow::Error::from(
                robust_serial::Error::UnsupportedPlatform("plan9".into())
            )),
            2
        );
    }

    #[test]
    fn test_exit_code_device_error_is_runtime() {
        let err = anyhow::Error::from(robust_serial::Error::Device {
            path: PortPath::new("/dev/ttyUSB0").unwrap(),
            source: DeviceError::new(DeviceErrorKind::Busy, "Device or resource busy"),
        });
        assert_eq!(exit_code(&err), 1);
    }

    #[test]
    fn test_exit_code_survives_context() {
        let err = anyhow::Error::from(robust_serial::Error::NoPortFound).context("selecting port");
        assert_eq!(exit_code(&err), 2);
    }

    #[test]
    fn test_render_error_skips_repeated_cause() {
        let err = anyhow::Error::from(robust_serial::Error::Device {
            path: PortPath::new("/dev/ttyUSB0").unwrap(),
            source: DeviceError::new(DeviceErrorKind::NoDevice, "No such file or directory"),
        });
        assert_eq!(
            render_error(&err),
            "Serial port /dev/ttyUSB0: No such file or directory"
        );
    }

    #[test]
    fn test_render_error_keeps_context_chain() {
        let err = anyhow::Error::from(std::io::Error::other("device unplugged"))
            .context("Failed to read from /dev/ttyACM0");
        assert_eq!(
            render_error(&err),
            "Failed to read from /dev/ttyACM0: device unplugged"
        );
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
