//! Send command implementation.

use std::io::Write;

use anyhow::{Context, Result};
use console::style;
use robust_serial::PortResolver;

use crate::{CliError, config::Settings};

/// Turn the command-line argument into the bytes to write.
pub(crate) fn build_payload(data: &str, hex: bool, newline: bool) -> Result<Vec<u8>> {
    let mut payload = if hex {
        parse_hex(data).map_err(CliError::Usage)?
    } else {
        data.as_bytes().to_vec()
    };
    if newline {
        payload.push(b'\n');
    }
    Ok(payload)
}

/// Open the port, write `payload`, flush and close.
///
/// The port is closed even when the write fails.
pub(crate) fn cmd_send(quiet: bool, settings: &Settings, payload: &[u8]) -> Result<()> {
    let resolver = PortResolver::native();
    let mut port = resolver.open(settings.port.as_ref(), &settings.connection)?;
    let name = port.name().clone();

    let written = port.write_all(payload).and_then(|()| port.flush());
    resolver.close(port)?;
    written.with_context(|| format!("Failed to write to {name}"))?;

    if !quiet {
        eprintln!(
            "{} Sent {} byte(s) to {}",
            style("✓").green(),
            payload.len(),
            style(&name).cyan()
        );
    }
    Ok(())
}

/// Parse hex bytes such as `"de ad be ef"`, `"0xDEADBEEF"` or `"de:ad"`.
fn parse_hex(text: &str) -> Result<Vec<u8>, String> {
    let mut bytes = Vec::new();
    for token in text.split(|c: char| c.is_whitespace() || matches!(c, ':' | ',' | '-')) {
        let digits = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        if digits.is_empty() {
            continue;
        }
        if digits.len() % 2 != 0 {
            return Err(format!("Odd number of hex digits in '{token}'"));
        }
        for pair in digits.as_bytes().chunks(2) {
            let pair = std::str::from_utf8(pair).map_err(|_| format!("Invalid hex '{token}'"))?;
            let byte =
                u8::from_str_radix(pair, 16).map_err(|_| format!("Invalid hex byte '{pair}'"))?;
            bytes.push(byte);
        }
    }
    if bytes.is_empty() {
        return Err("No hex bytes given".to_string());
    }
    Ok(bytes)
}
