//! Port listing command implementation.

use anyhow::Result;
use console::style;
use robust_serial::{Platform, PortPath, PortResolver};

/// List ports command implementation.
pub(crate) fn cmd_list_ports(quiet: bool, json: bool, parallel: Option<usize>) -> Result<()> {
    let resolver = PortResolver::native();
    let ports = match parallel {
        Some(workers) => resolver.list_ports_parallel(workers)?,
        None => resolver.list_ports()?,
    };

    if json {
        let output = ports_json(resolver.platform(), &ports);
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    // Port names are the only thing on stdout so the list can be piped.
    if !quiet {
        eprintln!("{}", style("Available serial ports:").bold().underlined());
    }

    if ports.is_empty() {
        if !quiet {
            eprintln!("  {}", style("No usable serial ports found").dim());
        }
        return Ok(());
    }

    for port in &ports {
        println!("{port}");
    }

    if !quiet {
        eprintln!(
            "\n{} Default port: {}",
            style("→").green().bold(),
            style(&ports[0]).cyan().bold()
        );
    }

    Ok(())
}

fn platform_name(platform: &Platform) -> &str {
    match platform {
        Platform::Family(family) => family.name(),
        Platform::Other(name) => name,
    }
}

fn ports_json(platform: &Platform, ports: &[PortPath]) -> serde_json::Value {
    serde_json::json!({
        "ok": true,
        "data": {
            "platform": platform_name(platform),
            "ports": ports,
            "default": ports.first(),
        }
    })
}

#[cfg(test)]
mod tests {
    use robust_serial::PlatformFamily;

    use super::*;

    #[test]
    fn test_ports_json_shape() {
        let ports = vec![
            PortPath::new("/dev/ttyACM0").unwrap(),
            PortPath::new("/dev/ttyUSB0").unwrap(),
        ];
        let value = ports_json(&Platform::Family(PlatformFamily::Linux), &ports);

        assert_eq!(value["ok"], true);
        assert_eq!(value["data"]["platform"], "Linux");
        assert_eq!(
            value["data"]["ports"],
            serde_json::json!(["/dev/ttyACM0", "/dev/ttyUSB0"])
        );
        assert_eq!(value["data"]["default"], "/dev/ttyACM0");
    }

    #[test]
    fn test_ports_json_empty() {
        let value = ports_json(&Platform::Family(PlatformFamily::Windows), &[]);
        assert_eq!(value["data"]["ports"], serde_json::json!([]));
        assert!(value["data"]["default"].is_null());
    }

    #[test]
    fn test_platform_name_other() {
        assert_eq!(platform_name(&Platform::Other("plan9".into())), "plan9");
    }
}
