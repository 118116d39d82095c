//! Web server command.

use console::style;

use crate::config::Settings;
use crate::pipeline::Detector;

/// Start the web server.
pub async fn cmd_serve(settings: Settings, bind: &str) -> anyhow::Result<()> {
    let bind = parse_bind_address(bind);
    let detector = Detector::new(settings)?;

    println!(
        "{} Starting linkprobe API at http://{}",
        style("→").cyan(),
        bind
    );
    if !detector.has_browser() {
        println!(
            "  {} Rendering engine disabled, interactive phase will be skipped",
            style("!").yellow()
        );
    }
    println!("  Press Ctrl+C to stop");

    crate::server::serve(detector, &bind).await
}

/// Parse a bind address that can be:
/// - Just a port: "8080" -> 127.0.0.1:8080
/// - Just a host: "0.0.0.0" -> 0.0.0.0:8080
/// - Host and port: "0.0.0.0:8080" -> 0.0.0.0:8080
fn parse_bind_address(bind: &str) -> String {
    if let Ok(port) = bind.parse::<u16>() {
        return format!("127.0.0.1:{}", port);
    }

    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if port_str.parse::<u16>().is_ok() {
            return format!("{}:{}", host, port_str);
        }
    }

    format!("{}:8080", bind)
}
