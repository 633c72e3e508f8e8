use anyhow::{Context, Result};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use tracing::{info, warn};

use g4sync_lib::probe::matching_ports;
use g4sync_lib::{DiscoveryConfig, Receiver, SerialTransport, probe_port};

/// List serial ports that look like a G4 receiver and probe each one.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Regex that port names must match. Defaults to the platform pattern.
    #[arg(long)]
    port_pattern: Option<String>,
    /// List every serial port, not just matching ones.
    #[arg(short, long)]
    all: bool,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.verbose.tracing_level_filter())
        .with_target(false)
        .init();

    let config = match cli.port_pattern {
        Some(pattern) => DiscoveryConfig::default().with_port_pattern(pattern),
        None => DiscoveryConfig::default(),
    };

    let ports = serialport::available_ports().context("Failed to enumerate serial ports")?;
    if cli.all {
        for port in &ports {
            info!("{} ({:?})", port.port_name, port.port_type);
        }
    }

    let candidates = matching_ports(ports.into_iter().map(|p| p.port_name), &config.port_pattern)
        .with_context(|| format!("Invalid port pattern: {}", config.port_pattern))?;
    if candidates.is_empty() {
        info!("No ports match {}", config.port_pattern);
        return Ok(());
    }

    for candidate in candidates {
        if !probe_port(&candidate, &config).await {
            continue;
        }

        let path = candidate.clone();
        let serial = config.serial;
        let header = tokio::task::spawn_blocking(move || {
            let mut receiver = Receiver::new(SerialTransport::new(path, serial));
            receiver.with_open_port(|r| r.read_firmware_header())
        })
        .await
        .context("Firmware header worker did not complete")?;

        match header {
            Ok(header) => info!(
                "{}: {} firmware {} (serial API {})",
                candidate, header.product_name, header.firmware_version, header.api_version
            ),
            Err(e) => warn!("{}: answered ping but firmware header failed: {}", candidate, e),
        }
    }

    Ok(())
}
