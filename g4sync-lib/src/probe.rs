use crate::constants::PROBE_TIMEOUT;
use crate::device::Receiver;
use crate::error::G4Error;
use crate::transport::{SerialConfig, SerialTransport, Transport};
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

#[cfg(target_os = "macos")]
const DEFAULT_PORT_PATTERN: &str = r".*\.usbmodem.*";
#[cfg(target_os = "windows")]
const DEFAULT_PORT_PATTERN: &str = r"COM\d+";
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const DEFAULT_PORT_PATTERN: &str = r"/dev/ttyACM\d+";

/// How candidate serial ports are found and probed.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub port_pattern: String,
    pub serial: SerialConfig,
    pub probe_timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            port_pattern: DEFAULT_PORT_PATTERN.to_string(),
            serial: SerialConfig::default(),
            probe_timeout: PROBE_TIMEOUT,
        }
    }
}

impl DiscoveryConfig {
    pub fn with_port_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.port_pattern = pattern.into();
        self
    }
}

/// Ping the receiver through `transport` on a blocking worker, giving up
/// after `deadline`. Any failure, including the deadline, counts as "no".
///
/// A blocking read cannot be interrupted, so on timeout the worker is left
/// running and closes the port once its read returns, after this function
/// has already answered. Callers bound that by giving the transport a read
/// timeout no longer than `deadline`, as `probe_port` does.
pub async fn probe_with<T>(transport: T, deadline: Duration) -> bool
where
    T: Transport + Send + 'static,
{
    let task = tokio::task::spawn_blocking(move || {
        let mut receiver = Receiver::new(transport);
        receiver.with_open_port(|r| r.ping())
    });

    match timeout(deadline, task).await {
        Ok(Ok(Ok(()))) => true,
        Ok(Ok(Err(e))) => {
            debug!("Probe failed: {}", e);
            false
        }
        Ok(Err(e)) => {
            debug!("Probe worker panicked or was cancelled: {}", e);
            false
        }
        Err(elapsed) => {
            debug!("{}", G4Error::from(elapsed));
            false
        }
    }
}

/// Check whether the receiver answers on the serial port at `path`.
pub async fn probe_port(path: &str, config: &DiscoveryConfig) -> bool {
    info!("Probing {}", path);
    let serial = config.serial.with_read_timeout(config.probe_timeout);
    let transport = LoggedSerialTransport(SerialTransport::new(path, serial));
    let found = probe_with(transport, config.probe_timeout).await;
    info!("Receiver {} on {}", if found { "found" } else { "not found" }, path);
    found
}

/// Serial transport that logs the modem lines once the port is open.
struct LoggedSerialTransport(SerialTransport);

impl Transport for LoggedSerialTransport {
    fn open(&mut self) -> Result<(), G4Error> {
        self.0.open()?;
        match self.0.line_status() {
            Ok(status) => debug!(?status, "Line status of {}", self.0.path()),
            Err(e) => debug!("Line status unavailable on {}: {}", self.0.path(), e),
        }
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), G4Error> {
        self.0.write_all(bytes)
    }

    fn read_exact(&mut self, len: usize) -> Result<bytes::Bytes, G4Error> {
        self.0.read_exact(len)
    }

    fn close(&mut self) -> Result<(), G4Error> {
        self.0.close()
    }
}

/// Names from `ports` matching `pattern`, in their original order.
pub fn matching_ports<I, S>(ports: I, pattern: &str) -> Result<Vec<String>, G4Error>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let pattern = Regex::new(pattern)?;
    Ok(ports
        .into_iter()
        .map(Into::into)
        .filter(|name| pattern.is_match(name))
        .collect())
}

/// Enumerate serial ports and return the first one where the receiver
/// answers the probe.
pub async fn find_receiver(config: &DiscoveryConfig) -> Result<String, G4Error> {
    let ports = serialport::available_ports()?;
    let candidates = matching_ports(ports.into_iter().map(|p| p.port_name), &config.port_pattern)?;
    if candidates.is_empty() {
        return Err(G4Error::ReceiverNotFound);
    }
    debug!("Candidate ports: {:?}", candidates);

    for candidate in &candidates {
        if probe_port(candidate, config).await {
            return Ok(candidate.clone());
        }
    }
    Err(G4Error::NoMatchingReceiver {
        candidates: candidates.len(),
    })
}

/// Keeps at most one sync in flight per port.
#[derive(Debug, Clone, Default)]
pub struct SyncCoordinator {
    active: Arc<Mutex<HashSet<String>>>,
}

impl SyncCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn active(&self) -> MutexGuard<'_, HashSet<String>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim `port` for a sync. Returns `None` while another permit for the
    /// same port is alive.
    pub fn try_begin(&self, port: &str) -> Option<SyncPermit> {
        if !self.active().insert(port.to_string()) {
            debug!("Sync already running on {}", port);
            return None;
        }
        Some(SyncPermit {
            port: port.to_string(),
            active: Arc::clone(&self.active),
        })
    }

    pub fn is_active(&self, port: &str) -> bool {
        self.active().contains(port)
    }
}

/// Held for the duration of a sync; dropping it releases the port.
#[derive(Debug)]
pub struct SyncPermit {
    port: String,
    active: Arc<Mutex<HashSet<String>>>,
}

impl SyncPermit {
    pub fn port(&self) -> &str {
        &self.port
    }
}

impl Drop for SyncPermit {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.port);
    }
}
