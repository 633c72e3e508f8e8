use crate::constants::{DEFAULT_READ_TIMEOUT, FIRMWARE_BAUD_RATE};
use crate::error::G4Error;
use bytes::Bytes;
use serialport::{DataBits, Parity, SerialPort, StopBits};
use std::io::{self, Read, Write};
use std::time::Duration;
use tracing::{debug, info};

/// Byte-level link to the receiver. Reads block until the requested count is
/// available or the link reports an error.
pub trait Transport {
    fn open(&mut self) -> Result<(), G4Error>;

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), G4Error>;

    fn read_exact(&mut self, len: usize) -> Result<Bytes, G4Error>;

    /// Release the link. Closing an already closed transport is a no-op.
    fn close(&mut self) -> Result<(), G4Error>;
}

/// Line settings for the receiver's CDC-ACM port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: FIRMWARE_BAUD_RATE,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl SerialConfig {
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }
}

/// Snapshot of the modem control lines, logged while probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineStatus {
    pub clear_to_send: bool,
    pub data_set_ready: bool,
    pub carrier_detect: bool,
    pub ring_indicator: bool,
}

pub struct SerialTransport {
    path: String,
    config: SerialConfig,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    pub fn new(path: impl Into<String>, config: SerialConfig) -> Self {
        Self {
            path: path.into(),
            config,
            port: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>, G4Error> {
        self.port.as_mut().ok_or_else(|| {
            G4Error::Transport(io::Error::new(
                io::ErrorKind::NotConnected,
                "serial port is not open",
            ))
        })
    }

    pub fn line_status(&mut self) -> Result<LineStatus, G4Error> {
        let port = self.port()?;
        Ok(LineStatus {
            clear_to_send: port.read_clear_to_send()?,
            data_set_ready: port.read_data_set_ready()?,
            carrier_detect: port.read_carrier_detect()?,
            ring_indicator: port.read_ring_indicator()?,
        })
    }
}

impl Transport for SerialTransport {
    fn open(&mut self) -> Result<(), G4Error> {
        if self.port.is_some() {
            return Ok(());
        }
        info!("Opening serial port {}", self.path);
        let port = serialport::new(&self.path, self.config.baud_rate)
            .data_bits(self.config.data_bits)
            .stop_bits(self.config.stop_bits)
            .parity(self.config.parity)
            .timeout(self.config.read_timeout)
            .open()?;
        self.port = Some(port);
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), G4Error> {
        let port = self.port()?;
        port.write_all(bytes)?;
        port.flush()?;
        debug!(len = bytes.len(), bytes = %hex::encode(bytes), "Wrote frame");
        Ok(())
    }

    fn read_exact(&mut self, len: usize) -> Result<Bytes, G4Error> {
        let port = self.port()?;
        let mut buf = vec![0u8; len];
        port.read_exact(&mut buf)?;
        Ok(Bytes::from(buf))
    }

    fn close(&mut self) -> Result<(), G4Error> {
        if self.port.take().is_some() {
            info!("Closed serial port {}", self.path);
        }
        Ok(())
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
