//! Scripted receiver, captured frames and record builders for the integration tests

// each test binary compiles this module and uses only part of it
#[allow(unused_imports)]
pub use bytes::{BufMut, Bytes, BytesMut};
#[allow(unused_imports)]
pub use g4sync_lib::command::{ReceiverCommand, RecordType};
#[allow(unused_imports)]
pub use g4sync_lib::crc::checksum;
#[allow(unused_imports)]
pub use g4sync_lib::error::G4Error;
#[allow(unused_imports)]
pub use g4sync_lib::frame::{FrameBuilder, InboundFrame};
#[allow(unused_imports)]
pub use g4sync_lib::transport::Transport;
#[allow(unused_imports)]
pub use hex;

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Route library logs to the test harness; `RUST_LOG=debug` shows frame dumps.
#[allow(dead_code)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Decode hex string to bytes for testing
#[allow(dead_code)]
pub fn hex_to_bytes(hex_data: &str) -> Bytes {
    Bytes::from(hex::decode(hex_data).expect("Failed to decode hex"))
}

/// Manufacturing XML captured from a real receiver
#[allow(dead_code)]
pub const MANUFACTURING_XML: &str = "<ManufacturingParameters SerialNumber=\"sm30140752\" \
    HardwarePartNumber=\"MD1060-MT20649\" HardwareRevision=\"14\" \
    DateTimeCreated=\"2013-01-03 13:54:05.536 -08:00\" \
    HardwareId=\"{75B7C886-FE10-420F-B511-2D3F9B9BEE7E}\" />";

/// Firmware header XML captured from a real receiver
#[allow(dead_code)]
pub const FIRMWARE_HEADER_XML: &str = "<FirmwareHeader SchemaVersion='1' ApiVersion='2.2.0.0' \
    TestApiVersion='2.4.0.0' ProductId='G4Receiver' ProductName='Dexcom G4 Receiver' \
    SoftwareNumber='SW10050' FirmwareVersion='2.0.1.104' PortVersion='4.6.4.45' \
    RFVersion='1.0.0.27' DexBootVersion='3'/>";

/// Page header of the captured manufacturing page
#[allow(dead_code)]
pub const MANUFACTURING_PAGE_HEADER: &str = "00000000010000000001000000000000000000000000000000003a7d";

/// Real "read database pages" response for the manufacturing partition:
/// frame header, one 528-byte page, frame crc.
#[allow(dead_code)]
pub fn captured_manufacturing_response() -> Vec<u8> {
    let mut frame = hex::decode("01160201").unwrap();
    frame.extend(hex::decode(MANUFACTURING_PAGE_HEADER).unwrap());
    let mut data = hex::decode("7df68907fd858907").unwrap();
    data.extend_from_slice(MANUFACTURING_XML.as_bytes());
    data.resize(498, 0);
    data.extend_from_slice(&[0xF4, 0xFB]);
    frame.extend(data);
    frame.extend_from_slice(&[0x7F, 0x04]);
    frame
}

/// Build a response frame the way the receiver does.
#[allow(dead_code)]
pub fn response(command: ReceiverCommand, payload: &[u8]) -> Vec<u8> {
    FrameBuilder::new(command)
        .with_slice(payload)
        .finish()
        .expect("payload fits a frame")
        .as_bytes()
        .to_vec()
}

#[allow(dead_code)]
pub fn ack(payload: &[u8]) -> Vec<u8> {
    response(ReceiverCommand::Ack, payload)
}

#[allow(dead_code)]
pub fn page_range_ack(first: u32, last: u32) -> Vec<u8> {
    let mut payload = first.to_le_bytes().to_vec();
    payload.extend(last.to_le_bytes());
    ack(&payload)
}

fn sealed(mut buf: BytesMut) -> Vec<u8> {
    let crc = checksum(&buf);
    buf.put_u16_le(crc);
    buf.to_vec()
}

#[allow(dead_code)]
pub fn glucose_record(internal: u32, local: u32, raw: u16, trend: u8) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_u32_le(internal);
    buf.put_u32_le(local);
    buf.put_u16_le(raw);
    buf.put_u8(trend);
    sealed(buf)
}

#[allow(dead_code)]
pub fn user_event_record(internal: u32, local: u32, event_type: u8, subtype: u8, event: u32, value: u32) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_u32_le(internal);
    buf.put_u32_le(local);
    buf.put_u8(event_type);
    buf.put_u8(subtype);
    buf.put_u32_le(event);
    buf.put_u32_le(value);
    sealed(buf)
}

/// A 528-byte page holding `records` back to back.
#[allow(dead_code)]
pub fn page(record_type: RecordType, first_index: u32, page_number: u32, records: &[Vec<u8>]) -> Vec<u8> {
    let mut header = BytesMut::new();
    header.put_u32_le(first_index);
    header.put_u32_le(records.len() as u32);
    header.put_u8(record_type.id());
    header.put_u8(1);
    header.put_u32_le(page_number);
    header.put_bytes(0, 12);
    let mut page = sealed(header);
    for record in records {
        page.extend_from_slice(record);
    }
    page.resize(528, 0xFF);
    page
}

/// Everything a scripted transport saw, shared with the test.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct TransportLog {
    pub opened: usize,
    pub closed: usize,
    pub written: Vec<Vec<u8>>,
    pub reads: Vec<usize>,
}

/// In-memory transport replaying canned receiver output.
#[allow(dead_code)]
pub struct ScriptedTransport {
    rx: VecDeque<u8>,
    log: Arc<Mutex<TransportLog>>,
    fail_open: bool,
    read_delay: Option<Duration>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn new<I: IntoIterator<Item = Vec<u8>>>(responses: I) -> Self {
        Self {
            rx: responses.into_iter().flatten().collect(),
            log: Arc::new(Mutex::new(TransportLog::default())),
            fail_open: false,
            read_delay: None,
        }
    }

    pub fn failing_open() -> Self {
        let mut transport = Self::new(Vec::<Vec<u8>>::new());
        transport.fail_open = true;
        transport
    }

    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    pub fn log(&self) -> Arc<Mutex<TransportLog>> {
        Arc::clone(&self.log)
    }

    pub fn remaining(&self) -> usize {
        self.rx.len()
    }
}

impl Transport for ScriptedTransport {
    fn open(&mut self) -> Result<(), G4Error> {
        if self.fail_open {
            return Err(G4Error::Transport(io::Error::new(io::ErrorKind::NotFound, "no such port")));
        }
        self.log.lock().unwrap().opened += 1;
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), G4Error> {
        self.log.lock().unwrap().written.push(bytes.to_vec());
        Ok(())
    }

    fn read_exact(&mut self, len: usize) -> Result<Bytes, G4Error> {
        if let Some(delay) = self.read_delay {
            std::thread::sleep(delay);
        }
        self.log.lock().unwrap().reads.push(len);
        if self.rx.len() < len {
            return Err(G4Error::Transport(io::Error::new(
                io::ErrorKind::TimedOut,
                "receiver stopped sending",
            )));
        }
        Ok(self.rx.drain(..len).collect())
    }

    fn close(&mut self) -> Result<(), G4Error> {
        self.log.lock().unwrap().closed += 1;
        Ok(())
    }
}
