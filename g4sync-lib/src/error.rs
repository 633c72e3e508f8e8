use std::io;
use std::string::FromUtf8Error;
use strum_macros::Display;
use thiserror::Error;

/// Which CRC-protected structure failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CrcScope {
    #[strum(to_string = "frame")]
    Frame,
    #[strum(to_string = "page payload")]
    PagePayload,
}

/// The primary error type for the `g4sync-lib` library.
#[derive(Error, Debug)]
pub enum G4Error {
    #[error("Receiver not found. Is the G4 receiver connected?")]
    ReceiverNotFound,

    #[error("Found {candidates} candidate port(s) but none identified as the receiver")]
    NoMatchingReceiver { candidates: usize },

    #[error("Bad start-of-frame marker at offset {offset}: got {found:#04x}")]
    Framing { offset: usize, found: u8 },

    #[error("Invalid {scope} crc at offset {offset}: expected {expected:#06x}, received {actual:#06x}")]
    Checksum {
        scope: CrcScope,
        offset: usize,
        expected: u16,
        actual: u16,
    },

    #[error("Corrupt page #{page_index}: {reason}")]
    CorruptPage { page_index: usize, reason: String },

    #[error("Corrupt record #{record_number}: crc expected {expected:#06x}, received {actual:#06x}")]
    CorruptRecord {
        record_number: u64,
        expected: u16,
        actual: u16,
    },

    #[error("Unknown {kind} id {value:#04x}")]
    UnknownEnumValue { kind: &'static str, value: u8 },

    #[error("Record #{record_number} has unknown {kind} id {value:#04x}")]
    UnknownRecordField {
        record_number: u64,
        kind: &'static str,
        value: u8,
    },

    #[error("Page count {0} out of range, a request covers 1 to 4 pages")]
    PageCountOutOfRange(u8),

    #[error("Invalid page range: first page {first} is after last page {last}")]
    InvalidPageRange { first: u64, last: u64 },

    #[error("Page number {0} does not fit the 32-bit wire field")]
    PageNumberOverflow(u64),

    #[error("Receiver answered with {command} instead of Ack")]
    Rejected { command: String },

    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("Timeout while probing the receiver: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("Malformed XML payload: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("Payload is not valid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),

    #[error("Failed to write export: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid port name pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid last sync state: {0}")]
    InvalidSyncState(String),
}

impl G4Error {
    /// Errors that mean the bytes on the wire cannot be trusted.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            G4Error::Framing { .. }
                | G4Error::Checksum { .. }
                | G4Error::CorruptPage { .. }
                | G4Error::CorruptRecord { .. }
                | G4Error::UnknownRecordField { .. }
        )
    }
}
