use crate::command::{ReceiverCommand, RecordType};
use crate::error::G4Error;
use crate::frame::{FrameBuilder, OutboundFrame};
use crate::planner::{PageRange, ReadRequestSpec};
use serde::Deserialize;
use std::fmt;
use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Header bytes of the legacy "am I firmware" probe. Older firmware expects
/// this literal rather than a size-prefixed frame.
const IS_FIRMWARE_PREAMBLE: [u8; 4] = [0x01, 0x1B, 0x00, 0x00];

/// Requests the sync flow sends to the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping,
    IsFirmware,
    ReadFirmwareHeader,
    ReadDatabasePageRange(RecordType),
    ReadDatabasePages {
        record_type: RecordType,
        request: ReadRequestSpec,
    },
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Ping => write!(f, "Ping"),
            Command::IsFirmware => write!(f, "IsFirmware"),
            Command::ReadFirmwareHeader => write!(f, "ReadFirmwareHeader"),
            Command::ReadDatabasePageRange(record_type) => write!(f, "ReadDatabasePageRange({record_type})"),
            Command::ReadDatabasePages { record_type, request } => write!(
                f,
                "ReadDatabasePages({record_type}, start={}, count={})",
                request.start_page(),
                request.page_count()
            ),
        }
    }
}

impl Command {
    pub fn to_frame(&self) -> Result<OutboundFrame, G4Error> {
        match *self {
            Command::Ping => FrameBuilder::new(ReceiverCommand::Ping).finish(),
            Command::IsFirmware => Ok(OutboundFrame::seal(&IS_FIRMWARE_PREAMBLE)),
            Command::ReadFirmwareHeader => FrameBuilder::new(ReceiverCommand::ReadFirmwareHeader).finish(),
            Command::ReadDatabasePageRange(record_type) => FrameBuilder::new(ReceiverCommand::ReadDatabasePageRange)
                .with_u8(record_type.id())
                .finish(),
            Command::ReadDatabasePages { record_type, request } => {
                FrameBuilder::new(ReceiverCommand::ReadDatabasePages)
                    .with_u8(record_type.id())
                    .with_u32_le(request.wire_start_page()?)
                    .with_u8(request.page_count())
                    .finish()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct PageRangeRaw {
    first_page: U32,
    last_page: U32,
}

/// Decode the payload of a page range response.
pub fn parse_page_range(payload: &[u8]) -> Result<PageRange, G4Error> {
    let raw = PageRangeRaw::ref_from_bytes(payload).map_err(|_| G4Error::InvalidLength {
        expected: size_of::<PageRangeRaw>(),
        actual: payload.len(),
    })?;
    PageRange::new(raw.first_page.get() as u64, raw.last_page.get() as u64)
}

/// Identity block returned by `ReadFirmwareHeader`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FirmwareHeader {
    #[serde(rename = "@SchemaVersion")]
    pub schema_version: String,
    #[serde(rename = "@ApiVersion")]
    pub api_version: String,
    #[serde(rename = "@TestApiVersion")]
    pub test_api_version: String,
    #[serde(rename = "@ProductId")]
    pub product_id: String,
    #[serde(rename = "@ProductName")]
    pub product_name: String,
    #[serde(rename = "@SoftwareNumber")]
    pub software_number: String,
    #[serde(rename = "@FirmwareVersion")]
    pub firmware_version: String,
    #[serde(rename = "@PortVersion")]
    pub port_version: String,
    #[serde(rename = "@RFVersion")]
    pub rf_version: String,
    #[serde(rename = "@DexBootVersion")]
    pub dex_boot_version: String,
}

impl FirmwareHeader {
    pub fn from_payload(payload: &[u8]) -> Result<Self, G4Error> {
        let xml = String::from_utf8(payload.to_vec())?;
        Ok(quick_xml::de::from_str(xml.trim_end_matches('\0'))?)
    }
}
