use crate::command::RecordType;
use crate::constants::{
    CRC16_SIZE, GLUCOSE_RECORD_SIZE, MANUFACTURING_TIME_PREFIX_SIZE, SPECIAL_GLUCOSE_VALUES, USER_EVENT_RECORD_SIZE,
};
use crate::crc::checksum;
use crate::error::{CrcScope, G4Error};
use crate::page::{DatabasePage, PageHeader, PageRecord};
use modular_bitfield::prelude::*;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::Deserialize;
use strum_macros::Display;
use tracing::debug;
use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Check the trailing record CRC against the bytes before it.
fn validate_record_crc(bytes: &[u8], record_number: u64) -> Result<(), G4Error> {
    let split = bytes.len() - CRC16_SIZE;
    let expected = checksum(&bytes[..split]);
    let actual = u16::from_le_bytes([bytes[split], bytes[split + 1]]);
    if expected != actual {
        return Err(G4Error::CorruptRecord {
            record_number,
            expected,
            actual,
        });
    }
    Ok(())
}

/// The 16-bit glucose field: a 10-bit magnitude and a display-only flag.
#[bitfield(bytes = 2)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlucoseValue {
    pub magnitude: B10,
    #[skip]
    unused: B5,
    pub display_only: bool,
}

impl GlucoseValue {
    pub fn from_raw(raw: u16) -> Self {
        Self::from_bytes(raw.to_le_bytes())
    }

    /// Reserved magnitudes that encode a sensor condition, not a reading.
    pub fn is_sentinel(&self) -> bool {
        SPECIAL_GLUCOSE_VALUES.contains(&self.magnitude())
    }

    /// A reading usable as a glucose value.
    pub fn is_valid(&self) -> bool {
        !self.display_only() && !self.is_sentinel()
    }
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct GlucoseReadRecordRaw {
    internal_seconds: U32,
    local_seconds: U32,
    glucose_raw: U16,
    trend: u8,
    crc: U16,
}

/// An estimated glucose value record (EGV).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlucoseReadRecord {
    pub internal_seconds: u32,
    pub local_seconds: u32,
    pub glucose_raw: u16,
    pub trend_arrow_and_noise: u8,
    pub record_number: u64,
    pub page_number: u32,
}

impl GlucoseReadRecord {
    pub fn glucose_value(&self) -> GlucoseValue {
        GlucoseValue::from_raw(self.glucose_raw)
    }
}

impl PageRecord for GlucoseReadRecord {
    const RECORD_TYPE: RecordType = RecordType::EgvData;
    const LENGTH: usize = GLUCOSE_RECORD_SIZE;

    fn parse_record(bytes: &[u8], header: &PageHeader, record_number: u64) -> Result<Self, G4Error> {
        let raw = GlucoseReadRecordRaw::ref_from_bytes(bytes).map_err(|_| G4Error::InvalidLength {
            expected: Self::LENGTH,
            actual: bytes.len(),
        })?;
        debug!(record_number, bytes = %hex::encode(bytes), "Parsing glucose record");
        validate_record_crc(bytes, record_number)?;
        Ok(Self {
            internal_seconds: raw.internal_seconds.get(),
            local_seconds: raw.local_seconds.get(),
            glucose_raw: raw.glucose_raw.get(),
            trend_arrow_and_noise: raw.trend,
            record_number,
            page_number: header.page_number,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum UserEventType {
    Null = 0,
    Carbs = 1,
    Insulin = 2,
    Health = 3,
    Exercise = 4,
    MaxValue = 5,
}

impl UserEventType {
    pub fn from_id(id: u8) -> Result<Self, G4Error> {
        Self::try_from(id).map_err(|e| G4Error::UnknownEnumValue {
            kind: "user event type",
            value: e.number,
        })
    }
}

/// Exercise subtype ids. Other subtypes are valid on the wire and mapped by
/// the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ExerciseIntensity {
    Null = 0,
    Light = 1,
    Medium = 2,
    Heavy = 3,
    MaxValue = 4,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct UserEventRecordRaw {
    internal_seconds: U32,
    local_seconds: U32,
    event_type: u8,
    event_subtype: u8,
    event_seconds: U32,
    event_value: U32,
    crc: U16,
}

/// A user-entered event: carbs, insulin, health or exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserEventRecord {
    pub internal_seconds: u32,
    pub local_seconds: u32,
    pub event_type: UserEventType,
    pub event_subtype: u8,
    pub event_seconds: u32,
    pub event_value: u32,
}

impl UserEventRecord {
    pub fn exercise_intensity(&self) -> Option<ExerciseIntensity> {
        ExerciseIntensity::try_from(self.event_subtype).ok()
    }
}

impl PageRecord for UserEventRecord {
    const RECORD_TYPE: RecordType = RecordType::UserEventData;
    const LENGTH: usize = USER_EVENT_RECORD_SIZE;

    fn parse_record(bytes: &[u8], _header: &PageHeader, record_number: u64) -> Result<Self, G4Error> {
        let raw = UserEventRecordRaw::ref_from_bytes(bytes).map_err(|_| G4Error::InvalidLength {
            expected: Self::LENGTH,
            actual: bytes.len(),
        })?;
        debug!(record_number, bytes = %hex::encode(bytes), "Parsing user event record");
        validate_record_crc(bytes, record_number)?;
        Ok(Self {
            internal_seconds: raw.internal_seconds.get(),
            local_seconds: raw.local_seconds.get(),
            event_type: UserEventType::from_id(raw.event_type).map_err(|_| G4Error::UnknownRecordField {
                record_number,
                kind: "user event type",
                value: raw.event_type,
            })?,
            event_subtype: raw.event_subtype,
            event_seconds: raw.event_seconds.get(),
            event_value: raw.event_value.get(),
        })
    }
}

/// Factory identity of the receiver, stored as XML attributes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManufacturingParameters {
    #[serde(rename = "@SerialNumber")]
    pub serial_number: String,
    #[serde(rename = "@HardwarePartNumber")]
    pub hardware_part_number: String,
    #[serde(rename = "@HardwareRevision")]
    pub hardware_revision: String,
    #[serde(rename = "@DateTimeCreated")]
    pub date_time_created: String,
    #[serde(rename = "@HardwareId")]
    pub hardware_id: String,
}

impl ManufacturingParameters {
    /// Decode a manufacturing data page: an 8-byte time prefix, a
    /// NUL-padded XML fragment, and a CRC over everything before it.
    pub fn from_page(page: &DatabasePage) -> Result<Self, G4Error> {
        page.expect_record_type(RecordType::ManufacturingData)?;
        let data = &page.data;
        if data.len() < MANUFACTURING_TIME_PREFIX_SIZE + CRC16_SIZE {
            return Err(G4Error::CorruptPage {
                page_index: page.index,
                reason: format!("manufacturing data is only {} bytes", data.len()),
            });
        }

        let split = data.len() - CRC16_SIZE;
        let expected = checksum(&data[..split]);
        let actual = u16::from_le_bytes([data[split], data[split + 1]]);
        if expected != actual {
            return Err(G4Error::Checksum {
                scope: CrcScope::PagePayload,
                offset: split,
                expected,
                actual,
            });
        }

        let xml = String::from_utf8(data[MANUFACTURING_TIME_PREFIX_SIZE..split].to_vec())?;
        let xml = xml.trim_end_matches('\0');
        debug!(xml, "Parsing manufacturing parameters");
        Ok(quick_xml::de::from_str(xml)?)
    }
}
