// Protocol constants for the G4 receiver

use std::time::Duration;

/// Start-of-frame marker, first byte of every frame in both directions
pub const SOF: u8 = 0x01;

/// Size of the inbound frame header: sof, size (2 bytes), command id
pub const FRAME_HEADER_SIZE: usize = 4;

/// Size of the CRC trailer closing every frame
pub const FRAME_TRAILER_SIZE: usize = 2;

/// Header plus trailer, the size of a frame with an empty payload
pub const FRAME_ENVELOPE_SIZE: usize = FRAME_HEADER_SIZE + FRAME_TRAILER_SIZE;

/// Size of the CRC16 field embedded in pages and records
pub const CRC16_SIZE: usize = 2;

/// Size of a database page header (28 bytes, CRC over the first 26)
pub const PAGE_HEADER_SIZE: usize = 28;

/// Size of a database page data region
pub const PAGE_DATA_SIZE: usize = 500;

/// A full page as transferred by ReadDatabasePages
pub const PAGE_SIZE: usize = PAGE_HEADER_SIZE + PAGE_DATA_SIZE;

/// Protocol hard limit on pages per ReadDatabasePages request
pub const MAX_PAGES_PER_COMMAND: u8 = 4;

/// Size of a glucose (EGV) record
pub const GLUCOSE_RECORD_SIZE: usize = 13;

/// Size of a user event record
pub const USER_EVENT_RECORD_SIZE: usize = 20;

/// Leading system/display time pair in front of the manufacturing XML
pub const MANUFACTURING_TIME_PREFIX_SIZE: usize = 8;

/// Glucose flag: reading is for on-device display only
pub const GLUCOSE_DISPLAY_ONLY_MASK: u16 = 0x8000;

/// Glucose magnitude bits
pub const GLUCOSE_VALUE_MASK: u16 = 0x03FF;

/// Reserved glucose magnitudes standing for sensor and range errors
pub const SPECIAL_GLUCOSE_VALUES: [u16; 9] = [0, 1, 2, 3, 5, 6, 9, 10, 12];

/// Serial line speed of the receiver in firmware mode
pub const FIRMWARE_BAUD_RATE: u32 = 0x9600;

/// Wall-clock budget of the liveness probe
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default read timeout for a regular sync exchange
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Insulin event values are stored in hundredths of a unit
pub const INSULIN_UNIT_SCALE: f32 = 100.0;

/// Insulin name used when the receiver does not record one
pub const UNAVAILABLE_INSULIN_NAME: &str = "N/A";

/// Device epoch, 2009-01-01T00:00:00Z, as seconds since the Unix epoch
pub const DEVICE_EPOCH_UNIX_SECONDS: i64 = 1_230_768_000;
