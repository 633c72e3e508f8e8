//! Conversion from the receiver's second counters to calendar time.
//!
//! Every timestamp on the wire counts seconds since the device epoch,
//! 2009-01-01T00:00:00Z.

use crate::constants::DEVICE_EPOCH_UNIX_SECONDS;
use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};

pub fn device_epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH + TimeDelta::seconds(DEVICE_EPOCH_UNIX_SECONDS)
}

/// Absolute instant of a device timestamp.
pub fn to_instant(seconds: u32) -> DateTime<Utc> {
    device_epoch() + TimeDelta::seconds(seconds as i64)
}

/// Wall-clock reading of a device timestamp, without any zone attached.
///
/// The receiver stores local time as another counter from the same epoch, so
/// the calendar fields are read off as if the instant were UTC.
pub fn to_local(seconds: u32) -> NaiveDateTime {
    to_instant(seconds).naive_utc()
}
