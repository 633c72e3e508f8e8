//! Device-independent sync results handed to exporters.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum GlucoseUnit {
    #[strum(to_string = "mg/dL")]
    #[serde(rename = "mg/dL")]
    MgPerDl,
    #[strum(to_string = "mmol/L")]
    #[serde(rename = "mmol/L")]
    MmolPerL,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlucoseRead {
    pub internal_time: DateTime<Utc>,
    pub local_time: NaiveDateTime,
    pub value: f32,
    pub unit: GlucoseUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum InsulinType {
    SlowActing,
    FastActing,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsulinInjection {
    pub internal_time: DateTime<Utc>,
    pub recorded_local_time: NaiveDateTime,
    pub event_local_time: NaiveDateTime,
    pub unit_value: f32,
    pub insulin_type: InsulinType,
    pub insulin_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodEvent {
    pub internal_time: DateTime<Utc>,
    pub recorded_local_time: NaiveDateTime,
    pub event_local_time: NaiveDateTime,
    pub carbohydrates: f32,
    pub proteins: f32,
}

/// Exercise intensity. `Unmapped` marks a subtype the receiver reported that
/// has no named level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum Intensity {
    Light,
    Medium,
    Heavy,
    Unmapped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseSession {
    pub internal_time: DateTime<Utc>,
    pub recorded_local_time: NaiveDateTime,
    pub event_local_time: NaiveDateTime,
    pub intensity: Intensity,
    pub duration_minutes: u32,
    pub description: String,
}

impl ExerciseSession {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_minutes as u64 * 60)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub serial_number: String,
    pub hardware_id: String,
    pub hardware_revision: String,
}

/// Everything one sync produced, as of the instant the sync ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncData {
    pub glucose_reads: Vec<GlucoseRead>,
    pub insulin_injections: Vec<InsulinInjection>,
    pub food_events: Vec<FoodEvent>,
    pub exercise_sessions: Vec<ExerciseSession>,
    pub device_info: DeviceInfo,
    pub as_of: DateTime<Utc>,
}

/// An event stamped with the receiver's internal clock.
pub trait TimestampedEvent {
    fn internal_time(&self) -> DateTime<Utc>;
}

macro_rules! impl_timestamped {
    ($($ty:ty),*) => {
        $(impl TimestampedEvent for $ty {
            fn internal_time(&self) -> DateTime<Utc> {
                self.internal_time
            }
        })*
    };
}

impl_timestamped!(GlucoseRead, InsulinInjection, FoodEvent, ExerciseSession);

/// Sort events newest first. Equal timestamps keep their relative order.
pub fn sort_newest_first<T: TimestampedEvent>(events: &mut [T]) {
    events.sort_by(|a, b| b.internal_time().cmp(&a.internal_time()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{to_instant, to_local};

    fn read(seconds: u32, value: f32) -> GlucoseRead {
        GlucoseRead {
            internal_time: to_instant(seconds),
            local_time: to_local(seconds),
            value,
            unit: GlucoseUnit::MgPerDl,
        }
    }

    #[test]
    fn newest_first_ordering() {
        let mut reads = vec![read(10, 1.0), read(30, 2.0), read(20, 3.0), read(30, 4.0)];
        sort_newest_first(&mut reads);
        let values: Vec<f32> = reads.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![2.0, 4.0, 3.0, 1.0]);
    }

    #[test]
    fn exercise_duration_in_minutes() {
        let session = ExerciseSession {
            internal_time: to_instant(0),
            recorded_local_time: to_local(0),
            event_local_time: to_local(0),
            intensity: Intensity::Light,
            duration_minutes: 45,
            description: String::new(),
        };
        assert_eq!(session.duration(), Duration::from_secs(45 * 60));
    }

    #[test]
    fn unit_serializes_as_symbol() {
        assert_eq!(serde_json::to_string(&GlucoseUnit::MgPerDl).unwrap(), "\"mg/dL\"");
        assert_eq!(GlucoseUnit::MgPerDl.to_string(), "mg/dL");
    }
}
