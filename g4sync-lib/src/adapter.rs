use crate::constants::{INSULIN_UNIT_SCALE, UNAVAILABLE_INSULIN_NAME};
use crate::model::{
    DeviceInfo, ExerciseSession, FoodEvent, GlucoseRead, GlucoseUnit, InsulinInjection, InsulinType, Intensity,
    SyncData,
};
use crate::records::{ExerciseIntensity, GlucoseReadRecord, ManufacturingParameters, UserEventRecord, UserEventType};
use crate::time::{to_instant, to_local};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Raw records fetched from the receiver in one sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverSyncData {
    pub glucose_reads: Vec<GlucoseReadRecord>,
    pub user_events: Vec<UserEventRecord>,
    pub manufacturing_parameters: ManufacturingParameters,
    pub as_of: DateTime<Utc>,
}

/// Turn raw receiver records into domain events. Order within each category
/// follows the receiver's record order.
pub fn adapt(source: &ReceiverSyncData) -> SyncData {
    let glucose_reads: Vec<GlucoseRead> = source.glucose_reads.iter().filter_map(glucose_read).collect();
    debug!(
        total = source.glucose_reads.len(),
        kept = glucose_reads.len(),
        "Filtered glucose records"
    );

    let mut insulin_injections = Vec::new();
    let mut food_events = Vec::new();
    let mut exercise_sessions = Vec::new();
    for event in &source.user_events {
        match event.event_type {
            UserEventType::Insulin => insulin_injections.push(insulin_injection(event)),
            UserEventType::Carbs => food_events.push(food_event(event)),
            UserEventType::Exercise => exercise_sessions.push(exercise_session(event)),
            UserEventType::Health | UserEventType::Null | UserEventType::MaxValue => {}
        }
    }

    SyncData {
        glucose_reads,
        insulin_injections,
        food_events,
        exercise_sessions,
        device_info: device_info(&source.manufacturing_parameters),
        as_of: source.as_of,
    }
}

fn glucose_read(record: &GlucoseReadRecord) -> Option<GlucoseRead> {
    let value = record.glucose_value();
    if !value.is_valid() {
        return None;
    }
    Some(GlucoseRead {
        internal_time: to_instant(record.internal_seconds),
        local_time: to_local(record.local_seconds),
        value: value.magnitude() as f32,
        unit: GlucoseUnit::MgPerDl,
    })
}

fn insulin_injection(event: &UserEventRecord) -> InsulinInjection {
    InsulinInjection {
        internal_time: to_instant(event.internal_seconds),
        recorded_local_time: to_local(event.local_seconds),
        event_local_time: to_local(event.event_seconds),
        unit_value: event.event_value as f32 / INSULIN_UNIT_SCALE,
        insulin_type: InsulinType::Unknown,
        insulin_name: UNAVAILABLE_INSULIN_NAME.to_string(),
    }
}

fn food_event(event: &UserEventRecord) -> FoodEvent {
    FoodEvent {
        internal_time: to_instant(event.internal_seconds),
        recorded_local_time: to_local(event.local_seconds),
        event_local_time: to_local(event.event_seconds),
        carbohydrates: event.event_value as f32,
        proteins: 0.0,
    }
}

fn exercise_session(event: &UserEventRecord) -> ExerciseSession {
    let intensity = match event.exercise_intensity() {
        Some(ExerciseIntensity::Light) => Intensity::Light,
        Some(ExerciseIntensity::Medium) => Intensity::Medium,
        Some(ExerciseIntensity::Heavy) => Intensity::Heavy,
        _ => Intensity::Unmapped,
    };
    ExerciseSession {
        internal_time: to_instant(event.internal_seconds),
        recorded_local_time: to_local(event.local_seconds),
        event_local_time: to_local(event.event_seconds),
        intensity,
        duration_minutes: event.event_value,
        description: String::new(),
    }
}

fn device_info(parameters: &ManufacturingParameters) -> DeviceInfo {
    DeviceInfo {
        serial_number: parameters.serial_number.clone(),
        hardware_id: parameters.hardware_id.clone(),
        hardware_revision: parameters.hardware_revision.clone(),
    }
}
