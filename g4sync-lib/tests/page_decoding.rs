//! Tests for database page and record decoding

mod common;

use common::*;
use g4sync_lib::constants::{GLUCOSE_DISPLAY_ONLY_MASK, GLUCOSE_VALUE_MASK};
use g4sync_lib::page::{decode_pages, decode_records};
use g4sync_lib::records::{GlucoseReadRecord, GlucoseValue, ManufacturingParameters, UserEventRecord, UserEventType};
use proptest::prelude::*;

#[test]
fn test_captured_manufacturing_page() {
    let frame = InboundFrame::try_from(Bytes::from(captured_manufacturing_response())).unwrap();
    let pages = decode_pages(&frame.payload).unwrap();
    assert_eq!(pages.len(), 1);

    let page = &pages[0];
    assert_eq!(page.header.record_type, RecordType::ManufacturingData);
    assert_eq!(page.header.number_of_records, 1);
    assert_eq!(page.header.crc, 0x7D3A);

    let parameters = ManufacturingParameters::from_page(page).unwrap();
    assert_eq!(parameters.serial_number, "sm30140752");
    assert_eq!(parameters.hardware_part_number, "MD1060-MT20649");
    assert_eq!(parameters.hardware_revision, "14");
    assert_eq!(parameters.date_time_created, "2013-01-03 13:54:05.536 -08:00");
    assert_eq!(parameters.hardware_id, "{75B7C886-FE10-420F-B511-2D3F9B9BEE7E}");
}

#[test]
fn test_manufacturing_page_with_bad_xml() {
    let mut data = vec![0u8; 8];
    data.extend_from_slice(b"<ManufacturingParameters SerialNumber=\"x\"");
    data.resize(498, 0);
    let crc = checksum(&data);
    data.extend(crc.to_le_bytes());
    let mut bytes = page(RecordType::ManufacturingData, 0, 0, &[]);
    bytes[28..].copy_from_slice(&data);

    let pages = decode_pages(&Bytes::from(bytes)).unwrap();
    assert!(matches!(
        ManufacturingParameters::from_page(&pages[0]),
        Err(G4Error::Xml(_))
    ));
}

#[test]
fn test_glucose_records_across_pages() {
    let mut payload = page(
        RecordType::EgvData,
        100,
        7,
        &[glucose_record(1000, 900, 120, 0x11), glucose_record(1300, 1200, 0x800D, 0x11)],
    );
    payload.extend(page(RecordType::EgvData, 102, 8, &[glucose_record(1600, 1500, 83, 0x12)]));

    let pages = decode_pages(&Bytes::from(payload)).unwrap();
    let records: Vec<GlucoseReadRecord> = decode_records(&pages).unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(
        records.iter().map(|r| (r.record_number, r.page_number)).collect::<Vec<_>>(),
        vec![(100, 7), (101, 7), (102, 8)]
    );
    assert_eq!(records[1].glucose_raw, 0x800D);
    assert!(records[1].glucose_value().display_only());
    assert_eq!(records[2].local_seconds, 1500);
}

#[test]
fn test_corrupt_record_aborts_page() {
    let mut bad = glucose_record(1000, 900, 120, 0);
    bad[0] ^= 0x01;
    let payload = page(RecordType::EgvData, 50, 1, &[glucose_record(1, 1, 100, 0), bad]);

    let pages = decode_pages(&Bytes::from(payload)).unwrap();
    assert!(matches!(
        decode_records::<GlucoseReadRecord>(&pages),
        Err(G4Error::CorruptRecord { record_number: 51, .. })
    ));
}

#[test]
fn test_user_event_page() {
    let payload = page(
        RecordType::UserEventData,
        0,
        3,
        &[
            user_event_record(10, 20, 1, 0, 30, 45),
            user_event_record(11, 21, 2, 0, 31, 350),
            user_event_record(12, 22, 3, 1, 32, 0),
            user_event_record(13, 23, 4, 3, 33, 60),
        ],
    );

    let pages = decode_pages(&Bytes::from(payload)).unwrap();
    let events: Vec<UserEventRecord> = decode_records(&pages).unwrap();

    assert_eq!(
        events.iter().map(|e| e.event_type).collect::<Vec<_>>(),
        vec![
            UserEventType::Carbs,
            UserEventType::Insulin,
            UserEventType::Health,
            UserEventType::Exercise
        ]
    );
    assert_eq!(events[1].event_value, 350);
    assert_eq!(events[3].event_subtype, 3);
}

#[test]
fn test_unknown_event_type_reports_record_number() {
    let payload = page(
        RecordType::UserEventData,
        500,
        3,
        &[user_event_record(10, 20, 1, 0, 30, 45), user_event_record(11, 21, 9, 0, 31, 1)],
    );

    let pages = decode_pages(&Bytes::from(payload)).unwrap();
    let err = decode_records::<UserEventRecord>(&pages).unwrap_err();

    assert!(matches!(
        err,
        G4Error::UnknownRecordField {
            record_number: 501,
            kind: "user event type",
            value: 9
        }
    ));
    assert!(err.is_corruption());
    assert!(err.to_string().contains("#501"), "{err}");
}

#[test]
fn test_unknown_record_type_reports_page_index() {
    let mut second = page(RecordType::EgvData, 0, 8, &[]);
    second[8] = 0x0E;
    let crc = checksum(&second[..26]);
    second[26..28].copy_from_slice(&crc.to_le_bytes());
    let mut payload = page(RecordType::EgvData, 0, 7, &[]);
    payload.extend(second);

    match decode_pages(&Bytes::from(payload)) {
        Err(G4Error::CorruptPage { page_index, reason }) => {
            assert_eq!(page_index, 1);
            assert!(reason.contains("unknown record type id 0x0e"), "{reason}");
        }
        other => panic!("Expected CorruptPage, got {:?}", other),
    }
}

#[test]
fn test_trailing_partial_page() {
    let mut payload = page(RecordType::EgvData, 0, 0, &[]);
    payload.extend_from_slice(&[0u8; 100]);

    match decode_pages(&Bytes::from(payload)) {
        Err(G4Error::CorruptPage { page_index, reason }) => {
            assert_eq!(page_index, 1);
            assert!(reason.contains("100 bytes left"), "{reason}");
        }
        other => panic!("Expected CorruptPage, got {:?}", other),
    }
}

proptest! {
    #[test]
    fn glucose_bitfield_agrees_with_masks(raw in any::<u16>()) {
        let value = GlucoseValue::from_raw(raw);
        prop_assert_eq!(value.magnitude(), raw & GLUCOSE_VALUE_MASK);
        prop_assert_eq!(value.display_only(), raw & GLUCOSE_DISPLAY_ONLY_MASK != 0);
    }
}
