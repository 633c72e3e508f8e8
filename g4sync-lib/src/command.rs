use crate::error::G4Error;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::Serialize;
use strum_macros::Display;

/// Command ids understood by the receiver. Responses reuse the table: a
/// successful answer carries `Ack`, failures one of the error ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ReceiverCommand {
    Null = 0x00,
    Ack = 0x01,
    Nak = 0x02,
    InvalidCommand = 0x03,
    InvalidParam = 0x04,
    IncompletePacketReceived = 0x05,
    ReceiverError = 0x06,
    InvalidMode = 0x07,
    Ping = 0x0A,
    ReadFirmwareHeader = 0x0B,
    ReadDatabasePartitionInfo = 0x0F,
    ReadDatabasePageRange = 0x10,
    ReadDatabasePages = 0x11,
    ReadDatabasePageHeader = 0x12,
    ReadTransmitterId = 0x19,
    WriteTransmitterId = 0x1A,
    ReadLanguage = 0x1B,
    WriteLanguage = 0x1C,
    ReadDisplayTimeOffset = 0x1D,
    WriteDisplayTimeOffset = 0x1E,
    ReadRtc = 0x1F,
    ResetReceiver = 0x20,
    ReadBatteryLevel = 0x21,
    ReadSystemTime = 0x22,
    ReadSystemTimeOffset = 0x23,
    WriteSystemTime = 0x24,
    ReadGlucoseUnit = 0x25,
    WriteGlucoseUnit = 0x26,
    ReadBlindedMode = 0x27,
    WriteBlindedMode = 0x28,
    ReadClockMode = 0x29,
    WriteClockMode = 0x2A,
    ReadDeviceMode = 0x2B,
    EraseDatabase = 0x2D,
    ShutdownReceiver = 0x2E,
    WritePcParameters = 0x2F,
    ReadBatteryState = 0x30,
    ReadHardwareBoardId = 0x31,
    EnterFirmwareUpgradeMode = 0x32,
    ReadFlashPage = 0x33,
    WriteFlashPage = 0x34,
    EnterSambaAccessMode = 0x35,
    ReadFirmwareSettings = 0x36,
    ReadEnableSetUpWizardFlag = 0x37,
    WriteEnableSetUpWizardFlag = 0x38,
    ReadSetUpWizardState = 0x39,
    WriteSetUpWizardState = 0x3A,
    MaxCommand = 0x3B,
    MaxPossibleCommand = 0xFF,
}

impl ReceiverCommand {
    pub fn from_id(id: u8) -> Result<Self, G4Error> {
        Self::try_from(id).map_err(|e| G4Error::UnknownEnumValue {
            kind: "command",
            value: e.number,
        })
    }

    pub fn id(self) -> u8 {
        self.into()
    }
}

/// Partitions of the receiver database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum RecordType {
    ManufacturingData = 0x00,
    FirmwareParameterData = 0x01,
    PcSoftwareParameter = 0x02,
    SensorData = 0x03,
    EgvData = 0x04,
    CalSet = 0x05,
    Aberration = 0x06,
    InsertionTime = 0x07,
    ReceiverLogData = 0x08,
    ReceiverErrorData = 0x09,
    MeterData = 0x0A,
    UserEventData = 0x0B,
    UserSettingData = 0x0C,
    MaxValue = 0x0D,
}

impl RecordType {
    pub fn from_id(id: u8) -> Result<Self, G4Error> {
        Self::try_from(id).map_err(|e| G4Error::UnknownEnumValue {
            kind: "record type",
            value: e.number,
        })
    }

    pub fn id(self) -> u8 {
        self.into()
    }
}
