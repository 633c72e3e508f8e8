use crate::adapter::ReceiverSyncData;
use crate::command::{ReceiverCommand, RecordType};
use crate::error::G4Error;
use crate::frame::InboundFrame;
use crate::message::{Command, FirmwareHeader, parse_page_range};
use crate::page::{DatabasePage, PageRecord, decode_pages};
use crate::planner::{PageRange, ReadRequestSpec};
use crate::records::{GlucoseReadRecord, ManufacturingParameters, UserEventRecord};
use crate::transport::Transport;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use strum_macros::Display;
use tracing::{debug, error, info, warn};

/// Progress of a sync. `Failed` is terminal and reachable from any step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SyncState {
    Idle,
    PortOpened,
    IdentityRead,
    GlucoseRangeKnown,
    GlucoseFetched,
    EventsRangeKnown,
    EventsFetched,
    Done,
    Failed,
}

/// A G4 receiver on the other end of a transport.
///
/// Every exchange is a single request followed by a single response; the
/// receiver never has two requests outstanding.
pub struct Receiver<T: Transport> {
    transport: T,
    state: SyncState,
}

impl<T: Transport> Receiver<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: SyncState::Idle,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    fn transition(&mut self, next: SyncState) {
        debug!("Sync state {} -> {}", self.state, next);
        self.state = next;
    }

    /// Send a command frame to the receiver
    pub fn send(&mut self, command: Command) -> Result<(), G4Error> {
        let frame = command.to_frame()?;
        debug!(bytes = %hex::encode(frame.as_bytes()), "Sending {}", command);
        self.transport.write_all(frame.as_bytes())
    }

    /// Receive one response frame from the receiver
    pub fn receive(&mut self) -> Result<InboundFrame, G4Error> {
        let frame = InboundFrame::read_from(&mut self.transport)?;
        debug!("Received {} with {} byte payload", frame.command, frame.payload.len());
        Ok(frame)
    }

    /// Send a command and return the payload of its Ack.
    fn transact(&mut self, command: Command) -> Result<Bytes, G4Error> {
        self.send(command)?;
        let frame = self.receive()?;
        if frame.command != ReceiverCommand::Ack {
            return Err(G4Error::Rejected {
                command: frame.command.to_string(),
            });
        }
        Ok(frame.payload)
    }

    /// Run `f` with the transport open, closing it afterwards whatever `f` returned.
    pub fn with_open_port<R>(&mut self, f: impl FnOnce(&mut Self) -> Result<R, G4Error>) -> Result<R, G4Error> {
        let result = self.transport.open().and_then(|()| f(self));
        let closed = self.transport.close();
        let value = result?;
        closed?;
        Ok(value)
    }

    pub fn ping(&mut self) -> Result<(), G4Error> {
        self.transact(Command::Ping)?;
        Ok(())
    }

    /// Legacy firmware check. Returns whether the receiver acknowledged it.
    pub fn is_firmware(&mut self) -> Result<bool, G4Error> {
        self.send(Command::IsFirmware)?;
        let frame = self.receive()?;
        Ok(frame.command == ReceiverCommand::Ack)
    }

    pub fn read_firmware_header(&mut self) -> Result<FirmwareHeader, G4Error> {
        let payload = self.transact(Command::ReadFirmwareHeader)?;
        let header = FirmwareHeader::from_payload(&payload)?;
        info!(
            "Receiver {} running firmware {}",
            header.product_name, header.firmware_version
        );
        Ok(header)
    }

    pub fn read_page_range(&mut self, record_type: RecordType) -> Result<PageRange, G4Error> {
        let payload = self.transact(Command::ReadDatabasePageRange(record_type))?;
        let range = parse_page_range(&payload)?;
        info!("Page range for {}: [{}] to [{}]", record_type, range.first(), range.last());
        Ok(range)
    }

    /// Read up to four pages of one partition.
    pub fn read_pages(
        &mut self,
        record_type: RecordType,
        request: ReadRequestSpec,
    ) -> Result<Vec<DatabasePage>, G4Error> {
        let payload = self.transact(Command::ReadDatabasePages { record_type, request })?;
        let pages = decode_pages(&payload)?;
        for page in &pages {
            page.expect_record_type(record_type)?;
        }
        Ok(pages)
    }

    /// Fetch every record of type `R` in `range`.
    pub fn read_records_in<R: PageRecord>(&mut self, range: PageRange) -> Result<Vec<R>, G4Error> {
        let mut records = Vec::new();
        for request in range.chunks() {
            for page in self.read_pages(R::RECORD_TYPE, request)? {
                records.extend(page.records::<R>()?);
            }
        }
        info!("Read {} {} records", records.len(), R::RECORD_TYPE);
        Ok(records)
    }

    /// Fetch the full partition holding records of type `R`.
    pub fn read_records<R: PageRecord>(&mut self) -> Result<Vec<R>, G4Error> {
        let range = self.read_page_range(R::RECORD_TYPE)?;
        self.read_records_in(range)
    }

    /// Read the manufacturing partition. When several pages are present the
    /// last one read wins.
    pub fn read_manufacturing_parameters(&mut self) -> Result<ManufacturingParameters, G4Error> {
        let range = self.read_page_range(RecordType::ManufacturingData)?;
        let mut latest = None;
        for request in range.chunks() {
            for page in self.read_pages(RecordType::ManufacturingData, request)? {
                let parameters = ManufacturingParameters::from_page(&page)?;
                if let Some(previous) = latest.replace(parameters) {
                    warn!(
                        "Multiple manufacturing pages, replacing serial {} with page {}",
                        previous.serial_number, page.header.page_number
                    );
                }
            }
        }
        latest.ok_or_else(|| G4Error::Protocol("receiver returned no manufacturing data page".to_string()))
    }

    /// Fetch identity, glucose history and user events in one pass.
    ///
    /// The transport is closed on every exit path. Any error aborts the whole
    /// sync; nothing read so far is returned.
    pub fn sync(&mut self, as_of: DateTime<Utc>) -> Result<ReceiverSyncData, G4Error> {
        info!("Starting receiver sync");
        self.transition(SyncState::Idle);
        match self.with_open_port(|receiver| receiver.fetch(as_of)) {
            Ok(data) => {
                self.transition(SyncState::Done);
                info!(
                    "Sync done: {} glucose records, {} user events",
                    data.glucose_reads.len(),
                    data.user_events.len()
                );
                Ok(data)
            }
            Err(e) => {
                error!("Sync failed in state {}: {}", self.state, e);
                self.transition(SyncState::Failed);
                Err(e)
            }
        }
    }

    fn fetch(&mut self, as_of: DateTime<Utc>) -> Result<ReceiverSyncData, G4Error> {
        self.transition(SyncState::PortOpened);

        let manufacturing_parameters = self.read_manufacturing_parameters()?;
        info!("Receiver serial number {}", manufacturing_parameters.serial_number);
        self.transition(SyncState::IdentityRead);

        let glucose_range = self.read_page_range(RecordType::EgvData)?;
        self.transition(SyncState::GlucoseRangeKnown);
        let glucose_reads = self.read_records_in::<GlucoseReadRecord>(glucose_range)?;
        self.transition(SyncState::GlucoseFetched);

        let event_range = self.read_page_range(RecordType::UserEventData)?;
        self.transition(SyncState::EventsRangeKnown);
        let user_events = self.read_records_in::<UserEventRecord>(event_range)?;
        self.transition(SyncState::EventsFetched);

        Ok(ReceiverSyncData {
            glucose_reads,
            user_events,
            manufacturing_parameters,
            as_of,
        })
    }
}
