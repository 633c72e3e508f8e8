use crate::command::RecordType;
use crate::constants::{PAGE_DATA_SIZE, PAGE_HEADER_SIZE, PAGE_SIZE};
use crate::crc::checksum;
use crate::error::G4Error;
use bytes::Bytes;
use tracing::debug;
use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// On-wire layout of the 28-byte page header.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct PageHeaderRaw {
    pub first_record_index: U32,
    pub number_of_records: U32,
    pub record_type: u8,
    pub revision: u8,
    pub page_number: U32,
    pub reserved2: U32,
    pub reserved3: U32,
    pub reserved4: U32,
    pub crc: U16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    pub first_record_index: u32,
    pub number_of_records: u32,
    pub record_type: RecordType,
    pub revision: u8,
    pub page_number: u32,
    pub reserved: [u32; 3],
    pub crc: u16,
}

impl PageHeader {
    /// Parse and CRC-check a header. `page_index` is the page's position in
    /// the response and only used for error reporting.
    pub fn parse(bytes: &[u8], page_index: usize) -> Result<Self, G4Error> {
        let raw = PageHeaderRaw::ref_from_bytes(bytes).map_err(|_| G4Error::CorruptPage {
            page_index,
            reason: format!("header needs {PAGE_HEADER_SIZE} bytes, got {}", bytes.len()),
        })?;

        let expected = checksum(&bytes[..PAGE_HEADER_SIZE - 2]);
        let actual = raw.crc.get();
        if expected != actual {
            return Err(G4Error::CorruptPage {
                page_index,
                reason: format!("header crc expected {expected:#06x}, received {actual:#06x}"),
            });
        }

        Ok(Self {
            first_record_index: raw.first_record_index.get(),
            number_of_records: raw.number_of_records.get(),
            record_type: RecordType::from_id(raw.record_type).map_err(|_| G4Error::CorruptPage {
                page_index,
                reason: format!("unknown record type id {:#04x}", raw.record_type),
            })?,
            revision: raw.revision,
            page_number: raw.page_number.get(),
            reserved: [raw.reserved2.get(), raw.reserved3.get(), raw.reserved4.get()],
            crc: actual,
        })
    }
}

/// One database page: a validated header and its 500 opaque data bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabasePage {
    pub index: usize,
    pub header: PageHeader,
    pub data: Bytes,
}

/// Split a "read database pages" payload into pages.
pub fn decode_pages(payload: &Bytes) -> Result<Vec<DatabasePage>, G4Error> {
    let mut pages = Vec::with_capacity(payload.len() / PAGE_SIZE);
    let mut offset = 0;
    while offset < payload.len() {
        let index = pages.len();
        let available = payload.len() - offset;
        if available < PAGE_SIZE {
            return Err(G4Error::CorruptPage {
                page_index: index,
                reason: format!("{available} bytes left, a page needs {PAGE_SIZE}"),
            });
        }

        let header_bytes = &payload[offset..offset + PAGE_HEADER_SIZE];
        debug!(page = index, bytes = %hex::encode(header_bytes), "Parsing page header");
        let header = PageHeader::parse(header_bytes, index)?;
        let data = payload.slice(offset + PAGE_HEADER_SIZE..offset + PAGE_SIZE);
        pages.push(DatabasePage { index, header, data });
        offset += PAGE_SIZE;
    }
    Ok(pages)
}

/// A fixed-length record packed in the data region of a page.
pub trait PageRecord: Sized {
    const RECORD_TYPE: RecordType;
    const LENGTH: usize;

    fn parse_record(bytes: &[u8], header: &PageHeader, record_number: u64) -> Result<Self, G4Error>;
}

impl DatabasePage {
    /// Decode the `number_of_records` records held by this page, numbering
    /// them from the header's first record index.
    pub fn records<R: PageRecord>(&self) -> Result<Vec<R>, G4Error> {
        self.expect_record_type(R::RECORD_TYPE)?;

        let count = self.header.number_of_records as usize;
        let needed = count.saturating_mul(R::LENGTH);
        if needed > PAGE_DATA_SIZE {
            return Err(G4Error::CorruptPage {
                page_index: self.index,
                reason: format!(
                    "{count} records of {} bytes do not fit in {PAGE_DATA_SIZE} bytes",
                    R::LENGTH
                ),
            });
        }

        debug!(page = self.header.page_number, count, "Parsing records");
        self.data[..needed]
            .chunks_exact(R::LENGTH)
            .enumerate()
            .map(|(i, bytes)| {
                let record_number = self.header.first_record_index as u64 + i as u64;
                R::parse_record(bytes, &self.header, record_number)
            })
            .collect()
    }

    pub fn expect_record_type(&self, record_type: RecordType) -> Result<(), G4Error> {
        if self.header.record_type != record_type {
            return Err(G4Error::CorruptPage {
                page_index: self.index,
                reason: format!("expected {record_type} page, got {}", self.header.record_type),
            });
        }
        Ok(())
    }
}

/// Decode every record of every page, in page order.
pub fn decode_records<R: PageRecord>(pages: &[DatabasePage]) -> Result<Vec<R>, G4Error> {
    let mut records = Vec::new();
    for page in pages {
        records.extend(page.records::<R>()?);
    }
    Ok(records)
}
