use crate::constants::MAX_PAGES_PER_COMMAND;
use crate::error::G4Error;

/// One "read database pages" request: up to four consecutive pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReadRequestSpec {
    start_page: u64,
    page_count: u8,
}

impl ReadRequestSpec {
    pub fn new(start_page: u64, page_count: u8) -> Result<Self, G4Error> {
        if page_count == 0 || page_count > MAX_PAGES_PER_COMMAND {
            return Err(G4Error::PageCountOutOfRange(page_count));
        }
        Ok(Self {
            start_page,
            page_count,
        })
    }

    pub fn start_page(&self) -> u64 {
        self.start_page
    }

    pub fn page_count(&self) -> u8 {
        self.page_count
    }

    /// Last page covered, inclusive.
    pub fn end_page(&self) -> u64 {
        self.start_page.saturating_add(self.page_count as u64 - 1)
    }

    /// Start page narrowed to the 32-bit field used on the wire.
    pub fn wire_start_page(&self) -> Result<u32, G4Error> {
        u32::try_from(self.start_page).map_err(|_| G4Error::PageNumberOverflow(self.start_page))
    }
}

/// Inclusive range of database pages reported by the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRange {
    first: u64,
    last: u64,
}

impl PageRange {
    pub fn new(first: u64, last: u64) -> Result<Self, G4Error> {
        if first > last {
            return Err(G4Error::InvalidPageRange { first, last });
        }
        Ok(Self { first, last })
    }

    pub fn first(&self) -> u64 {
        self.first
    }

    pub fn last(&self) -> u64 {
        self.last
    }

    /// Split the range into request-sized chunks. The returned iterator is
    /// lazy and can be cloned to restart from the same point.
    pub fn chunks(&self) -> PageChunks {
        PageChunks {
            cursor: Some(self.first),
            last: self.last,
        }
    }
}

impl IntoIterator for PageRange {
    type Item = ReadRequestSpec;
    type IntoIter = PageChunks;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks()
    }
}

#[derive(Debug, Clone)]
pub struct PageChunks {
    cursor: Option<u64>,
    last: u64,
}

impl Iterator for PageChunks {
    type Item = ReadRequestSpec;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor?;
        let remaining = self.last - cursor;
        let page_count = if remaining >= MAX_PAGES_PER_COMMAND as u64 {
            MAX_PAGES_PER_COMMAND
        } else {
            remaining as u8 + 1
        };
        // None once past `last`, including when `last` is u64::MAX
        self.cursor = cursor
            .checked_add(page_count as u64)
            .filter(|next| *next <= self.last);
        Some(ReadRequestSpec {
            start_page: cursor,
            page_count,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.cursor {
            Some(cursor) => {
                let chunks = (self.last - cursor) / MAX_PAGES_PER_COMMAND as u64 + 1;
                let n = usize::try_from(chunks).unwrap_or(usize::MAX);
                (n, usize::try_from(chunks).ok())
            }
            None => (0, Some(0)),
        }
    }
}

impl std::iter::FusedIterator for PageChunks {}
