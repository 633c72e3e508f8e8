use crate::command::ReceiverCommand;
use crate::constants::{FRAME_ENVELOPE_SIZE, FRAME_HEADER_SIZE, FRAME_TRAILER_SIZE, SOF};
use crate::crc::checksum;
use crate::error::{CrcScope, G4Error};
use crate::transport::Transport;
use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;
use zerocopy::byteorder::little_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// The 4-byte header opening every frame.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct FrameHeaderRaw {
    pub sof: u8,
    pub packet_size: U16,
    pub command_id: u8,
}

impl FrameHeaderRaw {
    fn parse(bytes: &[u8]) -> Result<Self, G4Error> {
        let header = FrameHeaderRaw::ref_from_bytes(bytes).map_err(|_| G4Error::InvalidLength {
            expected: FRAME_HEADER_SIZE,
            actual: bytes.len(),
        })?;
        if header.sof != SOF {
            return Err(G4Error::Framing {
                offset: 0,
                found: header.sof,
            });
        }
        if (header.packet_size.get() as usize) < FRAME_ENVELOPE_SIZE {
            return Err(G4Error::InvalidLength {
                expected: FRAME_ENVELOPE_SIZE,
                actual: header.packet_size.get() as usize,
            });
        }
        Ok(*header)
    }

    fn payload_len(&self) -> usize {
        self.packet_size.get() as usize - FRAME_ENVELOPE_SIZE
    }
}

/// A sealed command frame, ready to be written to the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    bytes: Bytes,
}

impl OutboundFrame {
    /// Append the CRC of `preamble` and freeze it as a frame.
    pub fn seal(preamble: &[u8]) -> Self {
        let mut buf = BytesMut::with_capacity(preamble.len() + FRAME_TRAILER_SIZE);
        buf.extend_from_slice(preamble);
        buf.put_u16_le(checksum(preamble));
        Self { bytes: buf.freeze() }
    }

    pub fn command_id(&self) -> u8 {
        self.bytes[3]
    }

    pub fn packet_size(&self) -> u16 {
        u16::from_le_bytes([self.bytes[1], self.bytes[2]])
    }

    /// Command specific bytes between the header and the trailer.
    pub fn content(&self) -> &[u8] {
        &self.bytes[FRAME_HEADER_SIZE..self.bytes.len() - FRAME_TRAILER_SIZE]
    }

    pub fn crc(&self) -> u16 {
        let n = self.bytes.len();
        u16::from_le_bytes([self.bytes[n - 2], self.bytes[n - 1]])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<OutboundFrame> for Bytes {
    fn from(frame: OutboundFrame) -> Self {
        frame.bytes
    }
}

/// Byte buffer a command is assembled into before it is sealed.
#[derive(Debug)]
pub struct FrameBuilder {
    buf: BytesMut,
}

impl FrameBuilder {
    pub fn new(command: ReceiverCommand) -> Self {
        let mut buf = BytesMut::with_capacity(16);
        buf.put_u8(SOF);
        // patched in finish()
        buf.put_u16_le(0);
        buf.put_u8(command.id());
        Self { buf }
    }

    pub fn with_u8(mut self, value: u8) -> Self {
        self.buf.put_u8(value);
        self
    }

    pub fn with_u32_le(mut self, value: u32) -> Self {
        self.buf.put_u32_le(value);
        self
    }

    pub fn with_slice(mut self, value: &[u8]) -> Self {
        self.buf.extend_from_slice(value);
        self
    }

    /// Write the final packet size and the CRC trailer. Fails when the frame
    /// would not fit the 16-bit size field.
    pub fn finish(mut self) -> Result<OutboundFrame, G4Error> {
        let frame_len = self.buf.len() + FRAME_TRAILER_SIZE;
        let packet_size = u16::try_from(frame_len).map_err(|_| G4Error::InvalidLength {
            expected: u16::MAX as usize,
            actual: frame_len,
        })?;
        self.buf[1..3].copy_from_slice(&packet_size.to_le_bytes());
        Ok(OutboundFrame::seal(&self.buf))
    }
}

/// A response frame whose CRC has been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    pub command: ReceiverCommand,
    pub packet_size: u16,
    pub payload: Bytes,
    pub crc: u16,
}

impl InboundFrame {
    /// Read one frame off the line: header, payload, then trailer.
    pub fn read_from<T: Transport + ?Sized>(transport: &mut T) -> Result<Self, G4Error> {
        let header_bytes = transport.read_exact(FRAME_HEADER_SIZE)?;
        debug!(bytes = %hex::encode(&header_bytes), "Read frame header");
        let header = FrameHeaderRaw::parse(&header_bytes)?;

        let payload_len = header.payload_len();
        let payload = if payload_len > 0 {
            let payload = transport.read_exact(payload_len)?;
            debug!(len = payload_len, bytes = %hex::encode(&payload), "Read frame payload");
            payload
        } else {
            debug!("No payload expected, skipping to trailer");
            Bytes::new()
        };

        let trailer = transport.read_exact(FRAME_TRAILER_SIZE)?;
        debug!(bytes = %hex::encode(&trailer), "Read frame crc");
        Self::validate(&header_bytes, header, payload, &trailer)
    }

    fn validate(header_bytes: &[u8], header: FrameHeaderRaw, payload: Bytes, trailer: &[u8]) -> Result<Self, G4Error> {
        let trailer: [u8; FRAME_TRAILER_SIZE] = trailer.try_into().map_err(|_| G4Error::InvalidLength {
            expected: FRAME_TRAILER_SIZE,
            actual: trailer.len(),
        })?;
        let actual = u16::from_le_bytes(trailer);

        let mut covered = BytesMut::with_capacity(header_bytes.len() + payload.len());
        covered.extend_from_slice(header_bytes);
        covered.extend_from_slice(&payload);
        let expected = checksum(&covered);
        if actual != expected {
            return Err(G4Error::Checksum {
                scope: CrcScope::Frame,
                offset: covered.len(),
                expected,
                actual,
            });
        }

        Ok(Self {
            command: ReceiverCommand::from_id(header.command_id)?,
            packet_size: header.packet_size.get(),
            payload,
            crc: actual,
        })
    }
}

impl TryFrom<Bytes> for InboundFrame {
    type Error = G4Error;

    fn try_from(mut bytes: Bytes) -> Result<Self, Self::Error> {
        if bytes.len() < FRAME_ENVELOPE_SIZE {
            return Err(G4Error::InvalidLength {
                expected: FRAME_ENVELOPE_SIZE,
                actual: bytes.len(),
            });
        }
        let header_bytes = bytes.split_to(FRAME_HEADER_SIZE);
        let header = FrameHeaderRaw::parse(&header_bytes)?;
        let payload_len = header.payload_len();
        if bytes.len() != payload_len + FRAME_TRAILER_SIZE {
            return Err(G4Error::InvalidLength {
                expected: header.packet_size.get() as usize,
                actual: FRAME_HEADER_SIZE + bytes.len(),
            });
        }
        let payload = bytes.split_to(payload_len);
        Self::validate(&header_bytes, header, payload, &bytes)
    }
}
