//! CRC16 as computed by the receiver firmware.
//!
//! This is the CCITT polynomial (0x1021) with a zero seed, processed one byte
//! at a time with the nibble-shift formulation the receiver uses. Every frame,
//! page header, page payload and record trailer is protected by it.

/// Compute the CRC over `bytes[offset..offset + length]`.
///
/// Panics if the range is out of bounds, like slice indexing does.
pub fn crc16(bytes: &[u8], offset: usize, length: usize) -> u16 {
    checksum(&bytes[offset..offset + length])
}

/// Compute the CRC over a whole slice.
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes.iter().fold(0, |crc, b| crc_byte(crc, *b))
}

/// Accumulate a single byte.
fn crc_byte(crc: u16, b: u8) -> u16 {
    let mut crc = crc.swap_bytes() ^ b as u16;
    crc ^= (crc & 0xFF) >> 4;
    crc ^= crc << 12;
    crc ^= (crc & 0xFF) << 5;
    crc
}
