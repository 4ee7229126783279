//! Spoke data frame decoding
//!
//! Each data-stream datagram carries an 8-byte frame header followed by up
//! to 32 spoke lines. A spoke line is a 24-byte header plus 512 bytes of
//! packed intensity nibbles (1024 4-bit samples, low nibble first).
//!
//! The device numbers 4096 spokes per revolution but a Halo transmits only
//! every other one; angles stay in raw 0..4095 units here and are converted
//! to radians by the sector assembler.

use serde::Deserialize;

use crate::error::ParseError;
use crate::spoke::Spoke;

/// Spoke angle units per revolution
pub const SPOKES_PER_REVOLUTION: u16 = 4096;

/// Intensity samples per spoke
pub const SAMPLES_PER_SPOKE: usize = 1024;

/// Packed bytes per spoke line (two 4-bit samples per byte)
pub const SPOKE_DATA_BYTES: usize = SAMPLES_PER_SPOKE / 2;

/// Spokes in a well-formed data frame
pub const SPOKES_PER_FRAME: usize = 32;

/// Frame header length (frame type and spoke count)
pub const FRAME_HEADER_BYTES: usize = 8;

/// Correction factor from the range-code product to meters
const RANGE_CORRECTION_FACTOR: f64 = 1.024;

/// Heading field flag marking the value invalid
const HEADING_INVALID: u16 = 0x8000;

/// Spoke line header (24 bytes)
#[derive(Deserialize, Debug, Clone, Copy)]
#[repr(C, packed)]
pub struct SpokeHeader {
    pub header_len: u8,
    pub status: u8,
    pub scan_number: [u8; 2],
    pub mark: [u8; 2],
    pub large_range: [u8; 2],
    pub angle: [u8; 2],
    pub heading: [u8; 2],
    pub small_range: [u8; 2],
    pub rotation: [u8; 2],
    _u01: [u8; 4],
    _u02: [u8; 4],
}

pub const SPOKE_HEADER_BYTES: usize = std::mem::size_of::<SpokeHeader>();

/// Full spoke line (header + packed samples)
pub const SPOKE_BYTES: usize = SPOKE_HEADER_BYTES + SPOKE_DATA_BYTES;

/// A decoded data frame: the spokes that survived validation plus a count
/// of lines that were dropped.
#[derive(Debug, Clone, Default)]
pub struct DecodedFrame {
    pub spokes: Vec<Spoke>,
    pub broken_spokes: usize,
}

/// Map the two range codes to meters.
///
/// Closed set per the vendor protocol: `large == 0x80` selects small-range
/// mode (`small == 0xFFFF` means no range), anything else uses the
/// large×small product. The result carries the fixed 1.024 correction.
fn decode_range(large: u16, small: u16) -> f64 {
    let meters = if large == 0x80 {
        if small == 0xffff {
            0
        } else {
            small as u32 / 4
        }
    } else {
        large as u32 * small as u32 / 512
    };
    meters as f64 * RANGE_CORRECTION_FACTOR
}

/// Heading is optional; bit 15 set marks it invalid.
fn decode_heading(raw: u16) -> Option<u16> {
    if raw & HEADING_INVALID != 0 {
        None
    } else {
        Some(raw & (SPOKES_PER_REVOLUTION - 1))
    }
}

fn parse_spoke(header_slice: &[u8], data_slice: &[u8]) -> Result<Spoke, ParseError> {
    let header: SpokeHeader = bincode::deserialize(&header_slice[..SPOKE_HEADER_BYTES])?;

    if header.header_len != SPOKE_HEADER_BYTES as u8 {
        return Err(ParseError::InvalidPacket(format!(
            "spoke header length {} (expected {})",
            header.header_len, SPOKE_HEADER_BYTES
        )));
    }
    // 0x12 flags a spoke with valid heading, 0x02 one without
    if header.status != 0x02 && header.status != 0x12 {
        return Err(ParseError::InvalidPacket(format!(
            "spoke status {:#04X}",
            header.status
        )));
    }
    if data_slice.len() != SPOKE_DATA_BYTES {
        return Err(ParseError::TooShort {
            expected: SPOKE_DATA_BYTES,
            actual: data_slice.len(),
        });
    }

    let angle = u16::from_le_bytes(header.angle) & (SPOKES_PER_REVOLUTION - 1);
    let heading = decode_heading(u16::from_le_bytes(header.heading));
    let range = decode_range(
        u16::from_le_bytes(header.large_range),
        u16::from_le_bytes(header.small_range),
    );

    Ok(Spoke {
        angle,
        heading,
        range,
        intensities: unpack_samples(data_slice),
    })
}

/// Unpack 4-bit intensity samples, low nibble first.
pub fn unpack_samples(packed: &[u8]) -> Vec<u8> {
    let mut samples = Vec::with_capacity(packed.len() * 2);
    for byte in packed {
        samples.push(byte & 0x0f);
        samples.push(byte >> 4);
    }
    samples
}

/// Decode one data-stream datagram into spokes.
///
/// Individual malformed spoke lines are dropped and counted; a datagram
/// without even one complete line is an error.
pub fn parse_data_frame(data: &[u8]) -> Result<DecodedFrame, ParseError> {
    if data.len() < FRAME_HEADER_BYTES + SPOKE_BYTES {
        return Err(ParseError::TooShort {
            expected: FRAME_HEADER_BYTES + SPOKE_BYTES,
            actual: data.len(),
        });
    }

    let mut count = (data.len() - FRAME_HEADER_BYTES) / SPOKE_BYTES;
    let mut frame = DecodedFrame::default();
    if count > SPOKES_PER_FRAME {
        count = SPOKES_PER_FRAME;
    }
    if (data.len() - FRAME_HEADER_BYTES) % SPOKE_BYTES != 0 {
        // Trailing partial spoke line
        frame.broken_spokes += 1;
    }

    let mut offset = FRAME_HEADER_BYTES;
    for _ in 0..count {
        let header_slice = &data[offset..offset + SPOKE_HEADER_BYTES];
        let data_slice = &data[offset + SPOKE_HEADER_BYTES..offset + SPOKE_BYTES];
        match parse_spoke(header_slice, data_slice) {
            Ok(spoke) => frame.spokes.push(spoke),
            Err(e) => {
                frame.broken_spokes += 1;
                log::warn!("Invalid spoke: {} header {:02X?}", e, header_slice);
            }
        }
        offset += SPOKE_BYTES;
    }

    Ok(frame)
}
