//! The frame layer: length-prefixed, sequence-numbered packets on a byte
//! stream.
//!
//! Every frame is `length(3 LE) || sequence(1) || payload`. Payloads larger
//! than [`MAX_PAYLOAD_LEN`] span consecutive frames; a payload whose final
//! chunk is exactly the limit is terminated by an empty frame.

use std::io::{BufRead, Write};

use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::constant::MAX_PAYLOAD_LEN;
use crate::error::{Error, Result};

/// Frame header (zero-copy)
///
/// Layout matches the wire:
/// - length: 3 bytes (little-endian, payload length)
/// - sequence: 1 byte
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct PacketHeader {
    pub length: [u8; 3],
    pub sequence: u8,
}

impl PacketHeader {
    pub fn length(&self) -> usize {
        u32::from_le_bytes([self.length[0], self.length[1], self.length[2], 0]) as usize
    }
}

/// Build a frame header as a stack array.
pub fn packet_header_array(sequence: u8, payload_length: usize) -> [u8; 4] {
    let bytes = (payload_length as u32).to_le_bytes();
    [bytes[0], bytes[1], bytes[2], sequence]
}

/// Read one logical payload, concatenating continuation frames.
///
/// `seq` is the expected sequence byte; it is verified against every frame
/// header and advanced past all frames consumed. A mismatch is fatal
/// (`CommandsOutOfSync`) and leaves the stream position undefined.
///
/// `observed` is flipped once the first header has been read in full, which
/// is what makes a later network fault ineligible for the reconnect retry.
pub fn read_packet<R: BufRead>(
    reader: &mut R,
    seq: &mut u8,
    buf: &mut Vec<u8>,
    observed: &mut bool,
) -> Result<()> {
    buf.clear();

    let mut length = read_frame_header(reader, seq)?;
    *observed = true;
    read_frame_body(reader, buf, length)?;

    // A maximal frame promises a continuation, possibly empty.
    while length == MAX_PAYLOAD_LEN {
        length = read_frame_header(reader, seq)?;
        read_frame_body(reader, buf, length)?;
    }

    Ok(())
}

fn read_frame_header<R: BufRead>(reader: &mut R, seq: &mut u8) -> Result<usize> {
    let mut header = [0u8; 4];
    reader.read_exact(&mut header)?;
    let header = PacketHeader::ref_from_bytes(&header).map_err(|_| Error::MalformedPacket)?;

    if header.sequence != *seq {
        return Err(Error::CommandsOutOfSync);
    }
    *seq = seq.wrapping_add(1);
    Ok(header.length())
}

fn read_frame_body<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>, length: usize) -> Result<()> {
    let start = buf.len();
    buf.resize(start + length, 0);
    reader.read_exact(&mut buf[start..])?;
    Ok(())
}

/// Write one logical payload, splitting it into maximal frames.
///
/// `seq` is advanced past every frame written. An empty payload still emits
/// one empty frame.
pub fn write_packet<W: Write>(writer: &mut W, seq: &mut u8, payload: &[u8]) -> Result<()> {
    let mut remaining = payload;
    let mut chunk_len = remaining.len().min(MAX_PAYLOAD_LEN);

    loop {
        let (chunk, rest) = remaining.split_at(chunk_len);
        writer.write_all(&packet_header_array(*seq, chunk_len))?;
        writer.write_all(chunk)?;
        *seq = seq.wrapping_add(1);
        remaining = rest;

        if remaining.is_empty() {
            // Trailing empty frame required iff the final chunk was maximal.
            if chunk_len == MAX_PAYLOAD_LEN {
                chunk_len = 0;
                continue;
            }
            break;
        }
        chunk_len = remaining.len().min(MAX_PAYLOAD_LEN);
    }

    writer.flush()?;
    Ok(())
}
