//! OK, Error and EOF payloads shared by every command round-trip.

use zerocopy::byteorder::little_endian::U16 as U16LE;
use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::constant::{Protocol, StatusFlags};
use crate::error::{Error, Result, ServerError};
use crate::protocol::primitive::*;

/// Parsed OK payload (first byte 0x00).
#[derive(Debug, Clone)]
pub struct OkPayload {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status: StatusFlags,
    pub warnings: u16,
    pub message: Option<String>,
}

/// Read an OK payload. Warnings exist only on protocol 41.
pub fn read_ok(payload: &[u8], protocol: Protocol) -> Result<OkPayload> {
    let (header, data) = read_int_1(payload)?;
    if header != 0x00 && header != 0xFE {
        return Err(Error::MalformedPacket);
    }

    let (affected_rows, data) = read_int_lenenc(data)?;
    let (last_insert_id, data) = read_int_lenenc(data)?;
    let (status, data) = read_int_2(data)?;
    let (warnings, data) = match protocol {
        Protocol::V41 => read_int_2(data)?,
        Protocol::V40 => (0, data),
    };

    let message = if data.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(data).into_owned())
    };

    Ok(OkPayload {
        affected_rows,
        last_insert_id,
        status: StatusFlags::from_bits_truncate(status),
        warnings,
        message,
    })
}

/// Read an Error payload (first byte 0xFF). The sqlstate marker exists only
/// on protocol 41, and even there some early servers omit it.
pub fn read_err(payload: &[u8], protocol: Protocol) -> Result<ServerError> {
    let (header, data) = read_int_1(payload)?;
    if header != 0xFF {
        return Err(Error::MalformedPacket);
    }

    let (code, data) = read_int_2(data)?;

    let (sqlstate, data) = if protocol == Protocol::V41 && data.first() == Some(&b'#') {
        let (state, rest) = read_bytes_fix(&data[1..], 5)?;
        (String::from_utf8_lossy(state).into_owned(), rest)
    } else {
        (String::new(), data)
    };

    Ok(ServerError {
        code,
        sqlstate,
        message: String::from_utf8_lossy(data).into_owned(),
    })
}

/// Fixed tail of a 4.1 EOF payload (zero-copy)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct EofTail {
    warnings: U16LE,
    status: U16LE,
}

/// Parsed EOF payload.
#[derive(Debug, Clone, Copy)]
pub struct EofPayload {
    pub warnings: u16,
    pub status: StatusFlags,
}

/// An EOF packet is 0xFE with a payload of at most 8 bytes; a longer 0xFE
/// payload is in-band data (a length-coded 8-byte integer).
pub fn is_eof(payload: &[u8]) -> bool {
    payload.first() == Some(&0xFE) && payload.len() <= 8
}

/// Read an EOF payload. Warning and status words exist only on protocol 41;
/// the bare one-byte form also appears there as the old-password switch.
pub fn read_eof(payload: &[u8], protocol: Protocol) -> Result<EofPayload> {
    let (header, data) = read_int_1(payload)?;
    if header != 0xFE {
        return Err(Error::MalformedPacket);
    }

    if protocol == Protocol::V40 || data.len() < 4 {
        return Ok(EofPayload {
            warnings: 0,
            status: StatusFlags::empty(),
        });
    }

    let tail = EofTail::ref_from_bytes(&data[..4]).map_err(|_| Error::MalformedPacket)?;
    Ok(EofPayload {
        warnings: tail.warnings.get(),
        status: StatusFlags::from_bits_truncate(tail.status.get()),
    })
}
