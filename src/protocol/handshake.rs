//! Init packet parsing, auth packet building and capability negotiation.

use crate::constant::{CapabilityFlags, Protocol, StatusFlags};
use crate::error::{Error, Result};
use crate::protocol::primitive::*;

/// Initial handshake packet from the server.
#[derive(Debug, Clone)]
pub struct InitPacket {
    pub protocol_version: u8,
    pub server_version: String,
    pub thread_id: u32,
    /// Scramble seed: 8 bytes on pre-4.1 servers, 20 bytes on 4.1
    pub scramble: Vec<u8>,
    pub capabilities: CapabilityFlags,
    pub charset: u8,
    pub status: StatusFlags,
}

/// Read the init packet.
///
/// Layout: protocol(1), server-version(nul), thread-id(4), seed part A(8),
/// filler(1), caps-low(2), charset(1), status(2), then on 4.1-aware servers
/// caps-high(2), scramble-length-or-reserved(1+10), seed part B
/// (null-terminated).
pub fn read_init(payload: &[u8]) -> Result<InitPacket> {
    let (protocol_version, data) = read_int_1(payload)?;
    if protocol_version < 9 {
        return Err(Error::HandshakeError);
    }

    let (version_bytes, data) = read_string_null(data)?;
    let server_version = String::from_utf8_lossy(version_bytes).into_owned();

    let (thread_id, data) = read_int_4(data)?;

    let (seed_a, data) = read_bytes_fix(data, 8)?;
    let (_filler, data) = read_int_1(data)?;

    let (caps_low, data) = read_int_2(data)?;
    let (charset, data) = read_int_1(data)?;
    let (status, mut data) = read_int_2(data)?;

    let mut capabilities = CapabilityFlags::from_bits_truncate(u32::from(caps_low));
    let mut scramble = seed_a.to_vec();

    // 4.1-aware servers append the capability high word and seed part B.
    if data.len() >= 13 {
        let (caps_high, rest) = read_int_2(data)?;
        let (_scramble_len, rest) = read_int_1(rest)?;
        let (_reserved, rest) = read_bytes_fix(rest, 10)?;
        data = rest;
        capabilities |=
            CapabilityFlags::from_bits_truncate(u32::from(caps_high) << 16);

        if capabilities.contains(CapabilityFlags::PROTOCOL_41) {
            let (seed_b, _rest) = read_bytes_fix(data, data.len().min(13))?;
            let seed_b = match seed_b.iter().position(|&b| b == 0) {
                Some(pos) => &seed_b[..pos],
                None => seed_b,
            };
            scramble.extend_from_slice(seed_b);
        }
    }

    Ok(InitPacket {
        protocol_version,
        server_version,
        thread_id,
        scramble,
        capabilities,
        charset,
        status: StatusFlags::from_bits_truncate(status),
    })
}

/// Pick the handshake flavour and the client flag set to request.
///
/// The client always asks for multi-statements and multi-results, mirrors
/// long-password/long-flag/transactions when the server has them, and on 4.1
/// servers adds protocol-41 + secure-conn, plus connect-with-db when a
/// default database is configured.
pub fn negotiate(server: CapabilityFlags, with_db: bool) -> (Protocol, CapabilityFlags) {
    let mut flags = CapabilityFlags::MULTI_STATEMENTS | CapabilityFlags::MULTI_RESULTS;

    for shared in [
        CapabilityFlags::LONG_PASSWORD,
        CapabilityFlags::LONG_FLAG,
        CapabilityFlags::TRANSACTIONS,
    ] {
        if server.contains(shared) {
            flags |= shared;
        }
    }

    if server.contains(CapabilityFlags::PROTOCOL_41) {
        flags |= CapabilityFlags::PROTOCOL_41 | CapabilityFlags::SECURE_CONN;
        if with_db && server.contains(CapabilityFlags::CONNECT_WITH_DB) {
            flags |= CapabilityFlags::CONNECT_WITH_DB;
        }
        (Protocol::V41, flags)
    } else {
        (Protocol::V40, flags)
    }
}

/// Write the 4.1 handshake response.
///
/// Layout: client-flags(4), max-packet(4), charset(1), reserved(23),
/// user(nul), scramble-length(1) + scramble, optional db(nul).
pub fn write_auth_41(
    out: &mut Vec<u8>,
    flags: CapabilityFlags,
    max_packet: u32,
    charset: u8,
    user: &str,
    token: &[u8],
    db: Option<&str>,
) {
    write_int_4(out, flags.bits());
    write_int_4(out, max_packet);
    write_int_1(out, charset);
    write_fill(out, 23);
    write_string_null(out, user);
    write_int_1(out, token.len() as u8);
    out.extend_from_slice(token);
    if let Some(db) = db {
        write_string_null(out, db);
    }
}

/// Write the 3.23 handshake response.
///
/// Layout: client-flags(2), max-packet(3), user(nul), legacy scramble,
/// filler(1).
pub fn write_auth_40(
    out: &mut Vec<u8>,
    flags: CapabilityFlags,
    max_packet: u32,
    user: &str,
    token: &[u8],
) {
    write_int_2(out, flags.bits() as u16);
    write_int_3(out, max_packet);
    write_string_null(out, user);
    out.extend_from_slice(token);
    write_int_1(out, 0);
}

/// Write the old-password follow-up sent after an EOF auth response.
pub fn write_old_password(out: &mut Vec<u8>, token: &[u8]) {
    out.extend_from_slice(token);
    write_int_1(out, 0);
}
