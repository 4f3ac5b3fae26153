//! Prepared-statement packet builders and the PrepareOK response.

use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE};
use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::constant::CommandByte;
use crate::error::{Error, Result};
use crate::protocol::command::{write_command_str, write_command_u32};
use crate::protocol::primitive::*;

/// COM_STMT_PREPARE OK response body (zero-copy)
///
/// Layout after the 0x00 status byte:
/// - statement_id: 4 bytes
/// - num_columns: 2 bytes
/// - num_params: 2 bytes
/// - reserved: 1 byte
/// - warning_count: 2 bytes
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct PrepareOk {
    pub statement_id: U32LE,
    pub num_columns: U16LE,
    pub num_params: U16LE,
    pub _reserved: u8,
    pub warning_count: U16LE,
}

/// Write COM_STMT_PREPARE
pub fn write_prepare(out: &mut Vec<u8>, sql: &str) {
    write_command_str(out, CommandByte::StmtPrepare, sql);
}

/// Read the COM_STMT_PREPARE response body (zero-copy)
pub fn read_prepare_ok(payload: &[u8]) -> Result<&PrepareOk> {
    let (status, data) = read_int_1(payload)?;
    if status != 0x00 {
        return Err(Error::MalformedPacket);
    }
    if data.len() < 11 {
        return Err(Error::MalformedPacket);
    }
    PrepareOk::ref_from_bytes(&data[..11]).map_err(|_| Error::MalformedPacket)
}

/// Write COM_STMT_EXECUTE.
///
/// Layout: 0x17, statement-id(4), flags(1, no cursor), iteration-count(4,
/// always 1), then for statements with parameters the null bitmap of
/// `(N + 7) / 8` bytes, the new-params-bound byte, the two-byte type vector
/// when rebinding, and the encoded values.
pub fn write_execute(
    out: &mut Vec<u8>,
    statement_id: u32,
    param_types: &[[u8; 2]],
    param_values: &[Vec<u8>],
    new_params_bound: bool,
) {
    write_int_1(out, CommandByte::StmtExecute as u8);
    write_int_4(out, statement_id);
    write_int_1(out, 0x00); // CURSOR_TYPE_NO_CURSOR
    write_int_4(out, 1);

    if param_types.is_empty() {
        return;
    }

    write_null_bitmap(out, param_types);

    if new_params_bound {
        write_int_1(out, 0x01);
        for pair in param_types {
            out.extend_from_slice(pair);
        }
    } else {
        write_int_1(out, 0x00);
    }

    for value in param_values {
        out.extend_from_slice(value);
    }
}

/// NULL bitmap for parameters: `(N + 7) / 8` bytes, no bit offset. A
/// parameter is NULL iff its type code is MYSQL_TYPE_NULL.
fn write_null_bitmap(out: &mut Vec<u8>, param_types: &[[u8; 2]]) {
    let start = out.len();
    write_fill(out, (param_types.len() + 7) / 8);
    for (index, pair) in param_types.iter().enumerate() {
        if pair[0] == crate::constant::ColumnType::Null as u8 {
            out[start + (index >> 3)] |= 1 << (index & 7);
        }
    }
}

/// Write one COM_STMT_SEND_LONG_DATA packet carrying a chunk of a parameter
/// body. No response follows.
pub fn write_long_data(out: &mut Vec<u8>, statement_id: u32, param_index: u16, chunk: &[u8]) {
    write_int_1(out, CommandByte::StmtSendLongData as u8);
    write_int_4(out, statement_id);
    write_int_2(out, param_index);
    out.extend_from_slice(chunk);
}

/// Write COM_STMT_CLOSE. No response follows.
pub fn write_close_statement(out: &mut Vec<u8>, statement_id: u32) {
    write_command_u32(out, CommandByte::StmtClose, statement_id);
}

/// Write COM_STMT_RESET.
pub fn write_reset_statement(out: &mut Vec<u8>, statement_id: u32) {
    write_command_u32(out, CommandByte::StmtReset, statement_id);
}
