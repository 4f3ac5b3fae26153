mod prepared;
mod query;
mod resultset;

pub use prepared::{
    read_prepare_ok, write_close_statement, write_execute, write_long_data, write_prepare,
    write_reset_statement, PrepareOk,
};
pub use query::{read_query_response, write_query, QueryResponse};
pub use resultset::{
    read_binary_row, read_field, read_resultset_header, read_text_row, Field, ResultSetHeader,
};

use crate::constant::{CommandByte, Protocol};
use crate::protocol::primitive::{write_int_1, write_int_2, write_int_4, write_string_null};

/// Write a bare command packet (quit, ping, statistics).
pub fn write_command(out: &mut Vec<u8>, command: CommandByte) {
    write_int_1(out, command as u8);
}

/// Write a command followed by an unterminated string argument
/// (init-db, query, prepare).
pub fn write_command_str(out: &mut Vec<u8>, command: CommandByte, arg: &str) {
    write_int_1(out, command as u8);
    out.extend_from_slice(arg.as_bytes());
}

/// Write a command followed by a 4-byte argument (close/reset statement,
/// process kill).
pub fn write_command_u32(out: &mut Vec<u8>, command: CommandByte, arg: u32) {
    write_int_1(out, command as u8);
    write_int_4(out, arg);
}

/// Write a command followed by a single option byte (refresh).
pub fn write_command_u8(out: &mut Vec<u8>, command: CommandByte, arg: u8) {
    write_int_1(out, command as u8);
    write_int_1(out, arg);
}

/// Write COM_FIELD_LIST: table name, then an optional column wildcard.
pub fn write_field_list(out: &mut Vec<u8>, table: &str, wildcard: Option<&str>) {
    write_int_1(out, CommandByte::FieldList as u8);
    write_string_null(out, table);
    if let Some(wildcard) = wildcard {
        out.extend_from_slice(wildcard.as_bytes());
    }
}

/// Write COM_CHANGE_USER: user, auth token (length-prefixed on 4.1,
/// null-terminated on 4.0), database, charset.
pub fn write_change_user(
    out: &mut Vec<u8>,
    protocol: Protocol,
    user: &str,
    token: &[u8],
    db: &str,
    charset: u8,
) {
    write_int_1(out, CommandByte::ChangeUser as u8);
    write_string_null(out, user);
    match protocol {
        Protocol::V41 => {
            write_int_1(out, token.len() as u8);
            out.extend_from_slice(token);
        }
        Protocol::V40 => {
            out.extend_from_slice(token);
            write_int_1(out, 0);
        }
    }
    if !db.is_empty() {
        out.extend_from_slice(db.as_bytes());
    }
    write_int_1(out, 0);
    write_int_2(out, u16::from(charset));
}
