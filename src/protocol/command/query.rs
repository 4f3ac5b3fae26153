use crate::constant::{CommandByte, Protocol};
use crate::error::{Error, Result};
use crate::protocol::command::resultset::read_resultset_header;
use crate::protocol::command::write_command_str;
use crate::protocol::response::{read_err, read_ok, OkPayload};

/// Write COM_QUERY
pub fn write_query(out: &mut Vec<u8>, sql: &str) {
    write_command_str(out, CommandByte::Query, sql);
}

/// Response variants for a command that may produce rows (query, execute).
#[derive(Debug)]
pub enum QueryResponse {
    Ok(OkPayload),
    ResultSet { field_count: u64, extra: Option<u64> },
}

/// Classify the first response packet of a query round-trip.
///
/// - 0xFF: error packet, raised as `Error::Server`
/// - 0x00: OK packet, no result set
/// - 0x01-0xFA: result-set header (field count as length-coded integer,
///   optionally followed by an extra length-coded integer)
///
/// 0xFB (LOCAL INFILE request) is never legal here because the local-files
/// capability is not requested.
pub fn read_query_response(payload: &[u8], protocol: Protocol) -> Result<QueryResponse> {
    match payload.first() {
        None => Err(Error::MalformedPacket),
        Some(0xFF) => Err(Error::Server(read_err(payload, protocol)?)),
        Some(0x00) => Ok(QueryResponse::Ok(read_ok(payload, protocol)?)),
        Some(0xFB) => Err(Error::MalformedPacket),
        Some(_) => {
            let header = read_resultset_header(payload)?;
            Ok(QueryResponse::ResultSet {
                field_count: header.field_count,
                extra: header.extra,
            })
        }
    }
}
