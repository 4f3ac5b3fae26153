//! Field descriptors and the two row formats.

use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE};
use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::constant::{ColumnType, FieldFlags, BINARY_CHARSET};
use crate::error::{Error, Result};
use crate::protocol::primitive::*;
use crate::row::Row;
use crate::value::Value;

/// Result-set header: the field count, with an optional extra value.
#[derive(Debug, Clone)]
pub struct ResultSetHeader {
    pub field_count: u64,
    pub extra: Option<u64>,
}

pub fn read_resultset_header(payload: &[u8]) -> Result<ResultSetHeader> {
    let (field_count, rest) = read_int_lenenc(payload)?;
    let extra = if rest.is_empty() {
        None
    } else {
        Some(read_int_lenenc(rest)?.0)
    };
    Ok(ResultSetHeader { field_count, extra })
}

/// Fixed tail of a field packet (zero-copy, 12 bytes)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
struct FieldTail {
    charset: U16LE,
    length: U32LE,
    column_type: u8,
    flags: U16LE,
    decimals: u8,
    reserved: U16LE,
}

/// One column descriptor of a result set.
#[derive(Debug, Clone)]
pub struct Field {
    pub database: String,
    pub table: String,
    pub orig_table: String,
    pub name: String,
    pub orig_name: String,
    pub charset: u16,
    pub length: u32,
    pub column_type: ColumnType,
    pub flags: FieldFlags,
    pub decimals: u8,
}

impl Field {
    /// Whether cells of this column carry bytes rather than text.
    fn is_binary(&self) -> bool {
        self.charset == BINARY_CHARSET || self.flags.contains(FieldFlags::BINARY)
    }

    fn is_unsigned(&self) -> bool {
        self.flags.contains(FieldFlags::UNSIGNED)
    }
}

/// Read a field packet: catalog, db, table, orig-table, name, orig-name as
/// length-coded strings, one filler byte, then the fixed 12-byte tail.
/// A trailing default value (field-list command only) is ignored.
pub fn read_field(payload: &[u8]) -> Result<Field> {
    let (_catalog, data) = read_string_lenenc(payload)?;
    let (database, data) = read_string_lenenc(data)?;
    let (table, data) = read_string_lenenc(data)?;
    let (orig_table, data) = read_string_lenenc(data)?;
    let (name, data) = read_string_lenenc(data)?;
    let (orig_name, data) = read_string_lenenc(data)?;
    let (_filler, data) = read_int_1(data)?;

    if data.len() < 12 {
        return Err(Error::MalformedPacket);
    }
    let tail = FieldTail::ref_from_bytes(&data[..12]).map_err(|_| Error::MalformedPacket)?;

    let column_type =
        ColumnType::from_u8(tail.column_type).ok_or(Error::MalformedPacket)?;

    Ok(Field {
        database: String::from_utf8_lossy(database).into_owned(),
        table: String::from_utf8_lossy(table).into_owned(),
        orig_table: String::from_utf8_lossy(orig_table).into_owned(),
        name: String::from_utf8_lossy(name).into_owned(),
        orig_name: String::from_utf8_lossy(orig_name).into_owned(),
        charset: tail.charset.get(),
        length: tail.length.get(),
        column_type,
        flags: FieldFlags::from_bits_truncate(tail.flags.get()),
        decimals: tail.decimals,
    })
}

/// Decode a string or blob cell by column character set.
fn string_cell(field: &Field, bytes: &[u8]) -> Value {
    if field.is_binary() {
        return Value::Bytes(bytes.to_vec());
    }
    match simdutf8::basic::from_utf8(bytes) {
        Ok(text) => Value::Text(text.to_string()),
        Err(_) => Value::Bytes(bytes.to_vec()),
    }
}

// ─── Text Protocol ───────────────────────────────────────────────────────

/// Decode one text-protocol row: every cell is a length-coded string, with
/// NULL as the 0xFB sentinel. Numeric columns are re-typed from their string
/// rendering.
pub fn read_text_row(payload: &[u8], fields: &[Field]) -> Result<Row> {
    let mut values = Vec::with_capacity(fields.len());
    let mut data = payload;

    for field in fields {
        let (cell, rest) = read_string_lenenc_nullable(data)?;
        data = rest;
        let Some(bytes) = cell else {
            values.push(Value::Null);
            continue;
        };
        values.push(text_cell(field, bytes)?);
    }

    Ok(Row::new(values, false))
}

fn text_cell(field: &Field, bytes: &[u8]) -> Result<Value> {
    let parse_text = || {
        simdutf8::basic::from_utf8(bytes).map_err(|_| Error::MalformedPacket)
    };

    let value = match field.column_type {
        ColumnType::Tiny => {
            let text = parse_text()?;
            if field.is_unsigned() {
                Value::TinyUint(text.parse().map_err(|_| Error::MalformedPacket)?)
            } else {
                Value::TinyInt(text.parse().map_err(|_| Error::MalformedPacket)?)
            }
        }
        ColumnType::Short => {
            let text = parse_text()?;
            if field.is_unsigned() {
                Value::SmallUint(text.parse().map_err(|_| Error::MalformedPacket)?)
            } else {
                Value::SmallInt(text.parse().map_err(|_| Error::MalformedPacket)?)
            }
        }
        ColumnType::Long | ColumnType::Int24 => {
            let text = parse_text()?;
            if field.is_unsigned() {
                Value::Uint(text.parse().map_err(|_| Error::MalformedPacket)?)
            } else {
                Value::Int(text.parse().map_err(|_| Error::MalformedPacket)?)
            }
        }
        ColumnType::LongLong => {
            let text = parse_text()?;
            if field.is_unsigned() {
                Value::BigUint(text.parse().map_err(|_| Error::MalformedPacket)?)
            } else {
                Value::BigInt(text.parse().map_err(|_| Error::MalformedPacket)?)
            }
        }
        ColumnType::Year => {
            Value::SmallUint(parse_text()?.parse().map_err(|_| Error::MalformedPacket)?)
        }
        ColumnType::Float => {
            Value::Float(parse_text()?.parse().map_err(|_| Error::MalformedPacket)?)
        }
        ColumnType::Double => {
            Value::Double(parse_text()?.parse().map_err(|_| Error::MalformedPacket)?)
        }
        ColumnType::Decimal | ColumnType::NewDecimal => Value::Decimal(parse_text()?.to_string()),
        ColumnType::Date | ColumnType::NewDate => Value::Date(parse_text()?.to_string()),
        ColumnType::Time => Value::Time(parse_text()?.to_string()),
        ColumnType::Datetime | ColumnType::Timestamp => {
            Value::DateTime(parse_text()?.to_string())
        }
        _ => string_cell(field, bytes),
    };
    Ok(value)
}

// ─── Binary Protocol ─────────────────────────────────────────────────────

/// Decode one binary-protocol row.
///
/// Layout: 0x00 header, null bitmap of `(N + 9) / 8` bytes with a two-bit
/// offset, then each non-null cell serialized per its declared type. A
/// length-coded cell shorter than its declared length marks the row
/// truncated and decodes from what is present.
pub fn read_binary_row(payload: &[u8], fields: &[Field]) -> Result<Row> {
    let (header, data) = read_int_1(payload)?;
    if header != 0x00 {
        return Err(Error::MalformedPacket);
    }

    let bitmap_len = (fields.len() + 9) / 8;
    let (bitmap, mut data) = read_bytes_fix(data, bitmap_len)?;

    let mut values = Vec::with_capacity(fields.len());
    let mut truncated = false;

    for (index, field) in fields.iter().enumerate() {
        let bit = index + 2;
        if bitmap[bit >> 3] & (1 << (bit & 7)) != 0 {
            values.push(Value::Null);
            continue;
        }
        let (value, rest) = binary_cell(field, data, &mut truncated)?;
        values.push(value);
        data = rest;
    }

    Ok(Row::new(values, truncated))
}

fn binary_cell<'a>(
    field: &Field,
    data: &'a [u8],
    truncated: &mut bool,
) -> Result<(Value, &'a [u8])> {
    match field.column_type {
        ColumnType::Tiny => {
            let (raw, rest) = read_int_1(data)?;
            let value = if field.is_unsigned() {
                Value::TinyUint(raw)
            } else {
                Value::TinyInt(raw as i8)
            };
            Ok((value, rest))
        }
        ColumnType::Short => {
            let (raw, rest) = read_int_2(data)?;
            let value = if field.is_unsigned() {
                Value::SmallUint(raw)
            } else {
                Value::SmallInt(raw as i16)
            };
            Ok((value, rest))
        }
        ColumnType::Year => {
            let (raw, rest) = read_int_2(data)?;
            Ok((Value::SmallUint(raw), rest))
        }
        ColumnType::Long | ColumnType::Int24 => {
            let (raw, rest) = read_int_4(data)?;
            let value = if field.is_unsigned() {
                Value::Uint(raw)
            } else {
                Value::Int(raw as i32)
            };
            Ok((value, rest))
        }
        ColumnType::LongLong => {
            let (raw, rest) = read_int_8(data)?;
            let value = if field.is_unsigned() {
                Value::BigUint(raw)
            } else {
                Value::BigInt(raw as i64)
            };
            Ok((value, rest))
        }
        ColumnType::Float => {
            let (raw, rest) = read_float_4(data)?;
            Ok((Value::Float(raw), rest))
        }
        ColumnType::Double => {
            let (raw, rest) = read_float_8(data)?;
            Ok((Value::Double(raw), rest))
        }
        ColumnType::Date | ColumnType::NewDate => read_binary_date(data),
        ColumnType::Datetime | ColumnType::Timestamp => read_binary_datetime(data),
        ColumnType::Time => read_binary_time(data),
        _ => {
            // Everything else travels as a length-coded string: decimals,
            // strings, blobs, enum, set, bit, geometry.
            let (declared, rest) = read_int_lenenc(data)?;
            let declared = declared as usize;
            let (bytes, rest) = if declared > rest.len() {
                *truncated = true;
                (rest, &rest[rest.len()..])
            } else {
                read_bytes_fix(rest, declared)?
            };
            let value = match field.column_type {
                ColumnType::Decimal | ColumnType::NewDecimal => {
                    match simdutf8::basic::from_utf8(bytes) {
                        Ok(text) => Value::Decimal(text.to_string()),
                        Err(_) => return Err(Error::MalformedPacket),
                    }
                }
                _ => string_cell(field, bytes),
            };
            Ok((value, rest))
        }
    }
}

/// DATE: length byte 0 means the zero date, 4 means year+month+day.
fn read_binary_date(data: &[u8]) -> Result<(Value, &[u8])> {
    let (len, rest) = read_int_1(data)?;
    if len == 0 {
        return Ok((Value::Date("0000-00-00".to_string()), rest));
    }
    if len < 4 {
        return Err(Error::MalformedPacket);
    }
    let (body, rest) = read_bytes_fix(rest, len as usize)?;
    let (year, body) = read_int_2(body)?;
    let (month, body) = read_int_1(body)?;
    let (day, _body) = read_int_1(body)?;
    Ok((
        Value::Date(format!("{year:04}-{month:02}-{day:02}")),
        rest,
    ))
}

/// DATETIME/TIMESTAMP: length byte 0, 4, 7 or 11; the microsecond tail is
/// accepted and ignored.
fn read_binary_datetime(data: &[u8]) -> Result<(Value, &[u8])> {
    let (len, rest) = read_int_1(data)?;
    if len == 0 {
        return Ok((Value::DateTime("0000-00-00 00:00:00".to_string()), rest));
    }
    if len < 4 {
        return Err(Error::MalformedPacket);
    }
    let (body, rest) = read_bytes_fix(rest, len as usize)?;
    let (year, body) = read_int_2(body)?;
    let (month, body) = read_int_1(body)?;
    let (day, body) = read_int_1(body)?;

    let rendered = if len >= 7 {
        let (hour, body) = read_int_1(body)?;
        let (minute, body) = read_int_1(body)?;
        let (second, _body) = read_int_1(body)?;
        format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}")
    } else {
        format!("{year:04}-{month:02}-{day:02}")
    };
    Ok((Value::DateTime(rendered), rest))
}

/// TIME: length byte 0, 8 or 12; hours render as `days * 24 + hours`, the
/// sign byte and microsecond tail are accepted and ignored.
fn read_binary_time(data: &[u8]) -> Result<(Value, &[u8])> {
    let (len, rest) = read_int_1(data)?;
    if len == 0 {
        return Ok((Value::Time("00:00:00".to_string()), rest));
    }
    if len < 8 {
        return Err(Error::MalformedPacket);
    }
    let (body, rest) = read_bytes_fix(rest, len as usize)?;
    let (_sign, body) = read_int_1(body)?;
    let (days, body) = read_int_4(body)?;
    let (hour, body) = read_int_1(body)?;
    let (minute, body) = read_int_1(body)?;
    let (second, _body) = read_int_1(body)?;

    let hours = u64::from(days) * 24 + u64::from(hour);
    Ok((
        Value::Time(format!("{hours:02}:{minute:02}:{second:02}")),
        rest,
    ))
}
