//! The tagged value sum shared by parameter binding and row decoding.

use crate::constant::ColumnType;
use crate::error::{Error, Result};
use crate::protocol::primitive::{
    write_bytes_lenenc, write_int_1, write_int_2, write_int_4, write_int_8,
};

/// A single cell or bound parameter.
///
/// The binary-row decoder produces exactly this sum; the parameter binder
/// consumes it. Temporal and decimal values travel as their server-rendered
/// strings.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    TinyInt(i8),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    TinyUint(u8),
    SmallUint(u16),
    Uint(u32),
    BigUint(u64),
    Float(f32),
    Double(f64),
    /// DECIMAL/NEWDECIMAL, kept as the server's string rendering
    Decimal(String),
    Text(String),
    Bytes(Vec<u8>),
    /// "YYYY-MM-DD"
    Date(String),
    /// "HH:MM:SS", hours may exceed two digits
    Time(String),
    /// "YYYY-MM-DD HH:MM:SS"
    DateTime(String),
}

/// Flag bit set in the high type byte for unsigned integer parameters.
const UNSIGNED_TYPE_FLAG: u8 = 0x80;

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The two-byte wire type vector entry for this value when bound as a
    /// parameter: type code plus the unsigned flag.
    ///
    /// Only the kinds in the binding table encode; anything else is an
    /// unsupported parameter type, reported with the offending index.
    pub(crate) fn wire_type(&self, index: usize) -> Result<[u8; 2]> {
        let pair = match self {
            Value::Null => [ColumnType::Null as u8, 0],
            Value::Bool(_) | Value::TinyInt(_) => [ColumnType::Tiny as u8, 0],
            Value::SmallInt(_) => [ColumnType::Short as u8, 0],
            Value::Int(_) => [ColumnType::Long as u8, 0],
            Value::BigInt(_) => [ColumnType::LongLong as u8, 0],
            Value::TinyUint(_) => [ColumnType::Tiny as u8, UNSIGNED_TYPE_FLAG],
            Value::SmallUint(_) => [ColumnType::Short as u8, UNSIGNED_TYPE_FLAG],
            Value::Uint(_) => [ColumnType::Long as u8, UNSIGNED_TYPE_FLAG],
            Value::BigUint(_) => [ColumnType::LongLong as u8, UNSIGNED_TYPE_FLAG],
            Value::Float(_) => [ColumnType::Float as u8, 0],
            Value::Double(_) => [ColumnType::Double as u8, 0],
            Value::Text(_) => [ColumnType::String as u8, 0],
            Value::Bytes(_) => [ColumnType::Blob as u8, 0],
            Value::Decimal(_)
            | Value::Date(_)
            | Value::Time(_)
            | Value::DateTime(_) => return Err(Error::UnsupportedParamType(index)),
        };
        Ok(pair)
    }

    /// Binary-protocol encoding of the value body. NULL writes nothing; it is
    /// carried by the null bitmap.
    pub(crate) fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Value::Null => {}
            Value::Bool(v) => write_int_1(out, u8::from(*v)),
            Value::TinyInt(v) => write_int_1(out, *v as u8),
            Value::SmallInt(v) => write_int_2(out, *v as u16),
            Value::Int(v) => write_int_4(out, *v as u32),
            Value::BigInt(v) => write_int_8(out, *v as u64),
            Value::TinyUint(v) => write_int_1(out, *v),
            Value::SmallUint(v) => write_int_2(out, *v),
            Value::Uint(v) => write_int_4(out, *v),
            Value::BigUint(v) => write_int_8(out, *v),
            Value::Float(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Double(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Text(v) => write_bytes_lenenc(out, v.as_bytes()),
            Value::Bytes(v) => write_bytes_lenenc(out, v),
            Value::Decimal(v)
            | Value::Date(v)
            | Value::Time(v)
            | Value::DateTime(v) => write_bytes_lenenc(out, v.as_bytes()),
        }
    }

    // ─── Typed Access ────────────────────────────────────────────────────

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Bool(v) => Some(i64::from(*v)),
            Value::TinyInt(v) => Some(i64::from(*v)),
            Value::SmallInt(v) => Some(i64::from(*v)),
            Value::Int(v) => Some(i64::from(*v)),
            Value::BigInt(v) => Some(*v),
            Value::TinyUint(v) => Some(i64::from(*v)),
            Value::SmallUint(v) => Some(i64::from(*v)),
            Value::Uint(v) => Some(i64::from(*v)),
            Value::BigUint(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Bool(v) => Some(u64::from(*v)),
            Value::TinyUint(v) => Some(u64::from(*v)),
            Value::SmallUint(v) => Some(u64::from(*v)),
            Value::Uint(v) => Some(u64::from(*v)),
            Value::BigUint(v) => Some(*v),
            Value::TinyInt(v) => u64::try_from(*v).ok(),
            Value::SmallInt(v) => u64::try_from(*v).ok(),
            Value::Int(v) => u64::try_from(*v).ok(),
            Value::BigInt(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v)
            | Value::Decimal(v)
            | Value::Date(v)
            | Value::Time(v)
            | Value::DateTime(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v),
            Value::Text(v) => Some(v.as_bytes()),
            _ => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

// ─── Conversions For Binding ─────────────────────────────────────────────

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::TinyInt(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::SmallInt(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::TinyUint(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::SmallUint(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Uint(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::BigUint(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}
