use bitflags::bitflags;

/// Largest payload a single frame can carry (3-byte length field).
pub const MAX_PAYLOAD_LEN: usize = 0xFF_FFFF;

/// Max packet size advertised to the server during authentication.
pub const MAX_PACKET_SIZE: u32 = 1 << 24;

/// Largest chunk of a COM_STMT_SEND_LONG_DATA body per frame.
pub const LONG_DATA_CHUNK: usize = MAX_PAYLOAD_LEN - 13;

pub const DEFAULT_PORT: u16 = 3306;
pub const DEFAULT_SOCKET: &str = "/var/run/mysqld/mysqld.sock";

/// Handshake flavour negotiated with the server.
///
/// Protocol 41 adds the capability high word, SHA1 auth, warning counts and
/// sqlstate markers; protocol 40 is the 3.23-era layout. Packet parsers take
/// this as a parameter instead of duplicating themselves per version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    V40,
    V41,
}

/// MySQL command bytes
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandByte {
    Quit = 0x01,
    InitDb = 0x02,
    Query = 0x03,
    FieldList = 0x04,
    CreateDb = 0x05,
    DropDb = 0x06,
    Refresh = 0x07,
    Shutdown = 0x08,
    Statistics = 0x09,
    ProcessInfo = 0x0a,
    Connect = 0x0b,
    ProcessKill = 0x0c,
    Debug = 0x0d,
    Ping = 0x0e,
    Time = 0x0f,
    DelayedInsert = 0x10,
    ChangeUser = 0x11,
    BinlogDump = 0x12,
    TableDump = 0x13,
    ConnectOut = 0x14,
    RegisterSlave = 0x15,
    StmtPrepare = 0x16,
    StmtExecute = 0x17,
    StmtSendLongData = 0x18,
    StmtClose = 0x19,
    StmtReset = 0x1a,
    SetOption = 0x1b,
    StmtFetch = 0x1c,
}

bitflags! {
    /// Client/server capability flags exchanged during the handshake.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CapabilityFlags: u32 {
        const LONG_PASSWORD = 0x0000_0001;
        const FOUND_ROWS = 0x0000_0002;
        const LONG_FLAG = 0x0000_0004;
        const CONNECT_WITH_DB = 0x0000_0008;
        const NO_SCHEMA = 0x0000_0010;
        const COMPRESS = 0x0000_0020;
        const ODBC = 0x0000_0040;
        const LOCAL_FILES = 0x0000_0080;
        const IGNORE_SPACE = 0x0000_0100;
        const PROTOCOL_41 = 0x0000_0200;
        const INTERACTIVE = 0x0000_0400;
        const SSL = 0x0000_0800;
        const IGNORE_SIGPIPE = 0x0000_1000;
        const TRANSACTIONS = 0x0000_2000;
        const RESERVED = 0x0000_4000;
        const SECURE_CONN = 0x0000_8000;
        const MULTI_STATEMENTS = 0x0001_0000;
        const MULTI_RESULTS = 0x0002_0000;
    }
}

bitflags! {
    /// Server status bits carried by OK and EOF packets.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StatusFlags: u16 {
        const IN_TRANS = 0x0001;
        const AUTOCOMMIT = 0x0002;
        const MORE_RESULTS_EXISTS = 0x0008;
        const NO_GOOD_INDEX_USED = 0x0010;
        const NO_INDEX_USED = 0x0020;
        const CURSOR_EXISTS = 0x0040;
        const LAST_ROW_SENT = 0x0080;
        const DB_DROPPED = 0x0100;
        const NO_BACKSLASH_ESCAPES = 0x0200;
        const METADATA_CHANGED = 0x0400;
    }
}

bitflags! {
    /// Column definition flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FieldFlags: u16 {
        const NOT_NULL = 0x0001;
        const PRI_KEY = 0x0002;
        const UNIQUE_KEY = 0x0004;
        const MULTIPLE_KEY = 0x0008;
        const BLOB = 0x0010;
        const UNSIGNED = 0x0020;
        const ZEROFILL = 0x0040;
        const BINARY = 0x0080;
        const ENUM = 0x0100;
        const AUTO_INCREMENT = 0x0200;
        const TIMESTAMP = 0x0400;
        const SET = 0x0800;
    }
}

bitflags! {
    /// What a refresh command flushes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Refresh: u8 {
        const GRANT = 0x01;
        const LOG = 0x02;
        const TABLES = 0x04;
        const HOSTS = 0x08;
        const STATUS = 0x10;
        const THREADS = 0x20;
        const SLAVE = 0x40;
        const MASTER = 0x80;
    }
}

/// Column type codes as they appear on the wire (3.23 through 5.x).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Decimal = 0x00,
    Tiny = 0x01,
    Short = 0x02,
    Long = 0x03,
    Float = 0x04,
    Double = 0x05,
    Null = 0x06,
    Timestamp = 0x07,
    LongLong = 0x08,
    Int24 = 0x09,
    Date = 0x0a,
    Time = 0x0b,
    Datetime = 0x0c,
    Year = 0x0d,
    NewDate = 0x0e,
    Varchar = 0x0f,
    Bit = 0x10,
    NewDecimal = 0xf6,
    Enum = 0xf7,
    Set = 0xf8,
    TinyBlob = 0xf9,
    MediumBlob = 0xfa,
    LongBlob = 0xfb,
    Blob = 0xfc,
    VarString = 0xfd,
    String = 0xfe,
    Geometry = 0xff,
}

impl ColumnType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Decimal),
            0x01 => Some(Self::Tiny),
            0x02 => Some(Self::Short),
            0x03 => Some(Self::Long),
            0x04 => Some(Self::Float),
            0x05 => Some(Self::Double),
            0x06 => Some(Self::Null),
            0x07 => Some(Self::Timestamp),
            0x08 => Some(Self::LongLong),
            0x09 => Some(Self::Int24),
            0x0a => Some(Self::Date),
            0x0b => Some(Self::Time),
            0x0c => Some(Self::Datetime),
            0x0d => Some(Self::Year),
            0x0e => Some(Self::NewDate),
            0x0f => Some(Self::Varchar),
            0x10 => Some(Self::Bit),
            0xf6 => Some(Self::NewDecimal),
            0xf7 => Some(Self::Enum),
            0xf8 => Some(Self::Set),
            0xf9 => Some(Self::TinyBlob),
            0xfa => Some(Self::MediumBlob),
            0xfb => Some(Self::LongBlob),
            0xfc => Some(Self::Blob),
            0xfd => Some(Self::VarString),
            0xfe => Some(Self::String),
            0xff => Some(Self::Geometry),
            _ => None,
        }
    }
}

/// Character set id the server uses for binary (non-text) columns.
pub const BINARY_CHARSET: u16 = 63;

/// Client-side error numbers, matching the canonical CR_* values.
pub mod errno {
    pub const CR_CONNECTION_ERROR: u16 = 2002;
    pub const CR_CONN_HOST_ERROR: u16 = 2003;
    pub const CR_SERVER_GONE_ERROR: u16 = 2006;
    pub const CR_SERVER_HANDSHAKE_ERR: u16 = 2012;
    pub const CR_SERVER_LOST: u16 = 2013;
    pub const CR_COMMANDS_OUT_OF_SYNC: u16 = 2014;
    pub const CR_MALFORMED_PACKET: u16 = 2027;
    pub const CR_NO_PREPARE_STMT: u16 = 2030;
    pub const CR_PARAMS_NOT_BOUND: u16 = 2031;
    pub const CR_DATA_TRUNCATED: u16 = 2032;
    pub const CR_INVALID_PARAMETER_NO: u16 = 2034;
    pub const CR_UNSUPPORTED_PARAM_TYPE: u16 = 2036;
    pub const CR_NO_RESULT_SET: u16 = 2053;
    pub const CR_STMT_CLOSED: u16 = 2056;
    pub const CR_ALREADY_CONNECTED: u16 = 2058;
}
