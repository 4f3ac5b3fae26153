use thiserror::Error;

pub use color_eyre::eyre::eyre;

use crate::constant::errno;

pub type Result<T> = core::result::Result<T, Error>;

/// An error packet received from the server, surfaced verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("ERROR {} ({}): {}", self.code, self.sqlstate, self.message)]
pub struct ServerError {
    pub code: u16,
    /// Five-character SQLSTATE; empty on pre-4.1 servers.
    pub sqlstate: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum Error {
    // ─── Server Error ────────────────────────────────────────────────────
    #[error("Server Error: {0}")]
    Server(#[from] ServerError),
    // ─── Transport ───────────────────────────────────────────────────────
    #[error("Can't connect to local MySQL server through socket: {0}")]
    ConnectionError(String),
    #[error("Can't connect to MySQL server on '{0}'")]
    ConnHostError(String),
    #[error("MySQL server has gone away")]
    ServerGone,
    #[error("Lost connection to MySQL server during query")]
    ServerLost,
    #[error("Error in server handshake")]
    HandshakeError,
    // ─── Protocol ────────────────────────────────────────────────────────
    #[error("Commands out of sync; you can't run this command now")]
    CommandsOutOfSync,
    #[error("Malformed packet")]
    MalformedPacket,
    // ─── Statement Usage ─────────────────────────────────────────────────
    #[error("Statement not prepared")]
    NoPrepareStmt,
    #[error("No data supplied for parameters in prepared statement")]
    ParamsNotBound,
    #[error("Invalid parameter number: expected {expected}, got {actual}")]
    InvalidParameterNo { expected: usize, actual: usize },
    #[error("Unsupported parameter type at index {0}")]
    UnsupportedParamType(usize),
    #[error("Statement handle invalidated by reconnect; prepare it again")]
    StatementInvalidated,
    // ─── Result Usage ────────────────────────────────────────────────────
    #[error("Data truncated")]
    DataTruncated,
    #[error("Attempt to read a row while there is no result set")]
    NoResultSet,
    #[error("This handle is already connected")]
    AlreadyConnected,
    // ─── Internal ────────────────────────────────────────────────────────
    /// Transport fault before classification. Never surfaced to callers;
    /// the session maps it to `ServerGone`/`ServerLost`/`HandshakeError`.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("A bug in mywire: {0}")]
    LibraryBug(#[from] color_eyre::Report),
}

impl Error {
    /// Canonical CR_* client error number for this kind, or the server's own
    /// code for a `Server` error.
    pub fn errno(&self) -> u16 {
        match self {
            Error::Server(e) => e.code,
            Error::ConnectionError(_) => errno::CR_CONNECTION_ERROR,
            Error::ConnHostError(_) => errno::CR_CONN_HOST_ERROR,
            Error::ServerGone => errno::CR_SERVER_GONE_ERROR,
            Error::ServerLost => errno::CR_SERVER_LOST,
            Error::HandshakeError => errno::CR_SERVER_HANDSHAKE_ERR,
            Error::CommandsOutOfSync => errno::CR_COMMANDS_OUT_OF_SYNC,
            Error::MalformedPacket => errno::CR_MALFORMED_PACKET,
            Error::NoPrepareStmt => errno::CR_NO_PREPARE_STMT,
            Error::ParamsNotBound => errno::CR_PARAMS_NOT_BOUND,
            Error::InvalidParameterNo { .. } => errno::CR_INVALID_PARAMETER_NO,
            Error::UnsupportedParamType(_) => errno::CR_UNSUPPORTED_PARAM_TYPE,
            Error::StatementInvalidated => errno::CR_STMT_CLOSED,
            Error::DataTruncated => errno::CR_DATA_TRUNCATED,
            Error::NoResultSet => errno::CR_NO_RESULT_SET,
            Error::AlreadyConnected => errno::CR_ALREADY_CONNECTED,
            Error::Io(_) | Error::LibraryBug(_) => 0,
        }
    }

    /// Returns true for the network fault kinds that warrant a reconnect
    /// attempt when the session was configured for it.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::ServerGone | Error::ServerLost | Error::Io(_))
    }
}
