use thiserror::Error;

pub use color_eyre::eyre::eyre;

use crate::protocol::response::{ErrPayload, ErrPayloadBytes};

/// SQLSTATE reported for range-check failures
pub const SQL_STATE_OUT_OF_RANGE: &str = "22003";
/// Vendor code reported for range-check failures (ER_WARN_DATA_OUT_OF_RANGE)
pub const ER_OUT_OF_RANGE: u16 = 1264;
/// SQLSTATE reported for authentication plugin failures
pub const SQL_STATE_AUTH: &str = "S1009";

#[derive(Debug, Error)]
pub enum Error {
    #[error("Server Error: {0}")]
    ServerError(#[from] ErrPayload),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Bad config error: {0}")]
    BadConfigError(String),

    #[error("Invalid packet")]
    InvalidPacket,

    #[error("Unexpected end of packet")]
    UnexpectedEof,

    #[error("Out of range value for column '{column}' : value {value} is not in {target} range")]
    OutOfRange {
        column: String,
        value: String,
        target: &'static str,
    },

    #[error("Cannot convert value '{value}' of column '{column}' to {target}")]
    Unparsable {
        column: String,
        value: String,
        target: &'static str,
    },

    #[error("Unexpected NULL in column '{0}'")]
    UnexpectedNull(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("{0}")]
    AuthError(String),

    #[error("Unsupported authentication plugin: {0}")]
    UnsupportedAuthPlugin(String),

    #[error("Library bug: {0}")]
    LibraryBug(color_eyre::Report),
}

/// Coarse classification used by callers to decide whether a failure is local
/// to one accessor or poisons the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ProtocolFraming,
    ServerReported,
    DataConversion,
    UnsupportedOperation,
    InvalidParameter,
    AuthenticationFailure,
    Io,
    Config,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ServerError(_) => ErrorKind::ServerReported,
            Self::IoError(_) => ErrorKind::Io,
            Self::BadConfigError(_) => ErrorKind::Config,
            Self::InvalidPacket | Self::UnexpectedEof => ErrorKind::ProtocolFraming,
            Self::OutOfRange { .. } | Self::Unparsable { .. } | Self::UnexpectedNull(_) => {
                ErrorKind::DataConversion
            }
            Self::Unsupported(_) => ErrorKind::UnsupportedOperation,
            Self::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Self::AuthError(_) | Self::UnsupportedAuthPlugin(_) => {
                ErrorKind::AuthenticationFailure
            }
            Self::LibraryBug(_) => ErrorKind::Internal,
        }
    }

    /// The connection byte stream can no longer be trusted
    pub fn is_conn_broken(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ProtocolFraming | ErrorKind::Io | ErrorKind::Internal
        )
    }

    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::ServerError(err) if !err.sql_state.is_empty() => Some(&err.sql_state),
            Self::OutOfRange { .. } => Some(SQL_STATE_OUT_OF_RANGE),
            Self::AuthError(_) => Some(SQL_STATE_AUTH),
            _ => None,
        }
    }

    pub fn error_code(&self) -> Option<u16> {
        match self {
            Self::ServerError(err) => Some(err.error_code),
            Self::OutOfRange { .. } => Some(ER_OUT_OF_RANGE),
            _ => None,
        }
    }

    pub fn from_debug(err: impl std::fmt::Debug) -> Self {
        Self::LibraryBug(eyre!("{:?}", err))
    }

    pub(crate) fn out_of_range(
        column: &str,
        value: impl std::fmt::Display,
        target: &'static str,
    ) -> Self {
        Self::OutOfRange {
            column: column.to_string(),
            value: value.to_string(),
            target,
        }
    }

    pub(crate) fn unparsable(
        column: &str,
        value: impl std::fmt::Display,
        target: &'static str,
    ) -> Self {
        Self::Unparsable {
            column: column.to_string(),
            value: value.to_string(),
            target,
        }
    }
}

impl<'a> From<ErrPayloadBytes<'a>> for Error {
    fn from(value: ErrPayloadBytes<'a>) -> Self {
        match ErrPayload::try_from(value) {
            Ok(err_payload) => Error::ServerError(err_payload),
            Err(err) => err,
        }
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(err: std::convert::Infallible) -> Self {
        match err {}
    }
}

pub type Result<T> = std::result::Result<T, Error>;
