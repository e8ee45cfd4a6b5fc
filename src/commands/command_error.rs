use thiserror::Error;

use crate::resp::RespValue;
use crate::store::StoreError;
use crate::stream_id::StreamIdError;

/// Errors a command can answer without closing the connection.
///
/// The display string is exactly what goes on the wire after the `-` tag, so
/// variants that belong to the `ERR` family carry the prefix themselves.
#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("invalid command")]
    InvalidCommand,
    #[error("ERR unknown command")]
    UnknownCommand,
    #[error("invalid expiry value")]
    InvalidExpiryValue,
    #[error("invalid expiry flag")]
    InvalidExpiryFlag,
    #[error("invalid 'start' index")]
    InvalidStartIndex,
    #[error("invalid 'stop' index")]
    InvalidStopIndex,
    #[error("invalid 'count' value")]
    InvalidCount,
    #[error("invalid 'timeout' value")]
    InvalidTimeout,
    #[error("invalid key-value pairs")]
    InvalidFieldPairs,
    #[error("invalid list of stream keys and ids")]
    InvalidStreamList,
    #[error("ERR syntax error")]
    SyntaxError,
    #[error("ERR EXEC without MULTI")]
    ExecWithoutMulti,
    #[error("ERR DISCARD without MULTI")]
    DiscardWithoutMulti,
    #[error("ERR Invalid data type for key")]
    WrongType,
    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,
    #[error("ERR invalid range")]
    InvalidRange,
    #[error("ERR system clock error")]
    Clock,
    #[error("{0}")]
    StreamId(#[from] StreamIdError),
}

impl CommandError {
    /// Renders the error as the frame written back to the client.
    pub fn to_resp(&self) -> RespValue {
        RespValue::Error(self.to_string())
    }
}

impl From<StoreError> for CommandError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::WrongType => CommandError::WrongType,
            StoreError::NotAnInteger => CommandError::NotAnInteger,
            StoreError::InvalidRange => CommandError::InvalidRange,
            StoreError::StreamId(err) => CommandError::StreamId(err),
            StoreError::Clock => CommandError::Clock,
        }
    }
}
