mod blpop;
mod command_error;
mod command_handler;
mod echo;
mod get;
mod incr;
mod llen;
mod lpop;
mod lrange;
mod rpush_and_lpush;
mod set;
mod stream_utils;
mod type_command;
mod xadd;
mod xrange;
mod xread;

pub use command_error::CommandError;
pub use command_handler::{dispatch, Command};

use bytes::Bytes;

/// Reads an argument that must be valid UTF-8 (command keywords, numbers,
/// stream identifiers). Keys and values never go through here.
pub(crate) fn arg_str(args: &[Bytes], index: usize) -> Result<&str, CommandError> {
    std::str::from_utf8(&args[index]).map_err(|_| CommandError::InvalidCommand)
}
