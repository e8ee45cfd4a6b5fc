use bytes::Bytes;

use crate::commands::command_error::CommandError;
use crate::resp::RespValue;

pub fn echo(args: &[Bytes]) -> Result<RespValue, CommandError> {
    if args.is_empty() {
        return Err(CommandError::InvalidCommand);
    }

    Ok(RespValue::BulkString(args[0].clone()))
}
