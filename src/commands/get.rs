use bytes::Bytes;

use crate::commands::command_error::CommandError;
use crate::resp::RespValue;
use crate::store::Store;

pub async fn get(store: &Store, args: &[Bytes]) -> Result<RespValue, CommandError> {
    if args.is_empty() {
        return Err(CommandError::InvalidCommand);
    }

    match store.get(&args[0]).await? {
        Some(value) => Ok(RespValue::BulkString(value)),
        None => Ok(RespValue::NullBulkString),
    }
}
