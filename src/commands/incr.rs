use bytes::Bytes;

use crate::commands::command_error::CommandError;
use crate::resp::RespValue;
use crate::store::Store;

pub async fn incr(store: &Store, args: &[Bytes]) -> Result<RespValue, CommandError> {
    if args.is_empty() {
        return Err(CommandError::InvalidCommand);
    }

    let value = store.incr(&args[0]).await?;

    Ok(RespValue::Integer(value))
}
