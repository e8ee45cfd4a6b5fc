use bytes::Bytes;

use crate::commands::command_error::CommandError;
use crate::resp::RespValue;
use crate::store::Store;

pub async fn llen(store: &Store, args: &[Bytes]) -> Result<RespValue, CommandError> {
    if args.is_empty() {
        return Err(CommandError::InvalidCommand);
    }

    let length = store.llen(&args[0]).await?;

    Ok(RespValue::Integer(length as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arg(data: &str) -> Bytes {
        Bytes::copy_from_slice(data.as_bytes())
    }

    #[tokio::test]
    async fn test_llen() {
        let store = Store::new();
        store
            .push(&arg("l"), vec![arg("a"), arg("b")], false)
            .await
            .unwrap();

        assert_eq!(llen(&store, &[arg("l")]).await, Ok(RespValue::Integer(2)));
        assert_eq!(
            llen(&store, &[arg("missing")]).await,
            Ok(RespValue::Integer(0))
        );
    }
}
