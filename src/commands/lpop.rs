use bytes::Bytes;

use crate::commands::{arg_str, command_error::CommandError};
use crate::resp::RespValue;
use crate::store::Store;

pub async fn lpop(store: &Store, args: &[Bytes]) -> Result<RespValue, CommandError> {
    if args.is_empty() {
        return Err(CommandError::InvalidCommand);
    }

    let count = match args.get(1) {
        Some(_) => arg_str(args, 1)?
            .parse::<usize>()
            .map_err(|_| CommandError::InvalidCount)?,
        None => 1,
    };

    let mut removed = store.lpop(&args[0], count).await?;

    // Nothing removed answers null; exactly one element answers a plain bulk
    // string; more come back as an array in pop order.
    match removed.len() {
        0 => Ok(RespValue::NullBulkString),
        1 => Ok(RespValue::BulkString(removed.remove(0))),
        _ => Ok(RespValue::bulk_array(removed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arg(data: &str) -> Bytes {
        Bytes::copy_from_slice(data.as_bytes())
    }

    async fn seed(store: &Store) {
        store
            .push(&arg("l"), vec![arg("a"), arg("b"), arg("c")], false)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_lpop_single() {
        let store = Store::new();
        seed(&store).await;

        let reply = lpop(&store, &[arg("l")]).await.unwrap();
        assert_eq!(reply.encode(), b"$1\r\na\r\n");
        assert_eq!(store.llen(&arg("l")).await, Ok(2));
    }

    #[tokio::test]
    async fn test_lpop_with_count() {
        let store = Store::new();
        seed(&store).await;

        let reply = lpop(&store, &[arg("l"), arg("2")]).await.unwrap();
        assert_eq!(reply.encode(), b"*2\r\n$1\r\na\r\n$1\r\nb\r\n");
    }

    #[tokio::test]
    async fn test_lpop_missing_key() {
        let store = Store::new();

        let reply = lpop(&store, &[arg("missing")]).await.unwrap();
        assert_eq!(reply.encode(), b"$-1\r\n");
    }

    #[tokio::test]
    async fn test_lpop_bad_count() {
        let store = Store::new();

        assert_eq!(
            lpop(&store, &[arg("l"), arg("x")]).await,
            Err(CommandError::InvalidCount)
        );
    }
}
