use bytes::Bytes;

use crate::commands::{arg_str, command_error::CommandError};
use crate::resp::RespValue;
use crate::store::Store;

pub async fn lrange(store: &Store, args: &[Bytes]) -> Result<RespValue, CommandError> {
    if args.len() < 3 {
        return Err(CommandError::InvalidCommand);
    }

    let start = arg_str(args, 1)?
        .parse::<i64>()
        .map_err(|_| CommandError::InvalidStartIndex)?;
    let stop = arg_str(args, 2)?
        .parse::<i64>()
        .map_err(|_| CommandError::InvalidStopIndex)?;

    let range = store.lrange(&args[0], start, stop).await?;

    Ok(RespValue::bulk_array(range))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arg(data: &str) -> Bytes {
        Bytes::copy_from_slice(data.as_bytes())
    }

    #[tokio::test]
    async fn test_lrange() {
        let store = Store::new();
        store
            .push(&arg("l"), vec![arg("a"), arg("b"), arg("c")], false)
            .await
            .unwrap();

        let reply = lrange(&store, &[arg("l"), arg("0"), arg("-1")])
            .await
            .unwrap();
        assert_eq!(reply.encode(), b"*3\r\n$1\r\na\r\n$1\r\nb\r\n$1\r\nc\r\n");

        let reply = lrange(&store, &[arg("missing"), arg("0"), arg("-1")])
            .await
            .unwrap();
        assert_eq!(reply.encode(), b"*0\r\n");
    }

    #[tokio::test]
    async fn test_lrange_bad_indices() {
        let store = Store::new();

        assert_eq!(
            lrange(&store, &[arg("l"), arg("x"), arg("1")]).await,
            Err(CommandError::InvalidStartIndex)
        );
        assert_eq!(
            lrange(&store, &[arg("l"), arg("0"), arg("x")]).await,
            Err(CommandError::InvalidStopIndex)
        );
    }
}
