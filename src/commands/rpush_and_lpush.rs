use bytes::Bytes;

use crate::commands::command_error::CommandError;
use crate::resp::RespValue;
use crate::store::Store;

/// Parsed arguments shared by RPUSH and LPUSH: a key plus one or more
/// values.
pub struct PushArguments {
    key: Bytes,
    values: Vec<Bytes>,
}

impl PushArguments {
    pub fn parse(args: &[Bytes]) -> Result<Self, CommandError> {
        if args.len() < 2 {
            return Err(CommandError::InvalidCommand);
        }

        Ok(Self {
            key: args[0].clone(),
            values: args[1..].to_vec(),
        })
    }
}

/// Appends the values to the tail of the list, creating it when absent.
pub async fn rpush(store: &Store, args: &[Bytes]) -> Result<RespValue, CommandError> {
    push(store, args, false).await
}

/// Prepends the values one at a time, so the last argument becomes the head.
pub async fn lpush(store: &Store, args: &[Bytes]) -> Result<RespValue, CommandError> {
    push(store, args, true).await
}

async fn push(store: &Store, args: &[Bytes], front: bool) -> Result<RespValue, CommandError> {
    let arguments = PushArguments::parse(args)?;

    let length = store
        .push(&arguments.key, arguments.values, front)
        .await?;

    Ok(RespValue::Integer(length as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arg(data: &str) -> Bytes {
        Bytes::copy_from_slice(data.as_bytes())
    }

    #[tokio::test]
    async fn test_rpush_then_lpush() {
        let store = Store::new();

        let reply = rpush(&store, &[arg("l"), arg("b"), arg("c")]).await.unwrap();
        assert_eq!(reply, RespValue::Integer(2));

        let reply = lpush(&store, &[arg("l"), arg("a")]).await.unwrap();
        assert_eq!(reply, RespValue::Integer(3));

        assert_eq!(
            store.lrange(&arg("l"), 0, -1).await,
            Ok(vec![arg("a"), arg("b"), arg("c")])
        );
    }

    #[tokio::test]
    async fn test_push_requires_a_value() {
        let store = Store::new();

        assert_eq!(
            rpush(&store, &[arg("l")]).await,
            Err(CommandError::InvalidCommand)
        );
    }

    #[tokio::test]
    async fn test_push_against_string_key() {
        let store = Store::new();
        store.set(arg("s"), arg("v"), None).await;

        assert_eq!(
            rpush(&store, &[arg("s"), arg("a")]).await,
            Err(CommandError::WrongType)
        );
    }
}
