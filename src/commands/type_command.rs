use bytes::Bytes;

use crate::commands::command_error::CommandError;
use crate::resp::RespValue;
use crate::store::Store;

pub async fn type_command(store: &Store, args: &[Bytes]) -> Result<RespValue, CommandError> {
    if args.is_empty() {
        return Err(CommandError::InvalidCommand);
    }

    let kind = store.kind_of(&args[0]).await;

    Ok(RespValue::SimpleString(kind.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream_id::EntryIdSpec;

    fn arg(data: &str) -> Bytes {
        Bytes::copy_from_slice(data.as_bytes())
    }

    #[tokio::test]
    async fn test_type_command() {
        let store = Store::new();
        store.set(arg("s"), arg("v"), None).await;
        store.push(&arg("l"), vec![arg("a")], false).await.unwrap();
        store
            .xadd(&arg("x"), EntryIdSpec::Auto, vec![(arg("f"), arg("v"))])
            .await
            .unwrap();

        let test_cases = vec![
            ("s", "+string\r\n"),
            ("l", "+list\r\n"),
            ("x", "+stream\r\n"),
            ("missing", "+none\r\n"),
        ];

        for (key, expected) in test_cases {
            let reply = type_command(&store, &[arg(key)]).await.unwrap();
            assert_eq!(reply.encode(), expected.as_bytes(), "TYPE {}", key);
        }
    }
}
