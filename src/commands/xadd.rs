use bytes::Bytes;

use crate::commands::{arg_str, command_error::CommandError};
use crate::resp::RespValue;
use crate::store::Store;
use crate::stream_id::EntryIdSpec;

/// Parsed arguments for XADD: a key, a candidate identifier and the entry's
/// field-value pairs in the order they were given.
#[derive(Debug, PartialEq)]
pub struct XaddArguments {
    key: Bytes,
    id: EntryIdSpec,
    fields: Vec<(Bytes, Bytes)>,
}

impl XaddArguments {
    /// Parses `[key, id, field1, value1, field2, value2, ...]`.
    ///
    /// At least one field-value pair is required and pairs must be complete,
    /// so the argument count is even and at least 4.
    pub fn parse(args: &[Bytes]) -> Result<Self, CommandError> {
        if args.len() < 4 {
            return Err(CommandError::InvalidCommand);
        }

        if args[2..].len() % 2 != 0 {
            return Err(CommandError::InvalidFieldPairs);
        }

        let id = EntryIdSpec::parse(arg_str(args, 1)?)?;

        let fields = args[2..]
            .chunks(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect();

        Ok(Self {
            key: args[0].clone(),
            id,
            fields,
        })
    }
}

/// Handles the XADD command.
///
/// Appends an entry to the stream, creating it when absent, and answers the
/// concrete identifier that was stored. The identifier must come out
/// strictly greater than the stream's current top item; wildcard halves are
/// resolved by the store.
pub async fn xadd(store: &Store, args: &[Bytes]) -> Result<RespValue, CommandError> {
    let arguments = XaddArguments::parse(args)?;

    let id = store
        .xadd(&arguments.key, arguments.id, arguments.fields)
        .await?;

    Ok(RespValue::BulkString(Bytes::from(id.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream_id::StreamIdError;

    fn arg(data: &str) -> Bytes {
        Bytes::copy_from_slice(data.as_bytes())
    }

    #[test]
    fn test_parse() {
        assert!(XaddArguments::parse(&[arg("s"), arg("*"), arg("f"), arg("v")]).is_ok());
        assert!(
            XaddArguments::parse(&[arg("s"), arg("1-1"), arg("f"), arg("v"), arg("g"), arg("w")])
                .is_ok()
        );

        assert_eq!(
            XaddArguments::parse(&[arg("s"), arg("*")]),
            Err(CommandError::InvalidCommand)
        );
        assert_eq!(
            XaddArguments::parse(&[arg("s"), arg("*"), arg("f"), arg("v"), arg("dangling")]),
            Err(CommandError::InvalidFieldPairs)
        );
        assert_eq!(
            XaddArguments::parse(&[arg("s"), arg("bogus"), arg("f"), arg("v")]),
            Err(CommandError::StreamId(StreamIdError::InvalidFormat))
        );
    }

    #[tokio::test]
    async fn test_xadd_explicit_id() {
        let store = Store::new();

        let reply = xadd(&store, &[arg("s"), arg("1-1"), arg("k"), arg("v")])
            .await
            .unwrap();
        assert_eq!(reply.encode(), b"$3\r\n1-1\r\n");

        let reply = xadd(&store, &[arg("s"), arg("1-1"), arg("k"), arg("v")]).await;
        assert_eq!(
            reply,
            Err(CommandError::StreamId(StreamIdError::IdTooSmall))
        );

        let reply = xadd(&store, &[arg("s"), arg("0-0"), arg("k"), arg("v")]).await;
        assert_eq!(reply, Err(CommandError::StreamId(StreamIdError::IdIsZero)));
    }

    #[tokio::test]
    async fn test_xadd_auto_sequence() {
        let store = Store::new();

        xadd(&store, &[arg("s"), arg("5-5"), arg("k"), arg("v")])
            .await
            .unwrap();

        let reply = xadd(&store, &[arg("s"), arg("5-*"), arg("k"), arg("v")])
            .await
            .unwrap();
        assert_eq!(reply.encode(), b"$3\r\n5-6\r\n");
    }
}
