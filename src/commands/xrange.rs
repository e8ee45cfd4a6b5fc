use bytes::Bytes;

use crate::commands::{arg_str, command_error::CommandError, stream_utils::entries_reply};
use crate::resp::RespValue;
use crate::store::Store;
use crate::stream_id::RangeId;

/// Handles the XRANGE command.
///
/// Answers the stream entries with identifiers inside the inclusive
/// `[start, end]` range. `-` stands for the smallest possible identifier and
/// `+` for the largest; a boundary without a sequence number covers every
/// sequence at its timestamp.
pub async fn xrange(store: &Store, args: &[Bytes]) -> Result<RespValue, CommandError> {
    if args.len() < 3 {
        return Err(CommandError::InvalidCommand);
    }

    let start = match arg_str(args, 1)? {
        "-" => RangeId { ms: 0, seq: None },
        input => RangeId::parse(input)?,
    };

    let end = match arg_str(args, 2)? {
        "+" => RangeId {
            ms: u64::MAX,
            seq: None,
        },
        input => RangeId::parse(input)?,
    };

    let entries = store.xrange(&args[0], start, end).await?;

    Ok(entries_reply(&entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arg(data: &str) -> Bytes {
        Bytes::copy_from_slice(data.as_bytes())
    }

    async fn seed(store: &Store) {
        for id in ["1-1", "1-2", "2-0"] {
            store
                .xadd(
                    &arg("s"),
                    crate::stream_id::EntryIdSpec::parse(id).unwrap(),
                    vec![(arg("n"), arg(id))],
                )
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_xrange_inclusive() {
        let store = Store::new();
        seed(&store).await;

        let reply = xrange(&store, &[arg("s"), arg("1-1"), arg("1-2")])
            .await
            .unwrap();
        let encoded = reply.encode();
        let text = String::from_utf8_lossy(&encoded);

        assert!(text.starts_with("*2\r\n"));
        assert!(text.contains("1-1"));
        assert!(text.contains("1-2"));
        assert!(!text.contains("2-0"));
    }

    #[tokio::test]
    async fn test_xrange_full_span() {
        let store = Store::new();
        seed(&store).await;

        let reply = xrange(&store, &[arg("s"), arg("-"), arg("+")]).await.unwrap();
        assert!(reply.encode().starts_with(b"*3\r\n"));
    }

    #[tokio::test]
    async fn test_xrange_inverted_bounds() {
        let store = Store::new();
        seed(&store).await;

        assert_eq!(
            xrange(&store, &[arg("s"), arg("2"), arg("1")]).await,
            Err(CommandError::InvalidRange)
        );
    }

    #[tokio::test]
    async fn test_xrange_missing_key() {
        let store = Store::new();

        let reply = xrange(&store, &[arg("missing"), arg("-"), arg("+")])
            .await
            .unwrap();
        assert_eq!(reply.encode(), b"*0\r\n");
    }
}
