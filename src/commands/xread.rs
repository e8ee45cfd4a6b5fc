use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::commands::{arg_str, command_error::CommandError, stream_utils::entries_reply};
use crate::resp::RespValue;
use crate::store::{Store, StreamEntry};
use crate::stream_id::{RangeId, StreamId};

/// Parsed arguments for XREAD:
/// `XREAD [BLOCK milliseconds] STREAMS key [key ...] id [id ...]`.
#[derive(Debug, PartialEq)]
pub struct XreadArguments {
    /// `None` means non-blocking; `Some(0)` waits forever.
    block_ms: Option<u64>,
    /// Key paired with the raw since-id text (`$` resolves later).
    pairs: Vec<(Bytes, String)>,
}

impl XreadArguments {
    pub fn parse(args: &[Bytes]) -> Result<Self, CommandError> {
        if args.is_empty() {
            return Err(CommandError::InvalidCommand);
        }

        let (block_ms, rest) = match arg_str(args, 0)?.to_uppercase().as_str() {
            "BLOCK" => {
                if args.len() < 3 {
                    return Err(CommandError::InvalidCommand);
                }

                let block_ms = arg_str(args, 1)?
                    .parse::<u64>()
                    .map_err(|_| CommandError::InvalidTimeout)?;

                // The STREAMS keyword is positional and mandatory.
                if arg_str(args, 2)?.to_uppercase() != "STREAMS" {
                    return Err(CommandError::SyntaxError);
                }

                (Some(block_ms), &args[3..])
            }
            "STREAMS" => (None, &args[1..]),
            _ => return Err(CommandError::SyntaxError),
        };

        if rest.is_empty() || rest.len() % 2 != 0 {
            return Err(CommandError::InvalidStreamList);
        }

        let half = rest.len() / 2;
        let mut pairs = Vec::with_capacity(half);
        for index in 0..half {
            let id = std::str::from_utf8(&rest[half + index])
                .map_err(|_| CommandError::InvalidStreamList)?
                .to_string();
            pairs.push((rest[index].clone(), id));
        }

        Ok(Self { block_ms, pairs })
    }
}

/// Handles the XREAD command.
///
/// Answers every entry newer than the given since-id for each stream, in
/// input order, skipping streams with nothing new. With no results and no
/// BLOCK option the reply is a null array. With BLOCK the caller registers a
/// waiter per stream and suspends until an append wakes it or the timeout
/// (milliseconds, 0 waits forever) runs out, then re-scans.
///
/// A since-id of `$` means "entries appended after now" and resolves to the
/// stream's current top identifier before any waiting starts.
pub async fn xread(
    store: &Store,
    args: &[Bytes],
    allow_blocking: bool,
) -> Result<RespValue, CommandError> {
    let arguments = XreadArguments::parse(args)?;

    let mut watches = Vec::with_capacity(arguments.pairs.len());
    for (key, raw_id) in &arguments.pairs {
        let since = if raw_id == "$" {
            store
                .last_stream_id(key)
                .await?
                .unwrap_or(StreamId::ZERO)
        } else {
            RangeId::parse(raw_id)?.start_bound()
        };

        watches.push((key.clone(), since));
    }

    let results = scan_streams(store, &watches, allow_blocking).await?;
    if !results.is_empty() {
        return Ok(streams_reply(results));
    }

    let Some(block_ms) = arguments.block_ms else {
        return Ok(RespValue::NullArray);
    };

    if !allow_blocking {
        return Ok(RespValue::NullArray);
    }

    // All per-key waiters share one channel; whichever stream grows first
    // wakes the caller.
    let (tx, mut rx) = mpsc::channel(watches.len().max(1));
    let _waiters: Vec<_> = watches
        .iter()
        .map(|(key, since)| store.stream_waiter(key, *since, tx.clone()))
        .collect();
    drop(tx);

    // An append that landed between the scan and the registrations has
    // missed the waiters, so look once more before suspending.
    let results = scan_streams(store, &watches, allow_blocking).await?;
    if !results.is_empty() {
        return Ok(streams_reply(results));
    }

    let woken = match block_ms {
        0 => rx.recv().await.is_some(),
        ms => matches!(timeout(Duration::from_millis(ms), rx.recv()).await, Ok(Some(()))),
    };

    if !woken {
        return Ok(RespValue::NullArray);
    }

    let results = scan_streams(store, &watches, allow_blocking).await?;
    if results.is_empty() {
        Ok(RespValue::NullArray)
    } else {
        Ok(streams_reply(results))
    }
}

/// One scan over every watched stream inside its own shared-access window
/// (skipped inside a transaction, where the caller already holds the
/// exclusive side), so a reader never sees half of another client's batch
/// and never holds the gate while suspended.
async fn scan_streams(
    store: &Store,
    watches: &[(Bytes, StreamId)],
    gated: bool,
) -> Result<Vec<(Bytes, Vec<StreamEntry>)>, CommandError> {
    let _shared = if gated {
        Some(store.shared_access().await)
    } else {
        None
    };

    let mut results = Vec::new();

    for (key, since) in watches {
        let entries = store.entries_after(key, *since).await?;
        if !entries.is_empty() {
            results.push((key.clone(), entries));
        }
    }

    Ok(results)
}

fn streams_reply(results: Vec<(Bytes, Vec<StreamEntry>)>) -> RespValue {
    let items = results
        .into_iter()
        .map(|(key, entries)| {
            RespValue::Array(vec![RespValue::BulkString(key), entries_reply(&entries)])
        })
        .collect();

    RespValue::Array(items)
}
