use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

use crate::commands::{arg_str, command_error::CommandError};
use crate::resp::RespValue;
use crate::store::Store;

/// Parsed arguments for the BLPOP command.
///
/// The timeout is in seconds and may be fractional; `None` blocks
/// indefinitely (a wire timeout of 0).
#[derive(Debug, PartialEq)]
pub struct BlpopArguments {
    key: Bytes,
    timeout: Option<Duration>,
}

impl BlpopArguments {
    /// Parses `[key, timeout_seconds]`.
    ///
    /// # Returns
    ///
    /// * `Ok(BlpopArguments)` - key plus a non-negative timeout
    /// * `Err(CommandError::InvalidCommand)` - fewer than 2 arguments
    /// * `Err(CommandError::InvalidTimeout)` - timeout not a non-negative
    ///   number
    pub fn parse(args: &[Bytes]) -> Result<Self, CommandError> {
        if args.len() < 2 {
            return Err(CommandError::InvalidCommand);
        }

        let timeout_secs = arg_str(args, 1)?
            .parse::<f64>()
            .map_err(|_| CommandError::InvalidTimeout)?;

        let timeout = if timeout_secs == 0.0 {
            None
        } else {
            // Rejects negative, NaN, infinite and overflowing values.
            Some(
                Duration::try_from_secs_f64(timeout_secs)
                    .map_err(|_| CommandError::InvalidTimeout)?,
            )
        };

        Ok(Self {
            key: args[0].clone(),
            timeout,
        })
    }
}

/// Handles the BLPOP command.
///
/// Pops the head of the list immediately when one is available. Otherwise
/// the caller registers a waiter and suspends until a push signals it or the
/// timeout runs out. A woken waiter re-checks the list and may find it empty
/// again when a faster client claimed the element; it then re-registers with
/// whatever budget is left.
///
/// The re-check between registration and waiting closes the window where a
/// push lands after the first empty pop but before the waiter enters the
/// queue; without it that push's signal would go to nobody and the caller
/// would sleep through a non-empty list.
///
/// Inside a transaction (`allow_blocking == false`) the command never
/// suspends: an empty list answers null right away.
pub async fn blpop(
    store: &Store,
    args: &[Bytes],
    allow_blocking: bool,
) -> Result<RespValue, CommandError> {
    let arguments = BlpopArguments::parse(args)?;

    // Inside a transaction the caller holds exclusive store access, so the
    // pop happens directly and an empty list answers null.
    if !allow_blocking {
        return match store.pop_front(&arguments.key).await? {
            Some(value) => Ok(popped_pair(arguments.key, value)),
            None => Ok(RespValue::NullArray),
        };
    }

    if let Some(value) = gated_pop(store, &arguments.key).await? {
        return Ok(popped_pair(arguments.key, value));
    }

    let deadline = arguments.timeout.map(|timeout| Instant::now() + timeout);

    loop {
        let mut waiter = store.list_waiter(&arguments.key);

        if let Some(value) = gated_pop(store, &arguments.key).await? {
            return Ok(popped_pair(arguments.key, value));
        }

        if !waiter.wait(deadline).await {
            return Ok(RespValue::NullArray);
        }

        if let Some(value) = gated_pop(store, &arguments.key).await? {
            return Ok(popped_pair(arguments.key, value));
        }
    }
}

/// One pop attempt inside its own shared-access window, so the gate is
/// never held while this caller is suspended.
async fn gated_pop(store: &Store, key: &Bytes) -> Result<Option<Bytes>, CommandError> {
    let _shared = store.shared_access().await;
    Ok(store.pop_front(key).await?)
}

fn popped_pair(key: Bytes, value: Bytes) -> RespValue {
    RespValue::bulk_array([key, value])
}
