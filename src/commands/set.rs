use std::time::Duration;

use bytes::Bytes;

use crate::commands::{arg_str, command_error::CommandError};
use crate::resp::RespValue;
use crate::store::Store;

/// Parsed arguments for SET: `SET key value [EX seconds | PX milliseconds]`.
#[derive(Debug, PartialEq)]
pub struct SetArguments {
    key: Bytes,
    value: Bytes,
    ttl: Option<Duration>,
}

impl SetArguments {
    pub fn parse(args: &[Bytes]) -> Result<Self, CommandError> {
        if args.len() < 2 {
            return Err(CommandError::InvalidCommand);
        }

        let mut ttl = None;

        if args.len() > 2 {
            if args.len() != 4 {
                return Err(CommandError::InvalidCommand);
            }

            let flag = arg_str(args, 2)?.to_uppercase();
            let amount = arg_str(args, 3)?
                .parse::<i64>()
                .map_err(|_| CommandError::InvalidExpiryValue)?;

            let millis = match flag.as_str() {
                "EX" => amount.saturating_mul(1000),
                "PX" => amount,
                _ => return Err(CommandError::InvalidExpiryFlag),
            };

            // Only a positive deadline schedules a removal.
            if millis > 0 {
                ttl = Some(Duration::from_millis(millis as u64));
            }
        }

        Ok(Self {
            key: args[0].clone(),
            value: args[1].clone(),
            ttl,
        })
    }
}

pub async fn set(store: &Store, args: &[Bytes]) -> Result<RespValue, CommandError> {
    let arguments = SetArguments::parse(args)?;

    store
        .set(arguments.key, arguments.value, arguments.ttl)
        .await;

    Ok(RespValue::SimpleString("OK".to_string()))
}
