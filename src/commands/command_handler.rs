use bytes::Bytes;

use crate::commands::{
    blpop::blpop,
    command_error::CommandError,
    echo::echo,
    get::get,
    incr::incr,
    llen::llen,
    lpop::lpop,
    lrange::lrange,
    rpush_and_lpush::{lpush, rpush},
    set::set,
    type_command::type_command,
    xadd::xadd,
    xrange::xrange,
    xread::xread,
};
use crate::resp::RespValue;
use crate::store::Store;

/// A parsed client command: an uppercased name plus its raw arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct Command {
    pub name: String,
    pub args: Vec<Bytes>,
}

impl Command {
    /// Builds a command from a decoded frame.
    ///
    /// A command must be a non-empty array of bulk strings; anything else is
    /// rejected. The name is matched case-insensitively, the arguments stay
    /// as raw bytes.
    pub fn from_frame(frame: RespValue) -> Result<Self, CommandError> {
        let RespValue::Array(elements) = frame else {
            return Err(CommandError::InvalidCommand);
        };

        let mut items = Vec::with_capacity(elements.len());
        for element in elements {
            let RespValue::BulkString(data) = element else {
                return Err(CommandError::InvalidCommand);
            };
            items.push(data);
        }

        let name = match items.first() {
            Some(first) => std::str::from_utf8(first)
                .map_err(|_| CommandError::InvalidCommand)?
                .to_uppercase(),
            None => return Err(CommandError::InvalidCommand),
        };

        let args = items.split_off(1);

        Ok(Command { name, args })
    }
}

/// Runs a command against the store and returns the reply frame.
///
/// Errors never propagate past this point; they come back as RESP error
/// frames so the connection stays usable. `allow_blocking` is false while a
/// transaction body executes, which forces BLPOP and XREAD into their
/// non-blocking behavior.
pub async fn dispatch(command: &Command, store: &Store, allow_blocking: bool) -> RespValue {
    // One command, one critical section on the access gate. Inside a
    // transaction the caller already holds the exclusive side, and the
    // blocking commands take the shared side around their own store
    // touches so they never hold it while suspended.
    let gated = allow_blocking && !matches!(command.name.as_str(), "BLPOP" | "XREAD");
    let _shared = if gated {
        Some(store.shared_access().await)
    } else {
        None
    };

    let result = match command.name.as_str() {
        "PING" => Ok(RespValue::SimpleString("PONG".to_string())),
        "ECHO" => echo(&command.args),
        "GET" => get(store, &command.args).await,
        "SET" => set(store, &command.args).await,
        "INCR" => incr(store, &command.args).await,
        "RPUSH" => rpush(store, &command.args).await,
        "LPUSH" => lpush(store, &command.args).await,
        "LRANGE" => lrange(store, &command.args).await,
        "LLEN" => llen(store, &command.args).await,
        "LPOP" => lpop(store, &command.args).await,
        "BLPOP" => blpop(store, &command.args, allow_blocking).await,
        "TYPE" => type_command(store, &command.args).await,
        "XADD" => xadd(store, &command.args).await,
        "XRANGE" => xrange(store, &command.args).await,
        "XREAD" => xread(store, &command.args, allow_blocking).await,
        _ => Err(CommandError::UnknownCommand),
    };

    result.unwrap_or_else(|err| err.to_resp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk(data: &str) -> RespValue {
        RespValue::BulkString(Bytes::copy_from_slice(data.as_bytes()))
    }

    #[test]
    fn test_from_frame() {
        let frame = RespValue::Array(vec![bulk("set"), bulk("key"), bulk("value")]);

        let command = Command::from_frame(frame).unwrap();

        assert_eq!(command.name, "SET");
        assert_eq!(
            command.args,
            vec![Bytes::from_static(b"key"), Bytes::from_static(b"value")]
        );
    }

    #[test]
    fn test_from_frame_rejects_malformed_input() {
        let test_cases = vec![
            RespValue::SimpleString("PING".to_string()),
            RespValue::Integer(42),
            RespValue::Array(vec![]),
            RespValue::Array(vec![bulk("GET"), RespValue::Integer(1)]),
        ];

        for frame in test_cases {
            assert_eq!(
                Command::from_frame(frame.clone()),
                Err(CommandError::InvalidCommand),
                "parsing {:?}",
                frame
            );
        }
    }

    #[tokio::test]
    async fn test_dispatch_unknown_command() {
        let store = Store::new();
        let command = Command {
            name: "FLUSHALL".to_string(),
            args: vec![],
        };

        let reply = dispatch(&command, &store, true).await;

        assert_eq!(reply, RespValue::Error("ERR unknown command".to_string()));
    }

    #[tokio::test]
    async fn test_dispatch_ping() {
        let store = Store::new();
        let command = Command {
            name: "PING".to_string(),
            args: vec![],
        };

        let reply = dispatch(&command, &store, true).await;

        assert_eq!(reply, RespValue::SimpleString("PONG".to_string()));
    }
}
