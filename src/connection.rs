//! Per-connection read loop and transaction state machine.
//!
//! A connection is either in normal mode, where commands run as they
//! arrive, or in queuing mode between MULTI and EXEC/DISCARD, where they are
//! buffered and answered `+QUEUED`. EXEC runs the buffer in order and
//! answers one array holding each command's reply; errors become error
//! frames inside that array rather than failing the EXEC.

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

use crate::commands::{dispatch, Command, CommandError};
use crate::resp::{self, RespError, RespValue};
use crate::store::Store;

enum SessionMode {
    Normal,
    Queuing(Vec<Command>),
}

/// Drives one client connection until it disconnects or misbehaves.
///
/// Replies are written in request order by this task alone. Protocol
/// errors, the per-read idle timeout and write failures all end the loop;
/// none of them gets a reply frame.
pub async fn handle_connection(stream: TcpStream, store: Store) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut mode = SessionMode::Normal;

    loop {
        let frame = match resp::read_value(&mut reader).await {
            Ok(frame) => frame,
            Err(RespError::ConnectionClosed) => {
                debug!("client disconnected");
                return;
            }
            Err(err) => {
                debug!("closing connection: {}", err);
                return;
            }
        };

        let reply = match Command::from_frame(frame) {
            Ok(command) => apply_command(command, &store, &mut mode).await,
            Err(err) => err.to_resp(),
        };

        if let Err(err) = write_half.write_all(&reply.encode()).await {
            debug!("write failed: {}", err);
            return;
        }
    }
}

async fn apply_command(command: Command, store: &Store, mode: &mut SessionMode) -> RespValue {
    match mode {
        SessionMode::Normal => match command.name.as_str() {
            "MULTI" => {
                *mode = SessionMode::Queuing(Vec::new());
                RespValue::SimpleString("OK".to_string())
            }
            "EXEC" => CommandError::ExecWithoutMulti.to_resp(),
            "DISCARD" => CommandError::DiscardWithoutMulti.to_resp(),
            _ => dispatch(&command, store, true).await,
        },
        SessionMode::Queuing(buffer) => match command.name.as_str() {
            "EXEC" => {
                let queued = std::mem::take(buffer);
                *mode = SessionMode::Normal;

                // Exclusive store access for the whole batch: no other
                // client's command lands between two queued commands.
                let _exclusive = store.exclusive_access().await;

                let mut results = Vec::with_capacity(queued.len());
                for queued_command in &queued {
                    // Blocking commands must not suspend a transaction body.
                    results.push(dispatch(queued_command, store, false).await);
                }

                RespValue::Array(results)
            }
            "DISCARD" => {
                *mode = SessionMode::Normal;
                RespValue::SimpleString("OK".to_string())
            }
            // Anything else is buffered, a nested MULTI included; EXEC and
            // DISCARD are the only exits from queuing mode.
            _ => {
                buffer.push(command);
                RespValue::SimpleString("QUEUED".to_string())
            }
        },
    }
}
