//! RESP protocol codec.
//!
//! Frames start with a one-byte type tag and end with CRLF. Bulk strings and
//! bulk errors carry a byte-count prefix followed by the raw payload, so
//! binary data round-trips unchanged. Arrays nest recursively.
//!
//! Protocol reference: https://redis.io/docs/reference/protocol-spec

use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use tokio::time::timeout;

/// Idle deadline applied to every individual read while decoding a frame.
const READ_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug, PartialEq)]
pub enum RespError {
    #[error("connection closed")]
    ConnectionClosed,
    #[error("read timed out")]
    IdleTimeout,
    #[error("I/O error: {0}")]
    IoError(String),
    #[error("invalid UTF-8 sequence")]
    InvalidUtf8,
    #[error("unknown RESP type")]
    UnknownRespType,
    #[error("failed to parse integer")]
    FailedToParseInteger,
    #[error("failed to parse double")]
    FailedToParseDouble,
    #[error("invalid bulk string")]
    InvalidBulkString,
    #[error("invalid array")]
    InvalidArray,
    #[error("invalid boolean")]
    InvalidBoolean,
    #[error("incomplete frame")]
    IncompleteFrame,
}

impl From<std::io::Error> for RespError {
    fn from(err: std::io::Error) -> Self {
        RespError::IoError(err.to_string())
    }
}

/// A decoded RESP frame.
///
/// `NullBulkString` and `NullArray` are the RESP2 null encodings (`$-1`,
/// `*-1`); `Null` is the RESP3 `_` frame. All three decode to distinct
/// variants so responses can pick the exact wire form they need.
#[derive(Clone, Debug, PartialEq)]
pub enum RespValue {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(Bytes),
    Array(Vec<RespValue>),
    NullBulkString,
    NullArray,
    Null,
    Boolean(bool),
    Double(f64),
    BigNumber(String),
    BulkError(String),
}

impl RespValue {
    /// Builds an array of bulk strings, the shape most list replies use.
    pub fn bulk_array<I>(items: I) -> RespValue
    where
        I: IntoIterator<Item = Bytes>,
    {
        RespValue::Array(items.into_iter().map(RespValue::BulkString).collect())
    }

    /// Encodes the value into its wire representation.
    ///
    /// Length prefixes count bytes, not characters. Doubles use the shortest
    /// representation that round-trips for finite values.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_to(&mut buf);
        buf
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        match self {
            RespValue::SimpleString(s) => {
                buf.push(b'+');
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            RespValue::Error(s) => {
                buf.push(b'-');
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            RespValue::Integer(i) => {
                buf.push(b':');
                buf.extend_from_slice(i.to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            RespValue::BulkString(data) => {
                buf.push(b'$');
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
                buf.extend_from_slice(data);
                buf.extend_from_slice(b"\r\n");
            }
            RespValue::Array(items) => {
                buf.push(b'*');
                buf.extend_from_slice(items.len().to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
                for item in items {
                    item.write_to(buf);
                }
            }
            RespValue::NullBulkString => buf.extend_from_slice(b"$-1\r\n"),
            RespValue::NullArray => buf.extend_from_slice(b"*-1\r\n"),
            RespValue::Null => buf.extend_from_slice(b"_\r\n"),
            RespValue::Boolean(value) => {
                buf.extend_from_slice(if *value { b"#t\r\n" } else { b"#f\r\n" });
            }
            RespValue::Double(value) => {
                buf.push(b',');
                buf.extend_from_slice(format!("{}", value).as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            RespValue::BigNumber(digits) => {
                buf.push(b'(');
                buf.extend_from_slice(digits.as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            RespValue::BulkError(msg) => {
                buf.push(b'!');
                buf.extend_from_slice(msg.len().to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
                buf.extend_from_slice(msg.as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
        }
    }
}

/// Reads exactly one frame from the stream.
///
/// Each individual read is bounded by a 10 second idle deadline; exceeding
/// it yields [`RespError::IdleTimeout`]. End-of-stream before the first byte
/// yields [`RespError::ConnectionClosed`]; end-of-stream mid-frame yields
/// [`RespError::IncompleteFrame`]. Callers close the connection on any of
/// these without writing a reply.
pub async fn read_value<R>(reader: &mut R) -> Result<RespValue, RespError>
where
    R: AsyncBufRead + Unpin + Send,
{
    let line = read_line(reader).await?;

    let tag = match line.as_bytes().first() {
        Some(tag) if tag.is_ascii() => *tag,
        _ => return Err(RespError::UnknownRespType),
    };
    let payload = &line[1..];

    match tag {
        b'+' => Ok(RespValue::SimpleString(payload.to_string())),
        b'-' => Ok(RespValue::Error(payload.to_string())),
        b':' => {
            let value = payload
                .parse::<i64>()
                .map_err(|_| RespError::FailedToParseInteger)?;
            Ok(RespValue::Integer(value))
        }
        b'$' => {
            let length = payload
                .parse::<i64>()
                .map_err(|_| RespError::InvalidBulkString)?;

            if length == -1 {
                return Ok(RespValue::NullBulkString);
            }

            let data = read_payload(reader, length).await?;
            Ok(RespValue::BulkString(data))
        }
        b'!' => {
            let length = payload
                .parse::<i64>()
                .map_err(|_| RespError::InvalidBulkString)?;

            if length == -1 {
                return Ok(RespValue::Null);
            }

            let data = read_payload(reader, length).await?;
            let msg = String::from_utf8(data.to_vec()).map_err(|_| RespError::InvalidUtf8)?;
            Ok(RespValue::BulkError(msg))
        }
        b'*' => {
            let count = payload
                .parse::<i64>()
                .map_err(|_| RespError::InvalidArray)?;

            if count == -1 {
                return Ok(RespValue::NullArray);
            }

            if count < 0 {
                return Err(RespError::InvalidArray);
            }

            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let item = Box::pin(read_value(reader)).await?;
                items.push(item);
            }

            Ok(RespValue::Array(items))
        }
        b'_' => {
            if !payload.is_empty() {
                return Err(RespError::UnknownRespType);
            }
            Ok(RespValue::Null)
        }
        b'#' => match payload {
            "t" => Ok(RespValue::Boolean(true)),
            "f" => Ok(RespValue::Boolean(false)),
            _ => Err(RespError::InvalidBoolean),
        },
        b',' => {
            let value = payload
                .parse::<f64>()
                .map_err(|_| RespError::FailedToParseDouble)?;
            Ok(RespValue::Double(value))
        }
        // Big numbers can fall outside 64 bits, so the digits stay as text.
        b'(' => Ok(RespValue::BigNumber(payload.to_string())),
        _ => Err(RespError::UnknownRespType),
    }
}

/// Reads one CRLF-terminated line, without the terminator.
async fn read_line<R>(reader: &mut R) -> Result<String, RespError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();

    let read = timeout(READ_IDLE_TIMEOUT, reader.read_until(b'\n', &mut buf))
        .await
        .map_err(|_| RespError::IdleTimeout)??;

    if read == 0 {
        return Err(RespError::ConnectionClosed);
    }

    if buf.len() < 2 || buf[buf.len() - 2..] != *b"\r\n" {
        return Err(RespError::IncompleteFrame);
    }

    buf.truncate(buf.len() - 2);
    String::from_utf8(buf).map_err(|_| RespError::InvalidUtf8)
}

/// Reads exactly `length` payload bytes plus the trailing CRLF.
async fn read_payload<R>(reader: &mut R, length: i64) -> Result<Bytes, RespError>
where
    R: AsyncBufRead + Unpin,
{
    if length < 0 {
        return Err(RespError::InvalidBulkString);
    }

    let mut buf = vec![0u8; length as usize + 2];

    timeout(READ_IDLE_TIMEOUT, reader.read_exact(&mut buf))
        .await
        .map_err(|_| RespError::IdleTimeout)?
        .map_err(|err| match err.kind() {
            std::io::ErrorKind::UnexpectedEof => RespError::IncompleteFrame,
            _ => RespError::IoError(err.to_string()),
        })?;

    if buf[buf.len() - 2..] != *b"\r\n" {
        return Err(RespError::InvalidBulkString);
    }

    buf.truncate(buf.len() - 2);
    Ok(Bytes::from(buf))
}
