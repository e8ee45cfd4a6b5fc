//! An in-memory key-value server speaking the RESP protocol.
//!
//! This crate provides a single-node cache server supporting:
//!
//! - Basic key-value operations (GET, SET with TTL, INCR)
//! - List operations (LPUSH, RPUSH, LPOP, BLPOP, LRANGE, LLEN)
//! - Stream operations (XADD, XRANGE, XREAD with blocking reads)
//! - Command-queuing transactions (MULTI, EXEC, DISCARD)
//!
//! Clients talk RESP over TCP and each connection runs in its own async
//! task on top of Tokio, sharing one typed store.

pub mod commands;
pub mod connection;
pub mod resp;
pub mod server;
pub mod store;
pub mod stream_id;
