//! # msg-broker
//!
//! `msg_broker` is a minimal message broker serving two delivery semantics
//! over one TCP listener:
//!
//! - **pub/sub**: a published message is fanned out to every current
//!   subscriber of the topic and kept in the topic's backlog, which is
//!   replayed to every new subscriber.
//! - **queue**: a published message waits in a FIFO until it is handed to
//!   exactly one consumer, the earliest-registered live one.
//!
//! Clients speak newline-delimited JSON. Every topic and queue is snapshotted
//! to disk after each change and restored on startup.
//!
//! ## Core Modules
//!
//! - `broker`: topics, queues and the engine that routes messages between them.
//! - `client`: the broker-side handle of a connection.
//! - `config`: layered settings (defaults, file, environment).
//! - `persistence`: the per-topic/queue snapshot files.
//! - `transport`: wire records, framing, the per-connection loop and the listener.
//! - `utils`: error taxonomy and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod persistence;
pub mod transport;
pub mod utils;
