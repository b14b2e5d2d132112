//! The `transport` module is responsible for the network side of the broker.
//!
//! It defines the request/response records, their newline-delimited JSON
//! framing, the per-connection request loop, and the accept loop that
//! spawns one such loop per client.

pub mod codec;
pub mod connection;
pub mod message;
pub mod server;

pub use server::{serve, start_tcp_server};
