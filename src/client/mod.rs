//! The `client` module defines the broker-side handle of a live connection.
//!
//! A `Client` is what registries hold instead of the socket itself: an id
//! plus the sending half of the connection's outbound channel. Registries
//! store it wrapped in a `Registration`, whose drop is the signal that
//! releases a connection waiting in the subscribed state.

pub mod pubsub_client;
pub use pubsub_client::{Client, ClientId, Registration, Released};

#[cfg(test)]
mod tests;
