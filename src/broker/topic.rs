//! Topic management
//!
//! A `Topic` is one pub/sub channel: the backlog of messages published to it
//! and the ordered list of subscriber registrations. Every newly registered
//! subscriber is first sent the full backlog, then receives new messages as
//! they are fanned out.
//!
//! Duplicate subscriptions from the same client are kept as separate entries
//! and each one receives its own copy of every message.
//!
//! Concurrency note: callers must hold the topic's lock (see `Registry`) for
//! the whole publish + fan-out so that every subscriber sees one order.

use std::collections::VecDeque;

use tracing::warn;

use crate::broker::message::Message;
use crate::client::{ClientId, Registration};
use crate::utils::BrokerError;

#[derive(Debug, Default)]
pub struct Topic {
    pub name: String,
    pub backlog: VecDeque<Message>,
    pub subscribers: Vec<Registration>,
}

impl Topic {
    /// Create a new topic with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            backlog: VecDeque::new(),
            subscribers: Vec::new(),
        }
    }

    /// Append `message` to the backlog and return its id. With `max_backlog`
    /// set, the oldest entries are evicted to stay within it.
    pub fn publish(&mut self, message: Message, max_backlog: Option<usize>) -> String {
        let id = message.message_id.clone();
        self.backlog.push_back(message);
        self.enforce_retention(max_backlog);
        id
    }

    /// Drop the oldest backlog entries beyond `max_backlog`; returns how many.
    pub fn enforce_retention(&mut self, max_backlog: Option<usize>) -> usize {
        let Some(max) = max_backlog else {
            return 0;
        };
        let excess = self.backlog.len().saturating_sub(max);
        self.backlog.drain(..excess);
        excess
    }

    /// Replay the backlog to `registration`, then add it to the subscribers.
    /// If the replay fails the registration is dropped instead.
    pub fn subscribe(&mut self, registration: Registration) -> Result<usize, BrokerError> {
        for message in &self.backlog {
            registration.deliver(&self.name, message)?;
        }
        let replayed = self.backlog.len();
        self.subscribers.push(registration);
        Ok(replayed)
    }

    /// Remove every registration held by `client_id`; returns how many.
    pub fn unsubscribe(&mut self, client_id: &ClientId) -> usize {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.client_id() != client_id);
        before - self.subscribers.len()
    }

    /// Deliver `message` to every subscriber in registration order. Failed
    /// subscribers are removed; returns the number of successful deliveries.
    pub fn fan_out(&mut self, message: &Message) -> usize {
        let name = &self.name;
        self.subscribers
            .retain(|subscriber| match subscriber.deliver(name, message) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Error notifying subscriber of '{name}': {e}");
                    false
                }
            });
        self.subscribers.len()
    }
}
