//! Point-to-point queues
//!
//! A `Queue` is a FIFO of pending messages plus an ordered list of consumer
//! registrations. Each message goes to exactly one consumer: always the
//! earliest-registered live one.
//!
//! A message whose hand-off fails is put back at the head of the FIFO before
//! the failing consumer is removed, so nothing is lost. The price is that a
//! message may be delivered twice if the consumer received it but its
//! connection failed right afterwards.

use std::collections::VecDeque;

use tracing::warn;

use crate::broker::message::Message;
use crate::client::{ClientId, Registration};

/// Outcome of a single `try_deliver` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Nothing pending or no consumer registered.
    Idle,
    Delivered {
        message_id: String,
        client_id: ClientId,
    },
    /// The head consumer could not be reached and was removed; the message
    /// is back at the head of the queue.
    Failed { client_id: ClientId },
}

#[derive(Debug, Default)]
pub struct Queue {
    pub name: String,
    pub pending: VecDeque<Message>,
    pub consumers: Vec<Registration>,
}

impl Queue {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            pending: VecDeque::new(),
            consumers: Vec::new(),
        }
    }

    /// Append to the FIFO tail and return the message id.
    pub fn enqueue(&mut self, message: Message) -> String {
        let id = message.message_id.clone();
        self.pending.push_back(message);
        id
    }

    pub fn register_consumer(&mut self, registration: Registration) {
        self.consumers.push(registration);
    }

    /// Remove every consumer slot held by `client_id`; returns how many.
    pub fn deregister_consumer(&mut self, client_id: &ClientId) -> usize {
        let before = self.consumers.len();
        self.consumers.retain(|c| c.client_id() != client_id);
        before - self.consumers.len()
    }

    /// Hand the head message to the first consumer.
    pub fn try_deliver(&mut self) -> Delivery {
        if self.consumers.is_empty() {
            return Delivery::Idle;
        }
        let Some(message) = self.pending.pop_front() else {
            return Delivery::Idle;
        };

        let consumer = &self.consumers[0];
        match consumer.deliver(&self.name, &message) {
            Ok(()) => Delivery::Delivered {
                message_id: message.message_id,
                client_id: consumer.client_id().clone(),
            },
            Err(e) => {
                warn!("Error delivering to queue consumer of '{}': {e}", self.name);
                self.pending.push_front(message);
                let failed = self.consumers.remove(0);
                Delivery::Failed {
                    client_id: failed.client_id().clone(),
                }
            }
        }
    }

    /// Call `try_deliver` until nothing more can be handed off; returns the
    /// number of messages delivered.
    pub fn drain(&mut self) -> usize {
        let mut delivered = 0;
        loop {
            match self.try_deliver() {
                Delivery::Idle => return delivered,
                Delivery::Delivered { .. } => delivered += 1,
                Delivery::Failed { .. } => {}
            }
        }
    }
}
