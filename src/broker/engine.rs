//! Broker engine
//!
//! This module contains the broker state responsible for:
//! - managing pub/sub topics (backlog + subscribers) and point-to-point
//!   queues (pending FIFO + consumers)
//! - fanning published messages out to subscribers and handing queued
//!   messages to the head consumer
//! - writing a snapshot of the affected topic/queue after every mutation and
//!   restoring all snapshots on startup
//!
//! Concurrency and usage notes:
//! - `Broker` is shared as `Arc<Broker>`; its methods take `&self`. Each
//!   topic and queue has its own lock (see `Registry`), held for the whole
//!   mutate + deliver + snapshot sequence so that deliveries and snapshots of
//!   one name are totally ordered.
//! - Deliveries only push into a connection's outbound channel, so no lock is
//!   ever held across network I/O and a slow subscriber cannot stall a
//!   publisher.
//! - Snapshot failures are logged and never undo the in-memory change.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, error, info, warn};

use crate::broker::message::{Message, Mode};
use crate::broker::queue::Queue;
use crate::broker::registry::{Registry, lock};
use crate::broker::topic::Topic;
use crate::client::{Client, ClientId, Released};
use crate::config::BrokerSettings;
use crate::persistence::SnapshotStore;
use crate::utils::BrokerError;

/// Size of one topic or queue at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryStatus {
    /// Backlog length for a topic, pending length for a queue.
    pub messages: usize,
    /// Subscriber or consumer registrations.
    pub clients: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrokerStatus {
    pub topics: BTreeMap<String, EntryStatus>,
    pub queues: BTreeMap<String, EntryStatus>,
}

#[derive(Debug)]
pub struct Broker {
    topics: Registry<Topic>,
    queues: Registry<Queue>,
    store: SnapshotStore,
    settings: BrokerSettings,
}

impl Broker {
    pub fn new(store: SnapshotStore, settings: BrokerSettings) -> Self {
        Self {
            topics: Registry::default(),
            queues: Registry::default(),
            store,
            settings,
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Load every snapshot found on disk into the registries. Returns the
    /// number of messages restored.
    pub fn restore(&self) -> Result<usize, BrokerError> {
        let mut restored = 0;
        for snapshot in self.store.load_all()? {
            restored += snapshot.messages.len();
            match snapshot.mode {
                Mode::PubSub => {
                    let entry = self
                        .topics
                        .get_or_insert_with(&snapshot.name, || Topic::new(&snapshot.name));
                    let mut topic = lock(&entry);
                    topic.backlog.extend(snapshot.messages);
                    let evicted = topic.enforce_retention(self.settings.backlog_limit());
                    if evicted > 0 {
                        restored -= evicted;
                        self.persist_topic(&topic);
                    }
                }
                Mode::Queue => {
                    let entry = self
                        .queues
                        .get_or_insert_with(&snapshot.name, || Queue::new(&snapshot.name));
                    lock(&entry).pending.extend(snapshot.messages);
                }
            }
        }
        Ok(restored)
    }

    /// Publish `payload` to `topic` under `mode` and return the message id
    /// (the caller's, or a generated one).
    pub fn publish(
        &self,
        mode: Mode,
        topic: &str,
        payload: String,
        message_id: Option<String>,
    ) -> String {
        let message = Message::new(payload, message_id);
        match mode {
            Mode::PubSub => self.publish_to_topic(topic, message),
            Mode::Queue => self.enqueue(topic, message),
        }
    }

    fn publish_to_topic(&self, name: &str, message: Message) -> String {
        let entry = self.topics.get_or_insert_with(name, || Topic::new(name));
        let mut topic = lock(&entry);

        let id = topic.publish(message.clone(), self.settings.backlog_limit());
        let delivered = topic.fan_out(&message);
        debug!(topic = name, message_id = %id, delivered, "published");

        self.persist_topic(&topic);
        id
    }

    fn enqueue(&self, name: &str, message: Message) -> String {
        let entry = self.queues.get_or_insert_with(name, || Queue::new(name));
        let mut queue = lock(&entry);

        let id = queue.enqueue(message);
        let delivered = queue.drain();
        debug!(queue = name, message_id = %id, delivered, "enqueued");

        self.persist_queue(&queue);
        id
    }

    /// Register `client` on `topic`. For pub/sub the backlog is replayed
    /// first; for queues any pending messages are handed off. The returned
    /// receiver resolves once the registration is removed again.
    pub fn subscribe(&self, mode: Mode, topic: &str, client: &Client) -> Released {
        let (registration, released) = client.register();
        match mode {
            Mode::PubSub => {
                let entry = self.topics.get_or_insert_with(topic, || Topic::new(topic));
                match lock(&entry).subscribe(registration) {
                    Ok(replayed) => {
                        debug!(topic, client_id = %client.id, replayed, "subscriber registered")
                    }
                    Err(e) => warn!("Error sending backlog of '{topic}' to new subscriber: {e}"),
                }
            }
            Mode::Queue => {
                let entry = self.queues.get_or_insert_with(topic, || Queue::new(topic));
                let mut queue = lock(&entry);
                queue.register_consumer(registration);
                let delivered = queue.drain();
                debug!(queue = topic, client_id = %client.id, delivered, "consumer registered");
                if delivered > 0 {
                    self.persist_queue(&queue);
                }
            }
        }
        released
    }

    /// Remove `client_id`'s registrations from one topic or queue.
    pub fn unsubscribe(&self, mode: Mode, topic: &str, client_id: &ClientId) -> usize {
        match mode {
            Mode::PubSub => self
                .topics
                .get(topic)
                .map_or(0, |entry| lock(&entry).unsubscribe(client_id)),
            Mode::Queue => self
                .queues
                .get(topic)
                .map_or(0, |entry| lock(&entry).deregister_consumer(client_id)),
        }
    }

    /// Removes a client from every topic and queue it is registered with.
    /// Called when its connection ends.
    pub fn cleanup_client(&self, client_id: &ClientId) {
        for (name, entry) in self.topics.entries() {
            if lock(&entry).unsubscribe(client_id) > 0 {
                debug!("Unsubscribed {client_id} from topic {name}");
            }
        }
        for (name, entry) in self.queues.entries() {
            if lock(&entry).deregister_consumer(client_id) > 0 {
                debug!("Removed {client_id} as consumer of queue {name}");
            }
        }
        info!("Cleaned up client {client_id}");
    }

    pub fn status(&self) -> BrokerStatus {
        let topics = self
            .topics
            .entries()
            .into_iter()
            .map(|(name, entry)| {
                let topic = lock(&entry);
                let status = EntryStatus {
                    messages: topic.backlog.len(),
                    clients: topic.subscribers.len(),
                };
                (name, status)
            })
            .collect();
        let queues = self
            .queues
            .entries()
            .into_iter()
            .map(|(name, entry)| {
                let queue = lock(&entry);
                let status = EntryStatus {
                    messages: queue.pending.len(),
                    clients: queue.consumers.len(),
                };
                (name, status)
            })
            .collect();
        BrokerStatus { topics, queues }
    }

    /// Log the broker status every `interval`. Runs until the task is dropped.
    pub async fn start_status_loop(broker: Arc<Broker>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let status = broker.status();
            info!(
                topics = status.topics.len(),
                queues = status.queues.len(),
                "Queue status: {status:?}"
            );
        }
    }

    fn persist_topic(&self, topic: &Topic) {
        let saved = blocking_io(|| self.store.save(Mode::PubSub, &topic.name, &topic.backlog));
        if let Err(e) = saved {
            error!("Failed to persist topic '{}': {e}", topic.name);
        }
    }

    fn persist_queue(&self, queue: &Queue) {
        let saved = blocking_io(|| self.store.save(Mode::Queue, &queue.name, &queue.pending));
        if let Err(e) = saved {
            error!("Failed to persist queue '{}': {e}", queue.name);
        }
    }
}

/// Run synchronous file I/O. On a multi-threaded runtime the worker hands its
/// other tasks off first; elsewhere (current-thread runtime, no runtime) `f`
/// runs inline.
fn blocking_io<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}
