use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::broker::message::Message;
use crate::transport::message::ServerMessage;
use crate::utils::BrokerError;

pub type ClientId = String;

/// Resolves (with an error, since nothing is ever sent) once the matching
/// `Registration` has been dropped by its registry.
pub type Released = oneshot::Receiver<()>;

/// Represents a connected client in the broker.
///
/// Cloning is cheap: every clone shares the same outbound channel, so a
/// client can sit in several topic and queue registries at once.
#[derive(Debug, Clone)]
pub struct Client {
    /// Unique identifier for the connection.
    pub id: ClientId,

    /// Outbound channel drained by the connection's writer task.
    pub sender: UnboundedSender<ServerMessage>,
}

impl Client {
    pub fn new(sender: UnboundedSender<ServerMessage>) -> Self {
        Self {
            id: format!("client-{}", Uuid::new_v4()),
            sender,
        }
    }

    /// Queue a record for this connection. Fails only when the writer side
    /// of the connection is gone.
    pub fn send(&self, msg: ServerMessage) -> Result<(), BrokerError> {
        self.sender.send(msg).map_err(|_| BrokerError::Delivery {
            client_id: self.id.clone(),
        })
    }

    /// Create a registry entry for this client together with the receiver
    /// that fires when the entry is removed.
    pub fn register(&self) -> (Registration, Released) {
        let (release, released) = oneshot::channel();
        (
            Registration {
                client: self.clone(),
                _release: release,
            },
            released,
        )
    }
}

/// One subscriber or consumer slot in a topic or queue.
#[derive(Debug)]
pub struct Registration {
    client: Client,
    _release: oneshot::Sender<()>,
}

impl Registration {
    pub fn client_id(&self) -> &ClientId {
        &self.client.id
    }

    /// Push a message delivery for `topic` to this registration's client.
    pub fn deliver(&self, topic: &str, message: &Message) -> Result<(), BrokerError> {
        self.client.send(ServerMessage::delivery(topic, message))
    }
}
