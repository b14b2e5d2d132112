//! Message definitions for the broker
//!
//! `Message` is the unit stored in topic backlogs and queue FIFOs. It is an
//! opaque payload paired with a broker-assigned id; once created it is never
//! modified.
//!
//! `Mode` selects the delivery semantics of a request: fan-out to every
//! subscriber (`pubsub`) or single-consumer hand-off (`queue`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub payload: String,
    pub message_id: String,
}

impl Message {
    /// Build a message, generating an id when the publisher did not supply one.
    pub fn new(payload: impl Into<String>, message_id: Option<String>) -> Self {
        Self {
            payload: payload.into(),
            message_id: message_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(generate_message_id),
        }
    }
}

pub fn generate_message_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    PubSub,
    Queue,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::PubSub => "pubsub",
            Mode::Queue => "queue",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pubsub" => Ok(Mode::PubSub),
            "queue" => Ok(Mode::Queue),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}
