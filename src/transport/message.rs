//! Request and response records exchanged over the wire.
//!
//! Requests are discriminated by `action`, responses by `type`:
//!
//! ```text
//! {"action":"publish","topic":"t","message":"m","mode":"pubsub","message_id":"opt"}
//! {"action":"subscribe","topic":"t","mode":"queue"}
//! {"action":"ack","message_id":"id"}
//!
//! {"type":"ack","message_id":"id"}
//! {"type":"error","error":"reason","message_id":"opt"}
//! {"type":"message","topic":"t","message":"m","message_id":"id"}
//! ```

use serde::{Deserialize, Serialize};

use crate::broker::message::{Message, Mode};

/// A request exactly as it arrived, before validation. Every field is
/// optional so that an unknown action can still be answered with the
/// request's `message_id`.
#[derive(Debug, Default, Deserialize)]
pub struct RawRequest {
    pub action: Option<String>,
    pub topic: Option<String>,
    pub message: Option<String>,
    pub mode: Option<String>,
    pub message_id: Option<String>,
}

/// A validated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRequest {
    Publish {
        topic: String,
        message: String,
        mode: Mode,
        message_id: Option<String>,
    },
    Subscribe {
        topic: String,
        mode: Mode,
    },
    Ack {
        message_id: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Ack {
        message_id: String,
    },
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },
    Message {
        topic: String,
        message: String,
        message_id: String,
    },
}

impl ServerMessage {
    pub fn ack(message_id: impl Into<String>) -> Self {
        Self::Ack {
            message_id: message_id.into(),
        }
    }

    pub fn error(error: impl Into<String>, message_id: Option<String>) -> Self {
        Self::Error {
            error: error.into(),
            message_id,
        }
    }

    pub fn delivery(topic: &str, message: &Message) -> Self {
        Self::Message {
            topic: topic.to_string(),
            message: message.payload.clone(),
            message_id: message.message_id.clone(),
        }
    }
}
