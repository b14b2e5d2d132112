//! The `error` module defines the error taxonomy shared by the broker.
//!
//! Each variant is scoped to what it can break:
//! - `Protocol`: one request was undecodable or invalid; the connection stays open.
//! - `Delivery`: a write to one subscriber/consumer failed; that recipient is dropped.
//! - `Connection`: the connection's own stream failed; only that connection ends.
//! - `Persistence`: a snapshot could not be written or read; memory state is kept.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::client::ClientId;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("{reason}")]
    Protocol {
        reason: String,
        message_id: Option<String>,
    },

    #[error("delivery to {client_id} failed: connection closed")]
    Delivery { client_id: ClientId },

    #[error("connection error: {0}")]
    Connection(#[from] io::Error),

    #[error("snapshot {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl BrokerError {
    pub fn protocol(reason: impl Into<String>, message_id: Option<String>) -> Self {
        Self::Protocol {
            reason: reason.into(),
            message_id,
        }
    }

    /// The request id a protocol error should be reported against.
    pub fn message_id(&self) -> Option<&str> {
        match self {
            Self::Protocol { message_id, .. } => message_id.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn persistence(path: impl Into<PathBuf>, source: impl Into<io::Error>) -> Self {
        Self::Persistence {
            path: path.into(),
            source: source.into(),
        }
    }
}
