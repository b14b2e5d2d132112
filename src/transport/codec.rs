//! Newline-delimited JSON framing.
//!
//! Each record is one JSON object followed by `\n`. JSON encoders never emit
//! a raw newline inside a record, so the delimiter is unambiguous and a
//! frame boundary never depends on how TCP segments the stream.

use std::io;
use std::mem;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use crate::broker::message::Mode;
use crate::config::DEFAULT_MAX_FRAME_BYTES;
use crate::transport::message::{ClientRequest, RawRequest, ServerMessage};
use crate::utils::BrokerError;

/// Reads delimiter-terminated frames from a byte stream.
///
/// `next_frame` is cancel safe: a partially read frame stays buffered and is
/// completed by the next call, so it can sit in a `select!`.
///
/// A frame longer than `max_len` bytes, not counting the `\n`, is an
/// `InvalidData` error; the stream cannot be resynchronised after it.
#[derive(Debug)]
pub struct FrameReader<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    max_len: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_limit(inner, DEFAULT_MAX_FRAME_BYTES)
    }

    pub fn with_limit(inner: R, max_len: usize) -> Self {
        Self {
            reader: BufReader::new(inner),
            buf: Vec::new(),
            max_len,
        }
    }

    /// Next non-blank frame without its terminator, or `None` at end of stream.
    pub async fn next_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            // never buffer more than one byte past the limit
            let room = (self.max_len + 1).saturating_sub(self.buf.len()) as u64;
            let n = (&mut self.reader)
                .take(room)
                .read_until(b'\n', &mut self.buf)
                .await?;
            let at_eof = n == 0;
            if at_eof && self.buf.is_empty() {
                return Ok(None);
            }
            if !at_eof && !self.buf.ends_with(b"\n") {
                if self.buf.len() > self.max_len {
                    self.buf.clear();
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("frame exceeds {} bytes", self.max_len),
                    ));
                }
                continue;
            }

            let mut frame = mem::take(&mut self.buf);
            while matches!(frame.last(), Some(b'\n' | b'\r')) {
                frame.pop();
            }
            if frame.iter().all(u8::is_ascii_whitespace) {
                if at_eof {
                    return Ok(None);
                }
                continue;
            }
            return Ok(Some(frame));
        }
    }
}

/// Decode and validate one request frame.
pub fn decode_request(frame: &[u8]) -> Result<ClientRequest, BrokerError> {
    let raw: RawRequest = serde_json::from_slice(frame)
        .map_err(|e| BrokerError::protocol(format!("Invalid message format: {e}"), None))?;
    let message_id = raw.message_id.clone();

    match raw.action.as_deref() {
        Some("publish") => {
            let topic = require_topic(raw.topic, &message_id)?;
            let mode = parse_mode(raw.mode.as_deref(), &message_id)?;
            let message = raw.message.ok_or_else(|| {
                BrokerError::protocol("publish requires a message", message_id.clone())
            })?;
            Ok(ClientRequest::Publish {
                topic,
                message,
                mode,
                message_id,
            })
        }
        Some("subscribe") => {
            let topic = require_topic(raw.topic, &message_id)?;
            let mode = parse_mode(raw.mode.as_deref(), &message_id)?;
            Ok(ClientRequest::Subscribe { topic, mode })
        }
        Some("ack") => Ok(ClientRequest::Ack { message_id }),
        Some(other) => Err(BrokerError::protocol(
            format!("Unknown action: {other}"),
            message_id,
        )),
        None => Err(BrokerError::protocol("Missing action", message_id)),
    }
}

/// Best-effort extraction of a frame's `message_id`, for error replies.
pub fn request_message_id(frame: &[u8]) -> Option<String> {
    serde_json::from_slice::<RawRequest>(frame)
        .ok()
        .and_then(|raw| raw.message_id)
}

/// Encode one response record including its terminator.
pub fn encode_response(msg: &ServerMessage) -> Result<Vec<u8>, serde_json::Error> {
    let mut bytes = serde_json::to_vec(msg)?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn require_topic(topic: Option<String>, message_id: &Option<String>) -> Result<String, BrokerError> {
    let topic = topic.unwrap_or_default();
    if topic.is_empty() {
        return Err(BrokerError::protocol("topic is required", message_id.clone()));
    }
    // Topic names end up in snapshot file names.
    if topic == "." || topic == ".." || topic.contains(['/', '\\', '\0']) {
        return Err(BrokerError::protocol(
            format!("invalid topic name: {topic:?}"),
            message_id.clone(),
        ));
    }
    Ok(topic)
}

fn parse_mode(mode: Option<&str>, message_id: &Option<String>) -> Result<Mode, BrokerError> {
    match mode {
        None => Ok(Mode::default()),
        Some(mode) => mode
            .parse()
            .map_err(|reason: String| BrokerError::protocol(reason, message_id.clone())),
    }
}
