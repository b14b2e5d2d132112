//! Per-connection request loop
//!
//! Every accepted socket gets one task running `handle_connection`:
//! - a writer task drains the connection's outbound channel into the socket,
//!   so acks, errors and deliveries share one ordered stream
//! - the reader loop decodes one frame at a time and routes it to the broker
//! - after `subscribe` the loop holds until the registration is dropped by
//!   the broker, still watching the socket so a disconnect is seen at once
//! - on every exit path the client is removed from all registries

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::broker::Broker;
use crate::client::{Client, ClientId, Released};
use crate::transport::codec::{self, FrameReader};
use crate::transport::message::{ClientRequest, ServerMessage};
use crate::utils::BrokerError;

/// How a subscribed wait ended.
#[derive(Debug, PartialEq, Eq)]
enum Hold {
    /// The broker dropped the registration; keep serving requests.
    Released,
    /// The peer closed the stream.
    Closed,
}

/// Runs its closure when dropped, whichever way the connection task ends.
struct Deregister<F: Fn()>(F);

impl<F: Fn()> Drop for Deregister<F> {
    fn drop(&mut self) {
        (self.0)()
    }
}

/// Deregisters `client_id` everywhere. Safe to call any number of times;
/// the writer calls it on a failed write and the reader again on exit, since
/// a request buffered before the failure may still register the client.
pub(super) fn cleanup_hook(
    broker: Arc<Broker>,
    client_id: ClientId,
) -> impl Fn() + Clone + Send + 'static {
    move || broker.cleanup_client(&client_id)
}

pub async fn handle_connection(stream: TcpStream, broker: Arc<Broker>, max_frame_bytes: usize) {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let (read_half, write_half) = stream.into_split();

    let (tx, rx) = mpsc::unbounded_channel::<ServerMessage>();
    let client = Client::new(tx);
    let client_id = client.id.clone();
    info!("New connection from {peer} ({client_id})");

    let do_cleanup = cleanup_hook(broker.clone(), client_id.clone());

    let writer = tokio::spawn(write_loop(
        write_half,
        rx,
        client_id.clone(),
        do_cleanup.clone(),
    ));

    {
        let _deregister = Deregister(do_cleanup);
        let mut frames = FrameReader::with_limit(read_half, max_frame_bytes);
        match dispatch(&mut frames, &client, &broker).await {
            Ok(()) => info!("Connection closed for {peer} ({client_id})"),
            Err(e) => warn!("Error handling client {peer} ({client_id}): {e}"),
        }
    }

    // With the client deregistered everywhere this was the last sender, so
    // the writer flushes what is queued and shuts the socket down.
    drop(client);
    if let Err(e) = writer.await {
        warn!("Writer task for {client_id} failed: {e}");
    }
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<ServerMessage>,
    client_id: String,
    do_cleanup: impl Fn(),
) {
    while let Some(msg) = rx.recv().await {
        if let Err(e) = write_record(&mut writer, &msg).await {
            warn!("Failed to send message to {client_id}: {e}");
            // stop routing deliveries into a dead socket
            do_cleanup();
            break;
        }
    }
    let _ = writer.shutdown().await;
    debug!("Send loop closed for {client_id}");
}

async fn write_record(writer: &mut OwnedWriteHalf, msg: &ServerMessage) -> io::Result<()> {
    let bytes = codec::encode_response(msg)?;
    writer.write_all(&bytes).await
}

/// Serve requests until the peer closes the stream or an I/O error occurs.
async fn dispatch<R>(
    frames: &mut FrameReader<R>,
    client: &Client,
    broker: &Broker,
) -> Result<(), BrokerError>
where
    R: AsyncRead + Unpin,
{
    loop {
        let frame = match frames.next_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                // the rest of the stream cannot be framed; tell the peer and close
                let _ = reply(client, ServerMessage::error(e.to_string(), None));
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };
        let request = match codec::decode_request(&frame) {
            Ok(request) => request,
            Err(e) => {
                warn!("Protocol error from {}: {e}", client.id);
                let message_id = e.message_id().map(str::to_string);
                reply(client, ServerMessage::error(e.to_string(), message_id))?;
                continue;
            }
        };

        match request {
            ClientRequest::Publish {
                topic,
                message,
                mode,
                message_id,
            } => {
                debug!("Received message for topic {topic}: {message} (mode={mode})");
                let id = broker.publish(mode, &topic, message, message_id);
                reply(client, ServerMessage::ack(id))?;
            }
            ClientRequest::Subscribe { topic, mode } => {
                info!("Client {} subscribed to {topic} (mode={mode})", client.id);
                let released = broker.subscribe(mode, &topic, client);
                if hold_subscription(frames, client, &topic, released).await? == Hold::Closed {
                    return Ok(());
                }
                debug!("Client {} released from {topic}", client.id);
            }
            ClientRequest::Ack { message_id } => {
                info!(
                    "Received ACK from {} for message {}",
                    client.id,
                    message_id.as_deref().unwrap_or("<none>")
                );
            }
        }
    }
}

/// Wait until the registration behind `released` is dropped or the peer
/// goes away. Requests arriving meanwhile are refused.
async fn hold_subscription<R>(
    frames: &mut FrameReader<R>,
    client: &Client,
    topic: &str,
    mut released: Released,
) -> Result<Hold, BrokerError>
where
    R: AsyncRead + Unpin,
{
    loop {
        tokio::select! {
            _ = &mut released => return Ok(Hold::Released),
            frame = frames.next_frame() => match frame? {
                None => return Ok(Hold::Closed),
                Some(frame) => {
                    warn!("{} sent a request while subscribed to {topic}; ignoring", client.id);
                    reply(
                        client,
                        ServerMessage::error(
                            format!("connection is subscribed to {topic}; request ignored"),
                            codec::request_message_id(&frame),
                        ),
                    )?;
                }
            },
        }
    }
}

/// Queue a response on the client's own connection. Failure means the
/// connection itself is gone.
fn reply(client: &Client, msg: ServerMessage) -> Result<(), BrokerError> {
    client.send(msg).map_err(|_| {
        BrokerError::Connection(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "outbound channel closed",
        ))
    })
}
