//! Connection supervisor: accepts sockets and gives each its own task.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::broker::Broker;
use crate::config::ServerSettings;
use crate::transport::connection::handle_connection;

/// Bind the configured address and serve connections until the task is dropped.
pub async fn start_tcp_server(settings: &ServerSettings, broker: Arc<Broker>) -> io::Result<()> {
    let listener = TcpListener::bind(settings.addr()).await?;
    info!("Broker started on {}", listener.local_addr()?);
    serve(listener, broker, settings.max_frame_bytes).await;
    Ok(())
}

/// Accept loop over an already bound listener. Each connection may send
/// request lines of at most `max_frame_bytes`.
pub async fn serve(listener: TcpListener, broker: Arc<Broker>, max_frame_bytes: usize) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                tokio::spawn(handle_connection(stream, broker.clone(), max_frame_bytes));
            }
            Err(e) => {
                // e.g. out of file descriptors; back off instead of spinning
                warn!("Failed to accept connection: {e}");
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
}
