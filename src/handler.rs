//! Connection handler
//!
//! Handles individual client connections over any duplex byte stream:
//! line framing, the reader/router loop, and the mailbox writer task.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{AnyDelimiterCodec, FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::registry::Registry;
use crate::router::Router;
use crate::session::Mailbox;

/// Handle a new connection
///
/// Registers a session, sends the greeting, then routes inbound lines
/// until the transport closes or fails. The session always leaves its
/// room before its mailbox is released.
pub async fn handle_connection<S>(
    stream: S,
    registry: Arc<Registry>,
    config: Arc<ServerConfig>,
) -> Result<(), AppError>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (reader, writer) = tokio::io::split(stream);
    // Split on raw bytes so invalid UTF-8 is replaced rather than fatal
    let mut lines = FramedRead::new(
        reader,
        AnyDelimiterCodec::new_with_max_length(
            b"\n".to_vec(),
            b"\n".to_vec(),
            config.max_line_length,
        ),
    );
    let mut sink = FramedWrite::new(writer, LinesCodec::new());

    // Create channel for server -> client lines
    let (mailbox, mut outbox) = Mailbox::channel(config.mailbox_capacity);
    let session = registry.register(mailbox).await;
    let session_id = session.id();
    info!(session = %session_id, username = session.username(), "Client connected");

    // Spawn write task (mailbox -> transport)
    let mut write_task = tokio::spawn(async move {
        while let Some(line) = outbox.recv().await {
            if let Err(e) = sink.send(line).await {
                debug!(session = %session_id, error = %e, "Transport write failed");
                break;
            }
        }
        debug!(session = %session_id, "Write task ended");

        let _ = SinkExt::<String>::close(&mut sink).await;
    });

    let mut router = Router::new(registry, session);
    let mut writer_done = false;

    let mut result = router.greet(&config.server_name).await;
    if result.is_ok() {
        result = loop {
            tokio::select! {
                frame = lines.next() => match frame {
                    Some(Ok(chunk)) => {
                        let text = String::from_utf8_lossy(&chunk);
                        let line = text.strip_suffix('\r').unwrap_or(&text);
                        if let Err(e) = router.handle_line(line).await {
                            break Err(e);
                        }
                    }
                    Some(Err(e)) => {
                        warn!(session = %session_id, error = %e, "Transport read failed");
                        break Err(e.into());
                    }
                    None => {
                        debug!(session = %session_id, "Client closed the connection");
                        break Ok(());
                    }
                },
                joined = &mut write_task => {
                    if let Err(e) = joined {
                        warn!(session = %session_id, error = %e, "Write task failed");
                    }
                    debug!(session = %session_id, "Write task completed first");
                    writer_done = true;
                    break Ok(());
                }
            }
        };
    }

    router.disconnect().await;

    // Every mailbox sender is gone now, so the writer drains and exits
    if !writer_done {
        if let Err(e) = write_task.await {
            warn!(session = %session_id, error = %e, "Write task failed");
        }
    }

    info!(session = %session_id, "Client disconnected");

    result
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::time::timeout;

    use super::*;
    use crate::types::RoomId;

    #[tokio::test]
    async fn test_connection_greets_and_cleans_up() {
        let config = Arc::new(ServerConfig::default());
        let registry = Registry::start(&config).await.unwrap();
        let (client, server) = tokio::io::duplex(4096);

        let handle = tokio::spawn(handle_connection(server, registry.clone(), config));

        let (read_half, mut write_half) = tokio::io::split(client);
        let mut lines = BufReader::new(read_half).lines();

        let first = lines.next_line().await.unwrap();
        assert_eq!(first.as_deref(), Some("=== Welcome to BubbleChat ==="));

        write_half.write_all(b"/join general\n").await.unwrap();
        loop {
            let line = timeout(Duration::from_secs(1), lines.next_line())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            if line == "*** Joined room: General Chat ***" {
                break;
            }
        }

        let general = registry
            .lookup_room(&RoomId::normalize("general"))
            .await
            .unwrap();
        assert_eq!(general.member_count().await, 1);

        drop(write_half);
        drop(lines);

        let result = timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
        assert!(result.is_ok());
        assert_eq!(general.member_count().await, 0);
    }

    #[tokio::test]
    async fn test_overlong_line_closes_connection() {
        let config = Arc::new(ServerConfig {
            max_line_length: 16,
            ..ServerConfig::default()
        });
        let registry = Registry::start(&config).await.unwrap();
        let (mut client, server) = tokio::io::duplex(4096);

        let handle = tokio::spawn(handle_connection(server, registry, config));

        client
            .write_all(b"this line is far longer than sixteen bytes\n")
            .await
            .unwrap();

        let result = timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
        assert!(matches!(result, Err(AppError::Codec(_))));
    }
}
