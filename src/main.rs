//! Multi-room Chat Server - Entry Point
//!
//! Builds the registry, binds the TCP listener, and accepts connections.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use room_chat_server::{ChatServer, ServerArgs};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=room_chat_server=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("room_chat_server=info")),
        )
        .init();

    let config = ServerArgs::parse().into_config();

    let server = ChatServer::new(config).await?;
    let listener = server.bind().await?;

    server.run(listener).await;

    Ok(())
}
