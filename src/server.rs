//! ChatServer implementation
//!
//! Owns the registry and configuration for the process and runs the
//! TCP accept loop, spawning one handler task per connection.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::handler::handle_connection;
use crate::registry::Registry;

/// The chat server entry point
pub struct ChatServer {
    registry: Arc<Registry>,
    config: Arc<ServerConfig>,
}

impl ChatServer {
    /// Build the registry (with its startup room) from `config`
    pub async fn new(config: ServerConfig) -> Result<Self, AppError> {
        let registry = Registry::start(&config).await?;
        Ok(Self {
            registry,
            config: Arc::new(config),
        })
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener, AppError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("Chat server listening on {}", listener.local_addr()?);
        Ok(listener)
    }

    /// Accept connections until the process ends
    pub async fn run(self, listener: TcpListener) {
        info!("ChatServer started");

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    info!("New connection from {}", addr);
                    let registry = self.registry.clone();
                    let config = self.config.clone();

                    // Spawn handler task for each connection
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, registry, config).await {
                            error!("Connection handler error for {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}
