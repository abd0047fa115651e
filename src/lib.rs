//! Multi-room Line Chat Server Library
//!
//! A TCP chat server where clients pick a display name, join named rooms,
//! and broadcast newline-terminated text to everyone else in the room.
//!
//! # Features
//! - Room listing, creation (with auto-join), joining and leaving
//! - Globally unique display names, lobby included
//! - Per-room ordered fan-out of chat and membership notices
//! - Drop-on-full outbound mailboxes, so a slow reader never stalls a room
//!
//! # Architecture
//! Tasks and shared state:
//! - `Registry` is the process-wide directory of rooms and session names,
//!   built by the entry point and passed to every connection as `Arc<Registry>`
//! - Each connection has a reader task running its `Router` and a writer
//!   task draining its `Mailbox`
//! - Each `Room` has a broadcaster task draining its event queue
//!
//! Lock order is registry first, then a room's member lock.
//!
//! # Example
//! ```ignore
//! use room_chat_server::{ChatServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = ChatServer::new(ServerConfig::default()).await?;
//!     let listener = server.bind().await?;
//!     server.run(listener).await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod registry;
pub mod room;
pub mod router;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use config::{ServerArgs, ServerConfig};
pub use error::{AppError, ErrorKind, SendError};
pub use handler::handle_connection;
pub use message::{Command, RoomEvent, RoomEventKind, ServerMessage};
pub use registry::{Registry, RoomSummary};
pub use room::Room;
pub use router::{Router, RouterState};
pub use server::ChatServer;
pub use session::{Mailbox, Session};
pub use types::{RoomId, SessionId};
