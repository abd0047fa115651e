//! Server configuration
//!
//! `ServerConfig` is the plain settings struct the library consumes.
//! `ServerArgs` is its command line / environment front end.

use clap::Parser;

use crate::room::DEFAULT_ROOM_QUEUE_CAPACITY;
use crate::session::DEFAULT_MAILBOX_CAPACITY;

/// Default server address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Default maximum inbound line length in bytes
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the listener binds to
    pub bind_addr: String,
    /// Name shown in the welcome banner
    pub server_name: String,
    /// Capacity of each session's outbound mailbox
    pub mailbox_capacity: usize,
    /// Capacity of each room's inbound event queue
    pub room_queue_capacity: usize,
    /// Longest accepted inbound line; longer lines close the connection
    pub max_line_length: usize,
    /// Id of the room that exists at startup
    pub default_room_id: String,
    /// Display name of the room that exists at startup
    pub default_room_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_ADDR.to_string(),
            server_name: "BubbleChat".to_string(),
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            room_queue_capacity: DEFAULT_ROOM_QUEUE_CAPACITY,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            default_room_id: "general".to_string(),
            default_room_name: "General Chat".to_string(),
        }
    }
}

/// Command line arguments for the server binary
#[derive(Parser, Debug)]
#[command(name = "room_chat_server", about = "Multi-room line-based chat server", version)]
pub struct ServerArgs {
    /// Address to listen on
    #[arg(long, env = "ROOM_CHAT_BIND", default_value = DEFAULT_ADDR)]
    pub bind: String,

    /// Name shown in the welcome banner
    #[arg(long, env = "ROOM_CHAT_SERVER_NAME", default_value = "BubbleChat")]
    pub server_name: String,

    /// Outbound lines buffered per client before new ones are dropped
    #[arg(long, env = "ROOM_CHAT_MAILBOX_CAPACITY", default_value_t = DEFAULT_MAILBOX_CAPACITY)]
    pub mailbox_capacity: usize,

    /// Events buffered per room before senders wait
    #[arg(long, env = "ROOM_CHAT_ROOM_QUEUE_CAPACITY", default_value_t = DEFAULT_ROOM_QUEUE_CAPACITY)]
    pub room_queue_capacity: usize,

    /// Longest accepted input line in bytes
    #[arg(long, env = "ROOM_CHAT_MAX_LINE_LENGTH", default_value_t = DEFAULT_MAX_LINE_LENGTH)]
    pub max_line_length: usize,
}

impl ServerArgs {
    pub fn into_config(self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.bind,
            server_name: self.server_name,
            mailbox_capacity: self.mailbox_capacity,
            room_queue_capacity: self.room_queue_capacity,
            max_line_length: self.max_line_length,
            ..ServerConfig::default()
        }
    }
}
