//! Session struct definition
//!
//! Represents a connected client with its identity, current room,
//! and outbound mailbox.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::room::Room;
use crate::types::SessionId;

/// Default mailbox capacity (lines)
pub const DEFAULT_MAILBOX_CAPACITY: usize = 10;

/// Sending half of a session's bounded outbound queue
///
/// Rooms hold clones of this to fan out events. The writer task holds
/// the receiving half and ends once every clone is dropped.
#[derive(Debug, Clone)]
pub struct Mailbox {
    sender: mpsc::Sender<String>,
}

impl Mailbox {
    /// Create a mailbox and the receiver the writer task drains
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Non-blocking delivery; the line is dropped if the mailbox is full
    pub fn deliver(&self, line: String) -> Result<(), SendError> {
        self.sender.try_send(line).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::MailboxFull,
            mpsc::error::TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }

    /// Blocking delivery, waits for space
    pub async fn send(&self, line: String) -> Result<(), SendError> {
        self.sender
            .send(line)
            .await
            .map_err(|_| SendError::ChannelClosed)
    }
}

/// Server-side state for one connected client
///
/// Owned by the connection task. A session is in at most one room;
/// `room` is only changed by [`Room::join`] and [`Room::leave`].
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    username: String,
    room: Option<Arc<Room>>,
    mailbox: Mailbox,
}

impl Session {
    /// Create a session in the lobby with its default display name
    pub fn new(id: SessionId, mailbox: Mailbox) -> Self {
        Self {
            id,
            username: id.default_username(),
            room: None,
            mailbox,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// The room this session is in, `None` in the lobby
    pub fn room(&self) -> Option<&Arc<Room>> {
        self.room.as_ref()
    }

    pub fn in_room(&self) -> bool {
        self.room.is_some()
    }

    /// Replace the display name, returning the old one
    pub(crate) fn set_username(&mut self, username: String) -> String {
        std::mem::replace(&mut self.username, username)
    }

    pub(crate) fn set_room(&mut self, room: Option<Arc<Room>>) {
        self.room = room;
    }

    /// Send a line to this session's own mailbox
    ///
    /// Replies to self wait for space rather than drop.
    pub async fn reply(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.mailbox.send(msg.to_string()).await
    }

    /// Send several lines in order
    pub async fn reply_all(&self, msgs: Vec<ServerMessage>) -> Result<(), SendError> {
        for msg in msgs {
            self.reply(msg).await?;
        }
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        debug!(session = %self.id, "Session mailbox released");
    }
}
