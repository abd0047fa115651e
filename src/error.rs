//! Error types for the chat server
//!
//! Defines application-level errors and mailbox send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::types::RoomId;

/// Application-level errors
///
/// Covers both fatal errors (connection termination) and
/// user-facing errors (one informational line back to the sender).
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error on the transport (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Line framing error, e.g. an over-long line (fatal)
    #[error("Line codec error: {0}")]
    Codec(#[from] tokio_util::codec::AnyDelimiterCodecError),

    /// Channel send error (fatal - internal channel broken)
    #[error("Channel send error")]
    ChannelSend,

    /// Room not found with the given id
    #[error("Room not found: {0}")]
    RoomNotFound(RoomId),

    /// A room with this id already exists
    #[error("Room already exists: {0}")]
    RoomAlreadyExists(RoomId),

    /// `/leave` while in the lobby
    #[error("Not in room")]
    NotInRoom,

    /// Chat line while in the lobby
    #[error("Chat requires a room")]
    NotInRoomForChat,

    /// Rename to an empty name
    #[error("Username empty")]
    UsernameEmpty,

    /// Rename to the name already held
    #[error("Username unchanged")]
    UsernameUnchanged,

    /// Rename to a name held by another session
    #[error("Username taken: {0}")]
    UsernameTaken(String),

    /// Command issued without its required argument
    #[error("Usage: {0}")]
    Usage(&'static str),
}

/// Coarse classification of [`AppError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidState,
    Rejected,
    Usage,
    /// Transport-level failure; tears the session down
    Fatal,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::RoomNotFound(_) => ErrorKind::NotFound,
            AppError::RoomAlreadyExists(_) => ErrorKind::AlreadyExists,
            AppError::NotInRoom | AppError::NotInRoomForChat => ErrorKind::InvalidState,
            AppError::UsernameEmpty | AppError::UsernameUnchanged | AppError::UsernameTaken(_) => {
                ErrorKind::Rejected
            }
            AppError::Usage(_) => ErrorKind::Usage,
            AppError::Io(_) | AppError::Codec(_) | AppError::ChannelSend => ErrorKind::Fatal,
        }
    }

    /// Whether the error should terminate the connection
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }
}

/// Mailbox send errors
///
/// Occurs when delivering a line to a session's outbound mailbox.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The mailbox is at capacity; the line was dropped
    #[error("Mailbox full")]
    MailboxFull,

    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            AppError::RoomNotFound(RoomId::normalize("x")).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            AppError::RoomAlreadyExists(RoomId::normalize("x")).kind(),
            ErrorKind::AlreadyExists
        );
        assert_eq!(AppError::NotInRoomForChat.kind(), ErrorKind::InvalidState);
        assert_eq!(
            AppError::UsernameTaken("bob".to_string()).kind(),
            ErrorKind::Rejected
        );
        assert_eq!(AppError::Usage("/join <room_id>").kind(), ErrorKind::Usage);
        assert!(AppError::ChannelSend.is_fatal());
        assert!(!AppError::NotInRoom.is_fatal());
    }
}
