//! Message protocol definitions
//!
//! Newline-terminated UTF-8 text in both directions:
//! - `Command`: one parsed inbound line
//! - `ServerMessage`: one rendered outbound line, with a stable format
//! - `RoomEvent`: an entry in a room's ordered broadcast queue

use std::fmt;

use crate::error::AppError;
use crate::registry::RoomSummary;
use crate::types::SessionId;

pub const JOIN_USAGE: &str = "/join <room_id>";
pub const CREATE_USAGE: &str = "/create <room_name>";
pub const USERNAME_USAGE: &str = "/username <new_name>";

/// Client → Server command
///
/// Keywords are case-sensitive; arguments are trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the room listing
    List,
    /// Join a room by id
    Join { room: String },
    /// Leave the current room
    Leave,
    /// Create a room from a display name and join it
    Create { name: String },
    /// Change display name
    Username { name: String },
    /// Any other line: chat text
    Chat { text: String },
}

impl Command {
    /// Parse one inbound line
    ///
    /// Returns `Ok(None)` for blank lines, which are ignored.
    pub fn parse(line: &str) -> Result<Option<Command>, AppError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (keyword, arg) = match line.split_once(' ') {
            Some((keyword, arg)) => (keyword, arg.trim()),
            None => (line, ""),
        };

        let command = match keyword {
            "/list" => Command::List,
            "/leave" => Command::Leave,
            "/join" => Command::Join {
                room: required(arg, JOIN_USAGE)?,
            },
            "/create" => Command::Create {
                name: required(arg, CREATE_USAGE)?,
            },
            "/username" => Command::Username {
                name: required(arg, USERNAME_USAGE)?,
            },
            _ => Command::Chat {
                text: line.to_string(),
            },
        };
        Ok(Some(command))
    }
}

fn required(arg: &str, usage: &'static str) -> Result<String, AppError> {
    if arg.is_empty() {
        Err(AppError::Usage(usage))
    } else {
        Ok(arg.to_string())
    }
}

/// Server → Client line
///
/// `Display` renders the exact wire text. System lines are wrapped in
/// `***` so clients can grep for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Banner title line
    Welcome { server_name: String },
    /// Free-form text (help block lines)
    Info(String),
    RoomListHeader,
    RoomListEntry(RoomSummary),
    RoomListEmpty,
    RoomListFooter,
    RoomCreated { name: String },
    JoinedRoom { name: String },
    LeftRoom { name: String },
    UsernameChanged { old: String, new: String },
    /// Broadcast to others: someone joined
    UserJoined { username: String, room: String },
    /// Broadcast to others: someone left
    UserLeft { username: String, room: String },
    /// Broadcast to others: someone renamed
    UserRenamed { old: String, new: String },
    /// Broadcast to others: chat text
    Chat { from: String, text: String },
    /// Informational error line back to the originating session
    Error(String),
}

impl ServerMessage {
    /// The fixed help block sent after the banner
    pub fn help() -> Vec<ServerMessage> {
        [
            "Commands:".to_string(),
            " /list - Show available rooms".to_string(),
            format!(" {} - Join a room", JOIN_USAGE),
            " /leave - Leave current room".to_string(),
            format!(" {} - Create new room", CREATE_USAGE),
            format!(" {} - Change your display name", USERNAME_USAGE),
        ]
        .into_iter()
        .map(ServerMessage::Info)
        .collect()
    }

    /// Render a full room listing block
    pub fn room_listing(mut rooms: Vec<RoomSummary>) -> Vec<ServerMessage> {
        rooms.sort_by(|a, b| a.id.cmp(&b.id));

        let mut lines = Vec::with_capacity(rooms.len() + 2);
        lines.push(ServerMessage::RoomListHeader);
        if rooms.is_empty() {
            lines.push(ServerMessage::RoomListEmpty);
        } else {
            lines.extend(rooms.into_iter().map(ServerMessage::RoomListEntry));
        }
        lines.push(ServerMessage::RoomListFooter);
        lines
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Welcome { server_name } => {
                write!(f, "=== Welcome to {} ===", server_name)
            }
            ServerMessage::Info(text) | ServerMessage::Error(text) => f.write_str(text),
            ServerMessage::RoomListHeader => f.write_str("=== Available Rooms ==="),
            ServerMessage::RoomListEntry(room) => write!(
                f,
                " {}:{} ({} users)",
                room.id, room.name, room.member_count
            ),
            ServerMessage::RoomListEmpty => f.write_str("No rooms available"),
            ServerMessage::RoomListFooter => f.write_str("========================"),
            ServerMessage::RoomCreated { name } => write!(f, "*** Created room: {} ***", name),
            ServerMessage::JoinedRoom { name } => write!(f, "*** Joined room: {} ***", name),
            ServerMessage::LeftRoom { name } => write!(f, "*** Left room: {} ***", name),
            ServerMessage::UsernameChanged { old, new } => {
                write!(f, "*** Username changed from '{}' to '{}' ***", old, new)
            }
            ServerMessage::UserJoined { username, room } => {
                write!(f, "*** {} joined {} ***", username, room)
            }
            ServerMessage::UserLeft { username, room } => {
                write!(f, "*** {} left {} ***", username, room)
            }
            ServerMessage::UserRenamed { old, new } => {
                write!(f, "*** {} is now known as {} ***", old, new)
            }
            ServerMessage::Chat { from, text } => write!(f, "{}: {}", from, text),
        }
    }
}

/// Convert AppError to ServerMessage for client notification
impl From<AppError> for ServerMessage {
    fn from(err: AppError) -> Self {
        let message = match &err {
            AppError::RoomNotFound(id) => format!(
                "Room '{}' does not exist. Use /list to see available rooms",
                id
            ),
            AppError::RoomAlreadyExists(id) => format!("Room '{}' already exists", id),
            AppError::NotInRoom => "You are not in any room".to_string(),
            AppError::NotInRoomForChat => {
                "Please join a room first. Use /list to see available rooms.".to_string()
            }
            AppError::UsernameEmpty => "Username cannot be empty".to_string(),
            AppError::UsernameUnchanged => "That's already your username".to_string(),
            AppError::UsernameTaken(name) => format!("Username '{}' is already taken", name),
            AppError::Usage(usage) => format!("Usage: {}", usage),
            // Fatal errors are not typically converted (connection closes)
            AppError::Io(_) | AppError::Codec(_) | AppError::ChannelSend => {
                "Internal error".to_string()
            }
        };
        ServerMessage::Error(message)
    }
}

/// What a room event announces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomEventKind {
    Join,
    Leave,
    Rename,
    Chat,
}

/// One entry in a room's broadcast queue
///
/// Membership notifications and chat lines share the queue, so every
/// member observes them in the same order. The sender never receives
/// its own event.
#[derive(Debug, Clone)]
pub struct RoomEvent {
    pub kind: RoomEventKind,
    pub sender: SessionId,
    pub text: String,
}

impl RoomEvent {
    pub fn joined(sender: SessionId, username: &str, room: &str) -> Self {
        Self::render(
            RoomEventKind::Join,
            sender,
            ServerMessage::UserJoined {
                username: username.to_string(),
                room: room.to_string(),
            },
        )
    }

    pub fn left(sender: SessionId, username: &str, room: &str) -> Self {
        Self::render(
            RoomEventKind::Leave,
            sender,
            ServerMessage::UserLeft {
                username: username.to_string(),
                room: room.to_string(),
            },
        )
    }

    pub fn renamed(sender: SessionId, old: &str, new: &str) -> Self {
        Self::render(
            RoomEventKind::Rename,
            sender,
            ServerMessage::UserRenamed {
                old: old.to_string(),
                new: new.to_string(),
            },
        )
    }

    pub fn chat(sender: SessionId, from: &str, text: &str) -> Self {
        Self::render(
            RoomEventKind::Chat,
            sender,
            ServerMessage::Chat {
                from: from.to_string(),
                text: text.to_string(),
            },
        )
    }

    fn render(kind: RoomEventKind, sender: SessionId, line: ServerMessage) -> Self {
        Self {
            kind,
            sender,
            text: line.to_string(),
        }
    }
}
