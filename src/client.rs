//! Client-side helpers
//!
//! Used by the interactive client binary: tracking the current room from
//! server lines, local commands, and the saved username file.

use std::io;
use std::path::{Path, PathBuf};

/// Default file the client keeps its username in
pub const DEFAULT_USERNAME_FILE: &str = "username.txt";

const JOINED_PREFIX: &str = "*** Joined room: ";
const LEFT_PREFIX: &str = "*** Left room: ";
const SUFFIX: &str = " ***";

/// Tracks the room the server last confirmed
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RoomTracker {
    current: Option<String>,
}

impl RoomTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update state from one line received from the server
    pub fn observe(&mut self, line: &str) {
        if let Some(rest) = line.strip_prefix(JOINED_PREFIX) {
            let name = rest.strip_suffix(SUFFIX).unwrap_or(rest).trim();
            self.current = Some(name.to_string());
        } else if line.starts_with(LEFT_PREFIX) {
            self.current = None;
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn prompt(&self) -> String {
        match &self.current {
            Some(room) => format!("[{}]> ", room),
            None => "[lobby]> ".to_string(),
        }
    }
}

/// Commands handled by the client without contacting the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalCommand {
    Help,
    CurrentRoom,
    Quit,
}

impl LocalCommand {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "/help" => Some(Self::Help),
            "/room" | "/current" => Some(Self::CurrentRoom),
            "/quit" | "/exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// The new name in a `/username <name>` line, if any
pub fn requested_username(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix("/username ")?;
    let name = rest.trim();
    (!name.is_empty()).then_some(name)
}

pub fn help_text() -> &'static str {
    "=== Client Help ===
Server Commands:
  /list                - Show available rooms
  /join <room_id>      - Join a room
  /leave               - Leave current room
  /create <room_name>  - Create new room
  /username <new_name> - Change username

Client Commands:
  /help                - Show this help
  /room or /current    - Show current room
  /quit or /exit       - Disconnect

Once in a room, just type messages to chat!
==================="
}

/// Username persisted between client runs
#[derive(Debug, Clone)]
pub struct UsernameStore {
    path: PathBuf,
}

impl UsernameStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The saved name, `None` if the file is missing or blank
    pub async fn load(&self) -> io::Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => {
                let name = data.trim();
                Ok((!name.is_empty()).then(|| name.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn save(&self, username: &str) -> io::Result<()> {
        tokio::fs::write(&self.path, username.trim()).await
    }
}
