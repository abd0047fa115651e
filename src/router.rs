//! Command router
//!
//! Interprets each inbound line for one session and drives the
//! registry, rooms, and the session's own mailbox.
//!
//! A session is either in the lobby or in exactly one room; consuming
//! the router with [`Router::disconnect`] is the terminal state.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::AppError;
use crate::message::{Command, RoomEvent, ServerMessage};
use crate::registry::Registry;
use crate::room::Room;
use crate::session::Session;
use crate::types::RoomId;

/// Where a connected session currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterState {
    InLobby,
    InRoom(RoomId),
}

/// Per-connection command router
pub struct Router {
    registry: Arc<Registry>,
    session: Session,
}

impl Router {
    pub fn new(registry: Arc<Registry>, session: Session) -> Self {
        Self { registry, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> RouterState {
        match self.session.room() {
            Some(room) => RouterState::InRoom(room.id.clone()),
            None => RouterState::InLobby,
        }
    }

    /// Send the welcome banner, help block and room listing
    pub async fn greet(&self, server_name: &str) -> Result<(), AppError> {
        self.reply(ServerMessage::Welcome {
            server_name: server_name.to_string(),
        })
        .await?;
        self.reply_all(ServerMessage::help()).await?;
        self.handle_list().await
    }

    /// Process a single inbound line
    ///
    /// User-facing errors are answered on the session's own mailbox and
    /// swallowed; only fatal errors are returned.
    pub async fn handle_line(&mut self, line: &str) -> Result<(), AppError> {
        let result = match Command::parse(line) {
            Ok(None) => return Ok(()),
            Ok(Some(cmd)) => self.handle_command(cmd).await,
            Err(e) => Err(e),
        };

        match result {
            Err(e) if !e.is_fatal() => {
                debug!(session = %self.session.id(), error = %e, "Command rejected");
                self.reply(e.into()).await
            }
            other => other,
        }
    }

    async fn handle_command(&mut self, cmd: Command) -> Result<(), AppError> {
        match cmd {
            Command::List => self.handle_list().await,
            Command::Join { room } => self.handle_join(&room).await,
            Command::Leave => self.handle_leave().await,
            Command::Create { name } => self.handle_create(name).await,
            Command::Username { name } => self.handle_username(&name).await,
            Command::Chat { text } => self.handle_chat(&text).await,
        }
    }

    async fn handle_list(&self) -> Result<(), AppError> {
        let rooms = self.registry.list_rooms().await;
        self.reply_all(ServerMessage::room_listing(rooms)).await
    }

    async fn handle_join(&mut self, room: &str) -> Result<(), AppError> {
        let room = self.registry.lookup_room(&RoomId::normalize(room)).await?;
        self.enter(room).await
    }

    async fn handle_create(&mut self, name: String) -> Result<(), AppError> {
        let id = RoomId::normalize(&name);
        let room = self.registry.create_room(id, name).await?;

        self.reply(ServerMessage::RoomCreated {
            name: room.name.clone(),
        })
        .await?;

        // Auto-join the created room
        self.enter(room).await
    }

    async fn handle_leave(&mut self) -> Result<(), AppError> {
        let Some(room) = self.session.room().cloned() else {
            return Err(AppError::NotInRoom);
        };

        room.leave(&mut self.session).await?;
        self.reply(ServerMessage::LeftRoom {
            name: room.name.clone(),
        })
        .await
    }

    async fn handle_username(&mut self, name: &str) -> Result<(), AppError> {
        let old = self.registry.rename(&mut self.session, name).await?;
        let new = self.session.username().to_string();

        info!(session = %self.session.id(), "Username changed from '{}' to '{}'", old, new);

        self.reply(ServerMessage::UsernameChanged {
            old: old.clone(),
            new: new.clone(),
        })
        .await?;

        if let Some(room) = self.session.room() {
            room.broadcast(RoomEvent::renamed(self.session.id(), &old, &new))
                .await?;
        }
        Ok(())
    }

    async fn handle_chat(&self, text: &str) -> Result<(), AppError> {
        let Some(room) = self.session.room() else {
            return Err(AppError::NotInRoomForChat);
        };

        room.broadcast(RoomEvent::chat(
            self.session.id(),
            self.session.username(),
            text,
        ))
        .await
    }

    /// Join `room`, leaving the current one first
    async fn enter(&mut self, room: Arc<Room>) -> Result<(), AppError> {
        room.join(&mut self.session).await?;
        self.reply(ServerMessage::JoinedRoom {
            name: room.name.clone(),
        })
        .await
    }

    /// Tear the session down: leave its room, then release its name
    ///
    /// The session (and its mailbox) is dropped on return.
    pub async fn disconnect(mut self) {
        let id = self.session.id();

        if let Some(room) = self.session.room().cloned() {
            if let Err(e) = room.leave(&mut self.session).await {
                debug!(session = %id, error = %e, "Leave on disconnect failed");
            }
        }
        self.registry.unregister(id).await;

        info!(session = %id, "Session disconnected");
    }

    async fn reply(&self, msg: ServerMessage) -> Result<(), AppError> {
        self.session
            .reply(msg)
            .await
            .map_err(|_| AppError::ChannelSend)
    }

    async fn reply_all(&self, msgs: Vec<ServerMessage>) -> Result<(), AppError> {
        self.session
            .reply_all(msgs)
            .await
            .map_err(|_| AppError::ChannelSend)
    }
}
