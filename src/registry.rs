//! Registry implementation
//!
//! The process-wide directory of rooms and allocator of session ids.
//! Constructed once by the entry point and shared as `Arc<Registry>`
//! with every connection task.
//!
//! Lock order is always registry state first, then a room's member lock.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::room::Room;
use crate::session::{Mailbox, Session};
use crate::types::{RoomId, SessionId, SessionIdAllocator};

/// Snapshot of one room for listings
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomSummary {
    pub id: RoomId,
    pub name: String,
    pub member_count: usize,
}

#[derive(Debug, Default)]
struct RegistryState {
    /// All rooms: RoomId -> Room
    rooms: HashMap<RoomId, Arc<Room>>,
    /// Display names of every connected session, lobby included
    usernames: HashMap<SessionId, String>,
}

#[derive(Debug)]
pub struct Registry {
    state: RwLock<RegistryState>,
    session_ids: SessionIdAllocator,
    room_queue_capacity: usize,
}

impl Registry {
    pub fn new(room_queue_capacity: usize) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            session_ids: SessionIdAllocator::new(),
            room_queue_capacity,
        }
    }

    /// Build the registry with its startup room
    pub async fn start(config: &ServerConfig) -> Result<Arc<Self>, AppError> {
        let registry = Arc::new(Self::new(config.room_queue_capacity));
        registry
            .create_room(
                RoomId::normalize(&config.default_room_id),
                config.default_room_name.clone(),
            )
            .await?;
        Ok(registry)
    }

    /// Create a room and start its broadcaster
    ///
    /// Exactly one of several concurrent creators of the same id succeeds;
    /// the rest get `RoomAlreadyExists`.
    pub async fn create_room(&self, id: RoomId, name: String) -> Result<Arc<Room>, AppError> {
        let mut state = self.state.write().await;
        match state.rooms.entry(id) {
            Entry::Occupied(entry) => Err(AppError::RoomAlreadyExists(entry.key().clone())),
            Entry::Vacant(entry) => {
                let room = Room::spawn(entry.key().clone(), name, self.room_queue_capacity);
                info!(room = %room.id, name = %room.name, "Room created");
                entry.insert(room.clone());
                Ok(room)
            }
        }
    }

    /// Snapshot of every room, in no particular order
    pub async fn list_rooms(&self) -> Vec<RoomSummary> {
        let state = self.state.read().await;
        let mut rooms = Vec::with_capacity(state.rooms.len());
        for room in state.rooms.values() {
            rooms.push(RoomSummary {
                id: room.id.clone(),
                name: room.name.clone(),
                member_count: room.member_count().await,
            });
        }
        rooms
    }

    pub async fn lookup_room(&self, id: &RoomId) -> Result<Arc<Room>, AppError> {
        self.state
            .read()
            .await
            .rooms
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::RoomNotFound(id.clone()))
    }

    pub async fn room_count(&self) -> usize {
        self.state.read().await.rooms.len()
    }

    /// Issue an id for a new connection and reserve its default name
    ///
    /// If `User<id>` is already held (someone renamed to it), a numeric
    /// suffix is appended.
    pub async fn register(&self, mailbox: Mailbox) -> Session {
        let id = self.session_ids.next_id();
        let mut session = Session::new(id, mailbox);

        let mut state = self.state.write().await;
        let base = session.username().to_string();
        let mut candidate = base.clone();
        let mut suffix = 1;
        while state.usernames.values().any(|name| *name == candidate) {
            suffix += 1;
            candidate = format!("{}_{}", base, suffix);
        }
        if candidate != base {
            session.set_username(candidate.clone());
        }
        state.usernames.insert(id, candidate);

        debug!(session = %id, sessions = state.usernames.len(), "Session registered");
        session
    }

    /// Release a session's name; call after it has left its room
    pub async fn unregister(&self, session_id: SessionId) {
        let mut state = self.state.write().await;
        state.usernames.remove(&session_id);
        debug!(session = %session_id, sessions = state.usernames.len(), "Session unregistered");
    }

    /// True iff no session other than `excluding` holds `name`
    pub async fn is_username_available(&self, name: &str, excluding: SessionId) -> bool {
        let state = self.state.read().await;
        Self::name_free(&state, name, excluding)
    }

    fn name_free(state: &RegistryState, name: &str, excluding: SessionId) -> bool {
        !state
            .usernames
            .iter()
            .any(|(id, held)| *id != excluding && held == name)
    }

    /// Atomically check and claim a new display name for a session
    ///
    /// Returns the previous name. Of two concurrent claims for the same
    /// name, at most one succeeds.
    pub async fn rename(&self, session: &mut Session, new_name: &str) -> Result<String, AppError> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(AppError::UsernameEmpty);
        }
        if new_name == session.username() {
            return Err(AppError::UsernameUnchanged);
        }

        let mut state = self.state.write().await;
        if !Self::name_free(&state, new_name, session.id()) {
            return Err(AppError::UsernameTaken(new_name.to_string()));
        }
        state.usernames.insert(session.id(), new_name.to_string());
        Ok(session.set_username(new_name.to_string()))
    }
}
