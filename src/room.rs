//! Room struct definition
//!
//! Represents a named broadcast group. Every room runs one broadcaster
//! task that drains its event queue in FIFO order and fans each event
//! out to whoever is a member at the time it is processed.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use crate::error::{AppError, SendError};
use crate::message::RoomEvent;
use crate::session::{Mailbox, Session};
use crate::types::{RoomId, SessionId};

/// Default capacity of a room's inbound event queue
pub const DEFAULT_ROOM_QUEUE_CAPACITY: usize = 64;

type Members = Arc<Mutex<HashMap<SessionId, Mailbox>>>;

/// Multi-user chat room
///
/// Created by the registry and never destroyed. Enqueuing an event waits
/// when the queue is full; delivery to a member never waits.
#[derive(Debug)]
pub struct Room {
    /// Room id used in commands
    pub id: RoomId,
    /// Human-readable name
    pub name: String,
    members: Members,
    queue: mpsc::Sender<RoomEvent>,
}

impl Room {
    /// Create a room and start its broadcaster task
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(id: RoomId, name: String, queue_capacity: usize) -> Arc<Room> {
        let (queue, receiver) = mpsc::channel(queue_capacity.max(1));
        let members: Members = Arc::new(Mutex::new(HashMap::new()));

        let broadcaster = Broadcaster {
            room: id.clone(),
            members: members.clone(),
            receiver,
        };
        tokio::spawn(broadcaster.run());

        Arc::new(Room {
            id,
            name,
            members,
            queue,
        })
    }

    /// Add a session and announce it to the other members
    ///
    /// A session still in another room is removed from it first.
    pub async fn join(self: &Arc<Self>, session: &mut Session) -> Result<(), AppError> {
        if let Some(previous) = session.room().cloned() {
            previous.leave(session).await?;
        }

        self.members
            .lock()
            .await
            .insert(session.id(), session.mailbox().clone());
        session.set_room(Some(self.clone()));

        info!(session = %session.id(), room = %self.id, "Session joined room");

        self.broadcast(RoomEvent::joined(session.id(), session.username(), &self.name))
            .await
    }

    /// Remove a session and announce it to the remaining members
    ///
    /// No-op if the session is not in this room.
    pub async fn leave(&self, session: &mut Session) -> Result<(), AppError> {
        let is_current = session
            .room()
            .is_some_and(|room| std::ptr::eq(Arc::as_ptr(room), self));
        if !is_current {
            return Ok(());
        }

        self.members.lock().await.remove(&session.id());
        session.set_room(None);

        info!(session = %session.id(), room = %self.id, "Session left room");

        self.broadcast(RoomEvent::left(session.id(), session.username(), &self.name))
            .await
    }

    /// Enqueue an event for fan-out to every member except its sender
    ///
    /// Waits while the queue is full; events are never dropped here.
    pub async fn broadcast(&self, event: RoomEvent) -> Result<(), AppError> {
        self.queue
            .send(event)
            .await
            .map_err(|_| AppError::ChannelSend)
    }

    pub async fn member_count(&self) -> usize {
        self.members.lock().await.len()
    }

    pub async fn contains(&self, session_id: SessionId) -> bool {
        self.members.lock().await.contains_key(&session_id)
    }

    /// Snapshot of current member ids
    pub async fn member_ids(&self) -> Vec<SessionId> {
        self.members.lock().await.keys().copied().collect()
    }
}

/// Serialized fan-out worker for one room
struct Broadcaster {
    room: RoomId,
    members: Members,
    receiver: mpsc::Receiver<RoomEvent>,
}

impl Broadcaster {
    /// Runs until the room is dropped
    async fn run(mut self) {
        debug!(room = %self.room, "Broadcaster started");

        while let Some(event) = self.receiver.recv().await {
            let members = self.members.lock().await;
            for (member_id, mailbox) in members.iter() {
                if *member_id == event.sender {
                    continue;
                }
                match mailbox.deliver(event.text.clone()) {
                    Ok(()) => {}
                    Err(SendError::MailboxFull) => {
                        debug!(
                            room = %self.room, session = %member_id, kind = ?event.kind,
                            "Mailbox full, dropping event"
                        );
                    }
                    Err(SendError::ChannelClosed) => {
                        debug!(room = %self.room, session = %member_id, "Mailbox closed");
                    }
                }
            }
        }

        debug!(room = %self.room, "Broadcaster stopped");
    }
}
