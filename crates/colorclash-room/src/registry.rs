//! Room registry: creates, tracks, and routes players to rooms.

use std::collections::HashMap;

use colorclash_protocol::{PlayerId, RoomId, RoomSummary};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::room::spawn_room;
use crate::{EventSender, GameRoom, RoomAction, RoomConfig, RoomError, RoomHandle};

/// Default command channel size for room actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

#[derive(Debug, Default)]
struct Rooms {
    /// Active rooms, keyed by room ID.
    rooms: HashMap<RoomId, RoomHandle>,

    /// Maps each player to the room they're in. A player is in at most
    /// one room at a time. Entries are reserved before the room is asked
    /// to seat the player and rolled back if it refuses.
    player_rooms: HashMap<PlayerId, RoomId>,

    next_id: u64,
}

impl Rooms {
    fn ensure_free(&self, player_id: PlayerId) -> Result<(), RoomError> {
        match self.player_rooms.get(&player_id) {
            Some(current) => Err(RoomError::AlreadyInRoom(player_id, *current)),
            None => Ok(()),
        }
    }

    fn allocate_id(&mut self) -> RoomId {
        self.next_id += 1;
        RoomId(self.next_id)
    }

    fn is_reserved(&self, room_id: RoomId) -> bool {
        self.player_rooms.values().any(|r| *r == room_id)
    }
}

/// Every live room in the process.
///
/// The map sits behind one `tokio::sync::Mutex` held only for map reads
/// and writes, never while awaiting a room actor.
#[derive(Debug)]
pub struct RoomRegistry {
    config: RoomConfig,
    inner: Mutex<Rooms>,
}

impl RoomRegistry {
    /// Creates an empty registry. Every room it spawns uses `config`.
    pub fn new(config: RoomConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Rooms::default()),
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    fn spawn(&self, room_id: RoomId, name: Option<String>) -> RoomHandle {
        let mut config = self.config.clone();
        config.seed = config.seed.map(|seed| seed.wrapping_add(room_id.0));
        let handle = spawn_room(
            GameRoom::new(room_id, name, config),
            DEFAULT_CHANNEL_SIZE,
        );
        info!(%room_id, "room created");
        handle
    }

    /// Returns the room with `room_id`, spawning an empty one if needed.
    pub async fn get_or_create(
        &self,
        room_id: RoomId,
        name: Option<String>,
    ) -> RoomHandle {
        let mut inner = self.inner.lock().await;
        if let Some(handle) = inner.rooms.get(&room_id) {
            return handle.clone();
        }
        let handle = self.spawn(room_id, name);
        inner.rooms.insert(room_id, handle.clone());
        inner.next_id = inner.next_id.max(room_id.0);
        handle
    }

    /// Creates a room and seats `player_id` as its creator.
    pub async fn create_room(
        &self,
        player_id: PlayerId,
        username: &str,
        room_name: Option<String>,
        sender: EventSender,
    ) -> Result<RoomId, RoomError> {
        if username.trim().is_empty() {
            return Err(RoomError::UsernameRequired);
        }
        let handle = {
            let mut inner = self.inner.lock().await;
            inner.ensure_free(player_id)?;
            let room_id = inner.allocate_id();
            let handle = self.spawn(room_id, room_name);
            inner.rooms.insert(room_id, handle.clone());
            inner.player_rooms.insert(player_id, room_id);
            handle
        };

        let room_id = handle.room_id();
        if let Err(error) = handle.host(player_id, username.to_owned(), sender).await {
            let mut inner = self.inner.lock().await;
            inner.player_rooms.remove(&player_id);
            inner.rooms.remove(&room_id);
            drop(inner);
            let _ = handle.shutdown().await;
            return Err(error);
        }
        Ok(room_id)
    }

    /// Seats `player_id` in an existing room.
    pub async fn join_room(
        &self,
        player_id: PlayerId,
        username: &str,
        room_id: RoomId,
        sender: EventSender,
    ) -> Result<(), RoomError> {
        if username.trim().is_empty() {
            return Err(RoomError::UsernameRequired);
        }
        let handle = {
            let mut inner = self.inner.lock().await;
            inner.ensure_free(player_id)?;
            let handle = inner
                .rooms
                .get(&room_id)
                .cloned()
                .ok_or(RoomError::NotFound(room_id))?;
            inner.player_rooms.insert(player_id, room_id);
            handle
        };

        if let Err(error) = handle.join(player_id, username.to_owned(), sender).await {
            let reserved = {
                let mut inner = self.inner.lock().await;
                if inner.player_rooms.get(&player_id) == Some(&room_id) {
                    inner.player_rooms.remove(&player_id);
                }
                inner.is_reserved(room_id)
            };
            // Our reservation may have kept a concurrent last leave from
            // destroying the room.
            if !reserved {
                let empty = match handle.summary().await {
                    Ok(summary) => summary.player_count == 0,
                    Err(_) => true,
                };
                if empty {
                    self.destroy_if_unreserved(&handle).await;
                }
            }
            return Err(error);
        }
        Ok(())
    }

    /// Removes a player from their room. A room left empty is destroyed.
    pub async fn leave_room(&self, player_id: PlayerId) -> Result<(), RoomError> {
        let handle = {
            let mut inner = self.inner.lock().await;
            let room_id = inner
                .player_rooms
                .remove(&player_id)
                .ok_or(RoomError::NotInRoom(player_id))?;
            inner.rooms.get(&room_id).cloned()
        };
        let Some(handle) = handle else {
            return Ok(());
        };

        let remaining = match handle.leave(player_id).await {
            Ok(remaining) => remaining,
            Err(RoomError::Unavailable(_)) => 0,
            Err(error) => return Err(error),
        };
        if remaining == 0 {
            self.destroy_if_unreserved(&handle).await;
        }
        Ok(())
    }

    /// Destroys an empty room unless someone reserved a seat in it while
    /// it was emptying. That joiner's rollback repeats this check if their
    /// join fails.
    async fn destroy_if_unreserved(&self, handle: &RoomHandle) {
        let room_id = handle.room_id();
        {
            let mut inner = self.inner.lock().await;
            if inner.is_reserved(room_id) {
                return;
            }
            if inner.rooms.remove(&room_id).is_none() {
                return;
            }
        }
        let _ = handle.shutdown().await;
        info!(%room_id, "empty room destroyed");
    }

    /// Routes an in-room command to the player's room.
    pub async fn dispatch(
        &self,
        player_id: PlayerId,
        action: RoomAction,
    ) -> Result<(), RoomError> {
        let handle = {
            let inner = self.inner.lock().await;
            let room_id = inner
                .player_rooms
                .get(&player_id)
                .ok_or(RoomError::NotInRoom(player_id))?;
            inner
                .rooms
                .get(room_id)
                .cloned()
                .ok_or(RoomError::NotFound(*room_id))?
        };
        handle.act(player_id, action).await
    }

    /// Summaries of every room, oldest first.
    ///
    /// Rooms that fail to respond (shutting down) are skipped.
    pub async fn list(&self) -> Vec<RoomSummary> {
        let mut summaries = Vec::new();
        for handle in self.room_handles().await {
            match handle.summary().await {
                Ok(summary) => summaries.push(summary),
                Err(error) => debug!(room_id = %handle.room_id(), %error, "room skipped in listing"),
            }
        }
        summaries.sort_by_key(|s| (s.created_at, s.id));
        summaries
    }

    /// Shuts a room down and forgets its players.
    pub async fn remove(&self, room_id: RoomId) -> Result<(), RoomError> {
        let handle = {
            let mut inner = self.inner.lock().await;
            let handle = inner
                .rooms
                .remove(&room_id)
                .ok_or(RoomError::NotFound(room_id))?;
            inner.player_rooms.retain(|_, r| *r != room_id);
            handle
        };
        let _ = handle.shutdown().await;
        info!(%room_id, "room removed");
        Ok(())
    }

    /// Stops every room's timer and actor.
    pub async fn shutdown(&self) {
        let handles: Vec<RoomHandle> = {
            let mut inner = self.inner.lock().await;
            inner.player_rooms.clear();
            inner.rooms.drain().map(|(_, h)| h).collect()
        };
        let count = handles.len();
        for handle in handles {
            let _ = handle.shutdown().await;
        }
        info!(rooms = count, "registry shut down");
    }

    pub async fn handle(&self, room_id: RoomId) -> Option<RoomHandle> {
        self.inner.lock().await.rooms.get(&room_id).cloned()
    }

    /// Returns the room a player is in, if any.
    pub async fn room_of(&self, player_id: PlayerId) -> Option<RoomId> {
        self.inner.lock().await.player_rooms.get(&player_id).copied()
    }

    pub async fn room_count(&self) -> usize {
        self.inner.lock().await.rooms.len()
    }

    /// Cloned handles to every room, for async work without the lock.
    pub async fn room_handles(&self) -> Vec<RoomHandle> {
        self.inner.lock().await.rooms.values().cloned().collect()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}
