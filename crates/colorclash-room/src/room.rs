//! Room actor: an isolated Tokio task that owns one [`GameRoom`].
//!
//! Commands arrive on a bounded mpsc channel and are handled one at a time
//! to completion. The round timer is polled in the same `select!` loop,
//! so timer events and player commands never interleave mid-operation.

use std::collections::HashMap;

use colorclash_protocol::{
    ClientCommand, PlayerId, Position, Recipient, RoomId, RoomSnapshot,
    RoomSummary, ServerEvent, Team,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::{GameRoom, Outbound, RoomError};

/// Channel for delivering events to one player's connection.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// An in-room command from a seated player.
///
/// Play targets arrive on the wire as a team and a slot index and are
/// turned into a [`Position`] here, once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomAction {
    SetReady { ready: bool },
    PlayCard { target: Position },
    DiscardCard,
    CallTeamOut,
    AdvanceRound,
}

impl TryFrom<ClientCommand> for RoomAction {
    /// Lobby commands are handed back unchanged.
    type Error = ClientCommand;

    fn try_from(cmd: ClientCommand) -> Result<Self, Self::Error> {
        Ok(match cmd {
            ClientCommand::SetReady { ready } => Self::SetReady { ready },
            ClientCommand::PlayCard {
                target_team,
                target_slot,
            } => Self::PlayCard {
                target: Position::SharedSlot(target_team, target_slot),
            },
            ClientCommand::DiscardCard => Self::DiscardCard,
            ClientCommand::CallTeamOut => Self::CallTeamOut,
            ClientCommand::AdvanceRound => Self::AdvanceRound,
            other => return Err(other),
        })
    }
}

/// Commands sent to a room actor through its channel.
///
/// Variants with a `reply` are request/response; the caller awaits the
/// oneshot.
pub(crate) enum RoomCommand {
    /// Seat the room's creator.
    Host {
        player_id: PlayerId,
        username: String,
        sender: EventSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Seat a player.
    Join {
        player_id: PlayerId,
        username: String,
        sender: EventSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Remove a player. Replies with the number of players left.
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<usize, RoomError>>,
    },

    /// Run an in-room command for a seated player.
    Act {
        player_id: PlayerId,
        action: RoomAction,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    Summary {
        reply: oneshot::Sender<RoomSummary>,
    },

    Snapshot {
        team: Option<Team>,
        reply: oneshot::Sender<RoomSnapshot>,
    },

    /// Stop the timer and end the actor.
    Shutdown,
}

/// Handle to a running room actor. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(make(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }

    /// Seats the room's creator; they receive `room-created`.
    pub async fn host(
        &self,
        player_id: PlayerId,
        username: String,
        sender: EventSender,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Host {
            player_id,
            username,
            sender,
            reply,
        })
        .await?
    }

    /// Seats a player; they receive `joined`, everyone else
    /// `player-joined`.
    pub async fn join(
        &self,
        player_id: PlayerId,
        username: String,
        sender: EventSender,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Join {
            player_id,
            username,
            sender,
            reply,
        })
        .await?
    }

    /// Removes a player and returns how many are left.
    pub async fn leave(&self, player_id: PlayerId) -> Result<usize, RoomError> {
        self.request(|reply| RoomCommand::Leave { player_id, reply })
            .await?
    }

    pub async fn act(
        &self,
        player_id: PlayerId,
        action: RoomAction,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Act {
            player_id,
            action,
            reply,
        })
        .await?
    }

    pub async fn summary(&self) -> Result<RoomSummary, RoomError> {
        self.request(|reply| RoomCommand::Summary { reply }).await
    }

    /// The room as a member of `team` sees it.
    pub async fn snapshot(
        &self,
        team: Option<Team>,
    ) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::Snapshot { team, reply })
            .await
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }
}

/// The internal actor state. Runs inside a Tokio task.
struct RoomActor {
    room: GameRoom,
    /// Per-player outbound channels.
    senders: HashMap<PlayerId, EventSender>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        let room_id = self.room.id();
        info!(%room_id, "room actor started");

        loop {
            tokio::select! {
                biased;
                event = self.room.wait_for_timer() => {
                    let events = self.room.on_timer(event);
                    self.dispatch(events);
                }
                cmd = self.receiver.recv() => {
                    match cmd {
                        Some(RoomCommand::Shutdown) | None => break,
                        Some(cmd) => self.handle(cmd),
                    }
                }
            }
        }

        self.room.shutdown();
        info!(%room_id, "room actor stopped");
    }

    fn handle(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Host {
                player_id,
                username,
                sender,
                reply,
            } => {
                let result = self.room.host(player_id, &username);
                let _ = reply.send(self.seat(player_id, sender, result));
            }
            RoomCommand::Join {
                player_id,
                username,
                sender,
                reply,
            } => {
                let result = self.room.join(player_id, &username);
                let _ = reply.send(self.seat(player_id, sender, result));
            }
            RoomCommand::Leave { player_id, reply } => {
                let result = self.room.leave(player_id).map(|events| {
                    self.dispatch(events);
                    self.senders.remove(&player_id);
                    self.room.player_count()
                });
                let _ = reply.send(result);
            }
            RoomCommand::Act {
                player_id,
                action,
                reply,
            } => {
                let result = self.act(player_id, action);
                if let Err(error) = &result {
                    debug!(
                        room_id = %self.room.id(),
                        %player_id,
                        ?action,
                        %error,
                        "command rejected"
                    );
                }
                let _ = reply.send(result);
            }
            RoomCommand::Summary { reply } => {
                let _ = reply.send(self.room.summary());
            }
            RoomCommand::Snapshot { team, reply } => {
                let _ = reply.send(self.room.snapshot_for(team));
            }
            RoomCommand::Shutdown => {}
        }
    }

    fn seat(
        &mut self,
        player_id: PlayerId,
        sender: EventSender,
        result: Result<Outbound, RoomError>,
    ) -> Result<(), RoomError> {
        let events = result?;
        self.senders.insert(player_id, sender);
        self.dispatch(events);
        Ok(())
    }

    fn act(
        &mut self,
        player_id: PlayerId,
        action: RoomAction,
    ) -> Result<(), RoomError> {
        if !self.senders.contains_key(&player_id) {
            warn!(
                room_id = %self.room.id(),
                %player_id,
                "command from non-member"
            );
            return Err(RoomError::NotInRoom(player_id));
        }
        let room = &mut self.room;
        let events = match action {
            RoomAction::SetReady { ready } => room.set_ready(player_id, ready),
            RoomAction::PlayCard { target } => room.play_card(player_id, target),
            RoomAction::DiscardCard => room.discard_card(player_id),
            RoomAction::CallTeamOut => room.call_team_out(player_id),
            RoomAction::AdvanceRound => room.advance_round(player_id),
        }?;
        self.dispatch(events);
        Ok(())
    }

    /// Delivers events to their recipients in order.
    fn dispatch(&self, events: Outbound) {
        for (recipient, event) in events {
            match recipient {
                Recipient::All => {
                    for pid in self.room.player_ids() {
                        self.send_to(pid, event.clone());
                    }
                }
                Recipient::Player(pid) => self.send_to(pid, event),
                Recipient::AllExcept(excluded) => {
                    for pid in self.room.player_ids().filter(|p| *p != excluded) {
                        self.send_to(pid, event.clone());
                    }
                }
                Recipient::Team(team) => {
                    let members = self
                        .room
                        .players()
                        .iter()
                        .filter(|p| p.team == team)
                        .map(|p| p.id);
                    for pid in members {
                        self.send_to(pid, event.clone());
                    }
                }
            }
        }
    }

    /// Silently drops the event if the player's connection is gone.
    fn send_to(&self, player_id: PlayerId, event: ServerEvent) {
        if let Some(sender) = self.senders.get(&player_id) {
            let _ = sender.send(event);
        }
    }
}

/// Spawns an actor for `room` and returns a handle to it.
///
/// `channel_size` bounds the command queue; senders wait when it's full.
pub(crate) fn spawn_room(room: GameRoom, channel_size: usize) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);
    let room_id = room.id();
    let actor = RoomActor {
        room,
        senders: HashMap::new(),
        receiver: rx,
    };
    tokio::spawn(actor.run());
    RoomHandle {
        room_id,
        sender: tx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lobby_commands_are_not_room_actions() {
        let cmd = ClientCommand::ListRooms;
        assert_eq!(RoomAction::try_from(cmd.clone()), Err(cmd));

        assert_eq!(
            RoomAction::try_from(ClientCommand::PlayCard {
                target_team: Team::Pink,
                target_slot: 2,
            }),
            Ok(RoomAction::PlayCard {
                target: Position::SharedSlot(Team::Pink, 2),
            })
        );
        assert_eq!(
            RoomAction::try_from(ClientCommand::AdvanceRound),
            Ok(RoomAction::AdvanceRound)
        );
    }
}
