//! Error types for the room layer.
//!
//! Every variant is a validation failure local to one command. None of
//! them is fatal: the room state is left untouched and the transport turns
//! the error into a `rejected` event for the offending player only.

use colorclash_protocol::{GameState, PlayerId, Position, RoomId, Team};

/// Errors that can occur during room operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The room is full, no more player slots available.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// Joining or creating a room needs a non-blank username.
    #[error("username is required")]
    UsernameRequired,

    /// The player is already seated in a room.
    #[error("player {0} is already in room {1}")]
    AlreadyInRoom(PlayerId, RoomId),

    /// The player is not in this room (or in no room at all).
    #[error("player {0} is not in a room")]
    NotInRoom(PlayerId),

    /// The command isn't allowed in the room's current state.
    #[error("cannot {action} while the room is {state}")]
    WrongState {
        action: &'static str,
        state: GameState,
    },

    /// The player's team already went out this round.
    #[error("the {0} team is out for this round")]
    TeamOut(Team),

    /// Plays only land on shared slots.
    #[error("cannot play onto {0}, only shared slots take plays")]
    NotPlayable(Position),

    /// The target shared slot doesn't exist.
    #[error("slot {index} is out of range, each row has {slots} slots")]
    SlotOutOfRange { index: usize, slots: usize },

    /// The face numbers aren't neighbours on the 1–8 track.
    #[error(
        "illegal play: {card} is not adjacent to {target} (faces must differ by one, 1 and 8 wrap)"
    )]
    IllegalPlay { card: u8, target: u8 },

    /// The room's actor has stopped or its command channel is full.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}
