//! Wire protocol for Colorclash.
//!
//! This crate defines the "language" clients and the server speak:
//!
//! - **Types** ([`Team`], [`Card`], [`Position`], [`GameState`], ids):
//!   the values every other layer passes around.
//! - **Messages** ([`ClientCommand`], [`ServerEvent`] and the views they
//!   carry): the closed command and event vocabulary.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how messages become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (ClientCommand) → Room (GameRoom)
//! ```

mod codec;
mod error;
mod messages;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use messages::{
    BoardView, ClientCommand, PlayerView, RoomSnapshot, RoomSummary,
    ServerEvent,
};
pub use types::{
    Card, CardValue, GameState, LogEntry, MAX_FACE, MIN_FACE, Outcome,
    PerTeam, PlayerId, Position, Recipient, RoomId, Team,
};
