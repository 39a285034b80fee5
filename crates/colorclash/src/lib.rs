//! # Colorclash
//!
//! Authoritative session server for a two-team, real-time card game.
//!
//! Clients connect over WebSocket and speak JSON commands
//! ([`ClientCommand`](colorclash_protocol::ClientCommand)). Every room runs
//! as its own actor that validates plays, runs the round timer, keeps
//! score, and pushes [`ServerEvent`](colorclash_protocol::ServerEvent)s
//! back to its players.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use colorclash::prelude::*;
//!
//! # async fn run() -> Result<(), ColorclashError> {
//! let server = ColorclashServer::builder()
//!     .bind("0.0.0.0:3001")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::ColorclashError;
pub use server::{ColorclashServer, ColorclashServerBuilder, DEFAULT_BIND_ADDR};

pub mod prelude {
    //! Everything needed to run a server or talk to one in tests.

    pub use crate::{
        ColorclashError, ColorclashServer, ColorclashServerBuilder, DEFAULT_BIND_ADDR,
    };
    pub use colorclash_protocol::{
        BoardView, Card, CardValue, ClientCommand, Codec, GameState, JsonCodec,
        Outcome, PerTeam, PlayerId, RoomId, RoomSnapshot, RoomSummary, ServerEvent,
        Team,
    };
    pub use colorclash_room::{RoomConfig, RoomRegistry};
    pub use colorclash_timer::TimerConfig;
}
