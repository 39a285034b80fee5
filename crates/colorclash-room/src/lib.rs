//! Rooms for Colorclash.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns one
//! [`GameRoom`]: its players, its board, and its round timer.
//!
//! # Key types
//!
//! - [`CardFactory`]: deals cards with weighted point values
//! - [`Board`] and [`compute_scores`]: what's on the table and who it
//!   scores for
//! - [`GameRoom`]: the round/game state machine
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomRegistry`]: creates and destroys rooms, routes players
//! - [`RoomConfig`]: player limits, board size, round length

mod board;
mod cards;
mod config;
mod error;
mod game;
mod registry;
mod room;
mod scoring;

pub use board::{Board, faces_adjacent};
pub use cards::{CardFactory, P_FIVE, P_ONE};
pub use config::{MAX_SEATS, RoomConfig};
pub use error::RoomError;
pub use game::{GameRoom, Outbound, Player};
pub use registry::RoomRegistry;
pub use room::{EventSender, RoomAction, RoomHandle};
pub use scoring::{compute_scores, total_shared_value};
