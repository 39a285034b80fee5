//! Commands clients send and events the server emits.
//!
//! Both enums are internally tagged: `{ "type": "play-card", ... }`. The
//! variant set is closed on purpose. Every event carries exactly the fields
//! listed here, so clients never have to check for optional keys.

use serde::{Deserialize, Serialize};

use crate::{
    Card, GameState, LogEntry, Outcome, PerTeam, PlayerId, RoomId, Team,
};

// ---------------------------------------------------------------------------
// Views: what a client is allowed to see
// ---------------------------------------------------------------------------

/// A roster line. Never includes the player's card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub username: String,
    pub team: Team,
    pub is_ready: bool,
}

/// The board as seen by one team.
///
/// `player_card` is the viewing team's hidden hand card, or `None` for a
/// viewer without a team. The opponent's hand card is never included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardView {
    pub player_card: Option<Card>,
    pub shared: PerTeam<Vec<Card>>,
    pub discards: PerTeam<Vec<Card>>,
}

/// Full room state for a newly seated player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub name: String,
    pub state: GameState,
    pub players: Vec<PlayerView>,
    pub board: BoardView,
    pub rounds_won: PerTeam<u32>,
    pub total_points: PerTeam<u32>,
    pub current_points: PerTeam<u32>,
    pub team_out: PerTeam<bool>,
    pub current_round: u32,
    pub time_left: u32,
    pub logs: Vec<LogEntry>,
}

/// One row of the lobby listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub id: RoomId,
    pub name: String,
    pub player_count: usize,
    pub max_players: usize,
    pub state: GameState,
    pub scores: PerTeam<u32>,
    pub rounds_won: PerTeam<u32>,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Everything a client can ask the server to do.
///
/// The actor identity is not part of the message; the transport attaches
/// it from the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientCommand {
    ListRooms,
    CreateRoom {
        username: String,
        #[serde(default)]
        room_name: Option<String>,
    },
    JoinRoom {
        username: String,
        room_id: RoomId,
    },
    SetReady {
        ready: bool,
    },
    PlayCard {
        target_team: Team,
        target_slot: usize,
    },
    DiscardCard,
    CallTeamOut,
    /// Re-ready for the next round after a round has ended.
    AdvanceRound,
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Everything the server can tell a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    RoomList {
        rooms: Vec<RoomSummary>,
    },
    RoomCreated {
        state: RoomSnapshot,
    },
    Joined {
        state: RoomSnapshot,
        your_team: Team,
        your_card: Card,
    },
    PlayerJoined {
        roster: Vec<PlayerView>,
    },
    PlayerLeft {
        roster: Vec<PlayerView>,
    },
    ReadyChanged {
        roster: Vec<PlayerView>,
        all_ready: bool,
    },
    RoundStarted {
        board: BoardView,
        time_left: u32,
        round: u32,
    },
    Tick {
        time_left: u32,
    },
    CardPlayed {
        board: BoardView,
        logs: Vec<LogEntry>,
        scores: PerTeam<u32>,
    },
    CardDiscarded {
        board: BoardView,
        logs: Vec<LogEntry>,
        scores: PerTeam<u32>,
    },
    TeamOutChanged {
        flags: PerTeam<bool>,
    },
    RoundEnded {
        scores: PerTeam<u32>,
        rounds_won: PerTeam<u32>,
        total_points: PerTeam<u32>,
        outcome: Outcome,
    },
    GameEnded {
        rounds_won: PerTeam<u32>,
        total_points: PerTeam<u32>,
        outcome: Outcome,
        /// `true` when the game ended because the other team left
        /// mid-round rather than by winning rounds.
        forfeited: bool,
    },
    Rejected {
        reason: String,
    },
}
