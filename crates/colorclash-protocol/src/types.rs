//! Core value types shared by every layer of Colorclash.
//!
//! Everything here is plain data: identities, teams, cards, board
//! positions, and the room lifecycle state. None of it knows about rooms,
//! timers, or sockets, which is why the room crate and the server crate
//! can both depend on it.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a connected player.
///
/// Serialized as the bare number (`#[serde(transparent)]`), displayed as
/// `P-<n>` in logs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A unique identifier for a room (one game instance).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Team
// ---------------------------------------------------------------------------

/// One of the two opposing sides. Symmetric in every rule.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Yellow,
    Pink,
}

impl Team {
    /// Both teams, yellow first. Iteration order everywhere in the crate.
    pub const ALL: [Team; 2] = [Team::Yellow, Team::Pink];

    /// The other team.
    pub fn opponent(self) -> Team {
        match self {
            Team::Yellow => Team::Pink,
            Team::Pink => Team::Yellow,
        }
    }

    /// Lowercase name, as used on the wire and in position strings.
    pub fn as_str(self) -> &'static str {
        match self {
            Team::Yellow => "yellow",
            Team::Pink => "pink",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PerTeam
// ---------------------------------------------------------------------------

/// One value per team, indexable by [`Team`].
///
/// Serializes as `{ "yellow": .., "pink": .. }`, which is the shape every
/// score, flag and counter takes on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerTeam<T> {
    pub yellow: T,
    pub pink: T,
}

impl<T> PerTeam<T> {
    pub fn new(yellow: T, pink: T) -> Self {
        Self { yellow, pink }
    }

    /// Builds each side from a function of the team.
    pub fn from_fn(mut f: impl FnMut(Team) -> T) -> Self {
        Self {
            yellow: f(Team::Yellow),
            pink: f(Team::Pink),
        }
    }

    /// Applies `f` to both sides.
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> PerTeam<U> {
        PerTeam {
            yellow: f(&self.yellow),
            pink: f(&self.pink),
        }
    }

    /// `(team, value)` pairs, yellow first.
    pub fn iter(&self) -> impl Iterator<Item = (Team, &T)> {
        [(Team::Yellow, &self.yellow), (Team::Pink, &self.pink)].into_iter()
    }
}

impl<T: Clone> PerTeam<T> {
    /// The same value on both sides.
    pub fn splat(value: T) -> Self {
        Self {
            yellow: value.clone(),
            pink: value,
        }
    }
}

impl<T> Index<Team> for PerTeam<T> {
    type Output = T;

    fn index(&self, team: Team) -> &T {
        match team {
            Team::Yellow => &self.yellow,
            Team::Pink => &self.pink,
        }
    }
}

impl<T> IndexMut<Team> for PerTeam<T> {
    fn index_mut(&mut self, team: Team) -> &mut T {
        match team {
            Team::Yellow => &mut self.yellow,
            Team::Pink => &mut self.pink,
        }
    }
}

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

/// Lowest face number on the circular track.
pub const MIN_FACE: u8 = 1;
/// Highest face number; adjacent to [`MIN_FACE`] through the wraparound.
pub const MAX_FACE: u8 = 8;

/// The point value of a card. Fixed at creation.
///
/// On the wire this is the bare number `1`, `5` or `10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CardValue {
    One,
    Five,
    Ten,
}

impl CardValue {
    pub fn points(self) -> u32 {
        match self {
            CardValue::One => 1,
            CardValue::Five => 5,
            CardValue::Ten => 10,
        }
    }
}

impl From<CardValue> for u8 {
    fn from(value: CardValue) -> u8 {
        value.points() as u8
    }
}

impl TryFrom<u8> for CardValue {
    type Error = ProtocolError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            1 => Ok(CardValue::One),
            5 => Ok(CardValue::Five),
            10 => Ok(CardValue::Ten),
            other => Err(ProtocolError::InvalidCard(format!(
                "value must be 1, 5 or 10, got {other}"
            ))),
        }
    }
}

/// A single card: face number, point value, and the team that controls it.
///
/// `owner` is who currently holds the card, not who drew it. A shared slot
/// captured by the opponent holds a card owned by the opponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub number: u8,
    pub value: CardValue,
    pub owner: Team,
}

impl Card {
    pub fn new(number: u8, value: CardValue, owner: Team) -> Self {
        debug_assert!((MIN_FACE..=MAX_FACE).contains(&number));
        Self {
            number,
            value,
            owner,
        }
    }

    pub fn points(&self) -> u32 {
        self.value.points()
    }
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A place on the board.
///
/// Commands name their target as a team and a slot index. The room layer
/// receives them as a `Position`, built once when a command is turned into
/// a room action, so nothing inside it branches on loose fields. The
/// `Display` form (`pink-shared-2`) is what the activity log shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    /// The team's hidden hand card.
    PlayerSlot(Team),
    /// One of the team's shared slots, zero-based.
    SharedSlot(Team, usize),
    /// The team's discard pile.
    DiscardPile(Team),
}

impl Position {
    /// The team whose row this position belongs to.
    pub fn team(self) -> Team {
        match self {
            Position::PlayerSlot(t)
            | Position::SharedSlot(t, _)
            | Position::DiscardPile(t) => t,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::PlayerSlot(t) => write!(f, "{t}-player"),
            Position::SharedSlot(t, i) => write!(f, "{t}-shared-{i}"),
            Position::DiscardPile(t) => write!(f, "{t}-discard"),
        }
    }
}

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// ```text
///             ┌──────────────────────────┐
///             ▼                          │
/// Waiting → Playing → RoundEnded ────────┘
///             │           │
///             └──────→ GameEnded ←───────┘
/// ```
///
/// `Playing → GameEnded` is the forfeit edge (the opposing team left
/// mid-round). `GameEnded` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameState {
    Waiting,
    Playing,
    RoundEnded,
    GameEnded,
}

impl GameState {
    /// Returns `true` if the room accepts new players.
    pub fn is_joinable(self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// Returns `true` once the game is over for good.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::GameEnded)
    }

    /// Returns `true` if `target` is a legal next state.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Waiting, Self::Playing)
                | (Self::Playing, Self::RoundEnded)
                | (Self::Playing, Self::GameEnded)
                | (Self::RoundEnded, Self::Playing)
                | (Self::RoundEnded, Self::GameEnded)
        )
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Waiting => "waiting",
            Self::Playing => "playing",
            Self::RoundEnded => "round-ended",
            Self::GameEnded => "game-ended",
        })
    }
}

// ---------------------------------------------------------------------------
// Recipient: who should receive an event?
// ---------------------------------------------------------------------------

/// Specifies who should receive a server event.
///
/// Room operations return `(Recipient, ServerEvent)` pairs; the room actor
/// resolves each recipient against its current roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every player in the room.
    All,
    /// One specific player.
    Player(PlayerId),
    /// Everyone except the given player.
    AllExcept(PlayerId),
    /// Every member of one team. Used for anything that carries the
    /// team's hidden card.
    Team(Team),
}

// ---------------------------------------------------------------------------
// Results and logs
// ---------------------------------------------------------------------------

/// How a round or a game came out.
///
/// JSON: `{"winner":"pink"}` or `"tie"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    Winner(Team),
    Tie,
}

impl Outcome {
    pub fn winner(self) -> Option<Team> {
        match self {
            Outcome::Winner(team) => Some(team),
            Outcome::Tie => None,
        }
    }
}

/// One line of the room's activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Milliseconds since the Unix epoch.
    pub at: u64,
    pub message: String,
}

// =========================================================================
// Tests
// =========================================================================
