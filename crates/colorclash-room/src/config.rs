//! Room configuration.

use colorclash_timer::TimerConfig;

/// Seats per room: one per team. A player's card is their team's hand
/// card on the board, so a team never has two members.
pub const MAX_SEATS: usize = 2;

/// Configuration shared by every room a registry creates.
///
/// The defaults are the house rules: two players, three shared slots per
/// team, a fixed 60-second round, first to three round wins.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Players required before a round can start.
    pub min_players: usize,

    /// Maximum players seated in one room. Rooms cap it at [`MAX_SEATS`].
    pub max_players: usize,

    /// Shared slots in each team's row.
    pub shared_slots: usize,

    /// Length of every round in seconds.
    pub round_secs: u32,

    /// Round wins needed to take the game.
    pub rounds_to_win: u32,

    /// How many activity log lines a room keeps (newest first).
    pub log_capacity: usize,

    /// Seed for the room's card factory. `None` draws from the OS.
    /// Each room created by a registry gets `seed + room number` so rooms
    /// don't deal identical boards.
    pub seed: Option<u64>,

    /// Countdown cadence and broadcast throttling.
    pub timer: TimerConfig,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: 2,
            shared_slots: 3,
            round_secs: 60,
            rounds_to_win: 3,
            log_capacity: 10,
            seed: None,
            timer: TimerConfig::default(),
        }
    }
}
