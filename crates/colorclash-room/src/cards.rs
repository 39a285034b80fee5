//! The card factory: face numbers and weighted point values.

use colorclash_protocol::{Card, CardValue, MAX_FACE, MIN_FACE, Team};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Probability that a new card is worth 1 point.
pub const P_ONE: f64 = 0.6;
/// Probability that a new card is worth 5 points (cumulative cut at 0.9).
pub const P_FIVE: f64 = 0.3;

/// Produces cards. One factory per room.
///
/// Uniform face numbers over 1–8; values 1/5/10 with probabilities
/// 60%/30%/10%. Seeded factories are fully reproducible.
#[derive(Debug, Clone)]
pub struct CardFactory {
    rng: StdRng,
}

impl CardFactory {
    /// A factory seeded from the operating system.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// A deterministic factory.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn random_face_number(&mut self) -> u8 {
        self.rng.random_range(MIN_FACE..=MAX_FACE)
    }

    pub fn random_value(&mut self) -> CardValue {
        let roll: f64 = self.rng.random();
        if roll < P_ONE {
            CardValue::One
        } else if roll < P_ONE + P_FIVE {
            CardValue::Five
        } else {
            CardValue::Ten
        }
    }

    /// A card with the given face, owned by `team`, with a fresh value.
    pub fn create_card(&mut self, number: u8, team: Team) -> Card {
        let value = self.random_value();
        Card::new(number, value, team)
    }

    /// A completely random card for `team`.
    pub fn deal(&mut self, team: Team) -> Card {
        let number = self.random_face_number();
        self.create_card(number, team)
    }
}

impl Default for CardFactory {
    fn default() -> Self {
        Self::new()
    }
}
