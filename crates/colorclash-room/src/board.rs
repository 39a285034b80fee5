//! The board: hidden hand cards, shared rows, and discard piles.

use colorclash_protocol::{
    BoardView, Card, MAX_FACE, MIN_FACE, PerTeam, Position, Team,
};
use serde::Serialize;

use crate::CardFactory;

/// Returns `true` if face `card` may be played onto face `target`.
///
/// Faces sit on a circular track of eight, so besides plain neighbours
/// (`|d - t| == 1`) the pair 1/8 is adjacent too.
pub fn faces_adjacent(card: u8, target: u8) -> bool {
    card.abs_diff(target) == 1
        || (card == MIN_FACE && target == MAX_FACE)
        || (card == MAX_FACE && target == MIN_FACE)
}

/// One room's cards.
///
/// Invariants:
/// - every shared slot holds exactly one card (rows never shrink);
/// - `player_cards[team].owner == team`;
/// - discard piles are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Board {
    player_cards: PerTeam<Card>,
    shared: PerTeam<Vec<Card>>,
    discards: PerTeam<Vec<Card>>,
}

impl Board {
    /// Deals a fresh board: one hand card per team and `slots` shared
    /// cards per row, each owned by the row's home team.
    pub fn new(cards: &mut CardFactory, slots: usize) -> Self {
        let player_cards = PerTeam::from_fn(|team| cards.deal(team));
        let shared = PerTeam::from_fn(|team| {
            (0..slots).map(|_| cards.deal(team)).collect()
        });
        Self {
            player_cards,
            shared,
            discards: PerTeam::default(),
        }
    }

    /// Shared slots per row.
    pub fn slots(&self) -> usize {
        self.shared.yellow.len()
    }

    /// The team's hidden hand card.
    pub fn player_card(&self, team: Team) -> Card {
        self.player_cards[team]
    }

    pub fn shared(&self, team: Team) -> &[Card] {
        &self.shared[team]
    }

    pub fn discards(&self, team: Team) -> &[Card] {
        &self.discards[team]
    }

    /// Every shared card of both rows, yellow row first.
    pub fn shared_cards(&self) -> impl Iterator<Item = &Card> {
        self.shared.yellow.iter().chain(self.shared.pink.iter())
    }

    /// The card shown at `pos`: the hand card, the slot's card, or the top
    /// of the discard pile. `None` for an out-of-range slot or an empty pile.
    pub fn card_at(&self, pos: Position) -> Option<&Card> {
        match pos {
            Position::PlayerSlot(team) => Some(&self.player_cards[team]),
            Position::SharedSlot(team, index) => self.shared[team].get(index),
            Position::DiscardPile(team) => self.discards[team].last(),
        }
    }

    /// Gives the team a new hand card, returning the old one.
    pub fn replace_player_card(&mut self, team: Team, card: Card) -> Card {
        debug_assert_eq!(card.owner, team, "hand cards never change colour");
        std::mem::replace(&mut self.player_cards[team], card)
    }

    /// Puts `card` into a shared slot, returning the captured card.
    ///
    /// Returns `None` and changes nothing if the slot doesn't exist.
    pub fn replace_shared(
        &mut self,
        row: Team,
        index: usize,
        card: Card,
    ) -> Option<Card> {
        let slot = self.shared[row].get_mut(index)?;
        Some(std::mem::replace(slot, card))
    }

    /// Moves the team's hand card onto its discard pile and installs
    /// `replacement` as the new hand card. Returns the discarded card.
    pub fn discard(&mut self, team: Team, replacement: Card) -> Card {
        let old = self.replace_player_card(team, replacement);
        self.discards[team].push(old);
        old
    }

    /// The board as `viewer` may see it. Only the viewer's own hand card
    /// is included.
    pub fn view(&self, viewer: Option<Team>) -> BoardView {
        BoardView {
            player_card: viewer.map(|team| self.player_cards[team]),
            shared: self.shared.clone(),
            discards: self.discards.clone(),
        }
    }
}
