//! The scoring engine.

use colorclash_protocol::PerTeam;

use crate::Board;

/// Each team's points on `board`.
///
/// Every shared card, in either row, scores for its owner, not for the
/// row it sits in. That is what makes capturing the opponent's row pay.
/// Hand cards and discard piles never score.
pub fn compute_scores(board: &Board) -> PerTeam<u32> {
    let mut scores = PerTeam::splat(0);
    for card in board.shared_cards() {
        scores[card.owner] += card.points();
    }
    scores
}

/// Total points on the board, whoever owns them.
pub fn total_shared_value(board: &Board) -> u32 {
    board.shared_cards().map(|card| card.points()).sum()
}
