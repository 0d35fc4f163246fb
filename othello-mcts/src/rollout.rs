//! Rollout (simulation) policy
//!
//! Fast, non-tree-recorded playouts used to estimate a position's value.

use othello_core::{GameState, WinState};
use rand::Rng;

/// Play uniformly random legal moves to the end of the game and report who
/// won. A side with no legal move passes; the loop ends only when neither
/// side can place a disk.
///
/// The RNG is an explicit handle so concurrent searches can run fully
/// independent, reproducible streams.
pub fn rollout<R: Rng>(state: &GameState, rng: &mut R) -> WinState {
    let mut current = *state;

    while !current.is_terminal() {
        let moves = current.legal_move_squares();
        if moves.is_empty() {
            current.to_move = current.to_move.opponent();
            continue;
        }

        let mv = moves[rng.gen_range(0..moves.len())];
        current = current
            .apply_move(mv)
            .expect("rollout only picks generated legal moves");
    }

    current.winner()
}
