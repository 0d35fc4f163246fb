//! Game state, turn order and outcome queries

use serde::{Deserialize, Serialize};

use crate::bitboard::{squares, Square};
use crate::board::{Board, MoveError};

/// Disk color / side to move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    Black,
    White,
}

impl Player {
    pub fn opponent(self) -> Self {
        match self {
            Player::Black => Player::White,
            Player::White => Player::Black,
        }
    }
}

/// Final outcome of a finished game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinState {
    BlackWin,
    WhiteWin,
    Draw,
}

/// A position together with whose turn it is.
///
/// Plain value type: applying a move copies the board, so a state handed to
/// a search can never be mutated behind the caller's back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub board: Board,
    pub to_move: Player,
}

impl GameState {
    /// The standard four-disk opening, black to move.
    pub fn initial() -> Self {
        GameState {
            board: Board::starting_position(),
            to_move: Player::Black,
        }
    }

    /// Bitmask of legal placements for the side to move.
    pub fn legal_moves(&self) -> u64 {
        self.board.moves_for(self.to_move)
    }

    /// Legal placements for the side to move, as ascending square indices.
    pub fn legal_move_squares(&self) -> Vec<Square> {
        squares(self.legal_moves())
    }

    pub fn is_legal(&self, sq: Square) -> bool {
        self.board.is_legal(self.to_move, sq)
    }

    /// Apply a move for the side to move and hand the turn over.
    ///
    /// If the opponent then has no reply but the mover still does, the turn
    /// flips back (the pass rule): every non-terminal state points at a side
    /// that can actually move.
    pub fn apply_move(&self, sq: Square) -> Result<GameState, MoveError> {
        let mut board = self.board;
        board.make_move(self.to_move, sq)?;

        let mut next = GameState {
            board,
            to_move: self.to_move.opponent(),
        };
        if !next.board.has_any_move(next.to_move)
            && next.board.has_any_move(next.to_move.opponent())
        {
            next.to_move = next.to_move.opponent();
        }
        Ok(next)
    }

    /// The game is over once neither color can place a disk. A single stuck
    /// side is not terminal - it passes.
    pub fn is_terminal(&self) -> bool {
        !self.board.has_any_move(Player::Black) && !self.board.has_any_move(Player::White)
    }

    /// Outcome by disk count; equal counts are a draw.
    pub fn winner(&self) -> WinState {
        let (black, white) = self.score();
        if black > white {
            WinState::BlackWin
        } else if white > black {
            WinState::WhiteWin
        } else {
            WinState::Draw
        }
    }

    /// (black, white) disk counts.
    pub fn score(&self) -> (u32, u32) {
        (self.board.count(Player::Black), self.board.count(Player::White))
    }
}
