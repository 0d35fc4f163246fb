//! OTHELLO Core - Bitboard engine and game state
//!
//! This crate provides the rules layer for an Othello (Reversi) engine:
//! - Bit-parallel move generation and capture resolution (directional fill)
//! - Two-mask board representation with validated move application
//! - Game state with turn tracking, the pass rule, and outcome queries

pub mod bitboard;
pub mod board;
pub mod game;

// Re-exports for convenient access
pub use bitboard::{col_of, legal_moves, row_of, square_at, squares, Square};
pub use board::{Board, Cell, MoveError};
pub use game::{GameState, Player, WinState};
