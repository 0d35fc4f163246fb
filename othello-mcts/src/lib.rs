//! OTHELLO MCTS - Monte Carlo tree search over bitboard game states
//!
//! This crate provides the search half of the engine:
//! - Arena-allocated game tree with subtree reuse between moves
//! - UCT selection (standard, exploitation-biased, and an intentionally
//!   lopsided "aggressive" mode)
//! - PUCT selection with uniform move priors
//! - Uniform-random rollouts behind an explicit RNG handle
//! - Root-level search parallelization with statistics merging

pub mod parallel;
pub mod puct;
pub mod rollout;
pub mod search;
pub mod tree;

// Re-exports for convenient access
pub use parallel::{run_root_parallel_puct_search, run_root_parallel_search, DEFAULT_WORKERS};
pub use puct::{run_puct_search, PuctNode, PuctTree, DEFAULT_PUCT_C};
pub use rollout::rollout;
pub use search::{run_search, SearchConfig, SearchPolicy};
pub use tree::{Node, NodeId, SearchTree};
