//! UCT search loop
//!
//! Implements the four MCTS phases over [`SearchTree`]:
//! 1. Selection - descend while fully expanded, maximizing the UCT score
//! 2. Expansion - add one child
//! 3. Simulation - random rollout to a terminal state
//! 4. Backpropagation - update visit/win statistics up to the root
//!
//! Three selection/backprop combinations are exposed as policies; the
//! "aggressive" one is deliberately non-standard (see [`SearchPolicy`]).

use crate::rollout::rollout;
use crate::tree::{NodeId, SearchTree};
use othello_core::{Player, WinState};
use rand::Rng;
use tracing::debug;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Default exploration constant, sqrt(2).
pub const EXPLORATION: f32 = std::f32::consts::SQRT_2;

/// Which selection score and backpropagation rule the search runs with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SearchPolicy {
    /// Canonical UCT: the exploration bonus carries the constant.
    Standard,
    /// The constant multiplies the win ratio instead of the exploration
    /// bonus. Plays more decisively and less balanced than canonical UCT.
    ExploitationBiased,
    /// Lopsided on purpose, tuned to be entertaining rather than strong:
    /// when optimizing for black, selection is exploitation-biased and the
    /// freshly expanded child is expanded a second time before the rollout;
    /// win credit only accrues on the optimized color's levels. Do not
    /// "fix" this to canonical UCT.
    Aggressive { optimize_for: Player },
}

/// Search configuration.
#[derive(Clone, Copy, Debug)]
pub struct SearchConfig {
    pub iterations: u32,
    pub exploration: f32,
    pub policy: SearchPolicy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            exploration: EXPLORATION,
            policy: SearchPolicy::Standard,
        }
    }
}

impl SearchConfig {
    pub fn standard(iterations: u32) -> Self {
        Self {
            iterations,
            ..Default::default()
        }
    }

    pub fn exploitation_biased(iterations: u32) -> Self {
        Self {
            iterations,
            policy: SearchPolicy::ExploitationBiased,
            ..Default::default()
        }
    }

    pub fn aggressive(iterations: u32, optimize_for: Player) -> Self {
        Self {
            iterations,
            policy: SearchPolicy::Aggressive { optimize_for },
            ..Default::default()
        }
    }
}

// ============================================================================
// SELECTION SCORES
// ============================================================================

/// Canonical UCT score: `C * sqrt(ln(N) / v) + w/v`.
///
/// Unvisited children score infinity so every expanded child receives a
/// simulation before ratios are compared - no division by zero.
pub fn uct_score(wins: f32, visits: u32, parent_visits: u32, c: f32) -> f32 {
    if visits == 0 {
        return f32::INFINITY;
    }
    let exploitation = wins / visits as f32;
    let exploration = ((parent_visits as f32).ln() / visits as f32).sqrt();
    c * exploration + exploitation
}

/// Exploitation-biased score: `sqrt(ln(N) / v) + C * w/v`.
///
/// Same two terms as [`uct_score`] with the constant moved onto the win
/// ratio.
pub fn exploitation_biased_score(wins: f32, visits: u32, parent_visits: u32, c: f32) -> f32 {
    if visits == 0 {
        return f32::INFINITY;
    }
    let exploitation = wins / visits as f32;
    let exploration = ((parent_visits as f32).ln() / visits as f32).sqrt();
    exploration + c * exploitation
}

#[derive(Clone, Copy)]
enum SelectionRule {
    Standard,
    Biased,
}

impl SelectionRule {
    fn score(self, wins: f32, visits: u32, parent_visits: u32, c: f32) -> f32 {
        match self {
            SelectionRule::Standard => uct_score(wins, visits, parent_visits, c),
            SelectionRule::Biased => exploitation_biased_score(wins, visits, parent_visits, c),
        }
    }
}

// ============================================================================
// SEARCH LOOP
// ============================================================================

/// Run `config.iterations` rounds of MCTS from the tree's root.
///
/// A terminal root is a no-op: the tree is left untouched.
pub fn run_search<R: Rng>(tree: &mut SearchTree, config: &SearchConfig, rng: &mut R) {
    if tree.get(tree.root()).is_terminal() {
        debug!(policy = ?config.policy, "search skipped: terminal root");
        return;
    }

    for _ in 0..config.iterations {
        match config.policy {
            SearchPolicy::Standard => {
                run_iteration(tree, SelectionRule::Standard, config.exploration, rng);
            }
            SearchPolicy::ExploitationBiased => {
                run_iteration(tree, SelectionRule::Biased, config.exploration, rng);
            }
            SearchPolicy::Aggressive { optimize_for } => {
                run_aggressive_iteration(tree, optimize_for, config.exploration, rng);
            }
        }
    }

    debug!(
        iterations = config.iterations,
        nodes = tree.len(),
        root_visits = tree.total_visits(),
        best = ?tree.best_move(),
        "search complete"
    );
}

/// One complete select / expand / simulate / backpropagate cycle.
fn run_iteration<R: Rng>(tree: &mut SearchTree, rule: SelectionRule, c: f32, rng: &mut R) {
    let node = select_and_expand(tree, rule, c);
    let result = simulate(tree, node, rng);
    backpropagate(tree, node, result);
}

/// The aggressive cycle. Optimizing for black, the freshly created child is
/// expanded once more (when it still has untried moves) and the rollout
/// starts from the grandchild; optimizing for white, the walk is standard.
/// Either way the asymmetric backprop rule applies.
fn run_aggressive_iteration<R: Rng>(
    tree: &mut SearchTree,
    optimize_for: Player,
    c: f32,
    rng: &mut R,
) {
    let node = match optimize_for {
        Player::Black => {
            let first = select_and_expand(tree, SelectionRule::Biased, c);
            if !tree.get(first).is_fully_expanded() {
                tree.expand(first).unwrap_or(first)
            } else {
                first
            }
        }
        Player::White => select_and_expand(tree, SelectionRule::Standard, c),
    };

    let result = simulate(tree, node, rng);
    backpropagate_aggressive(tree, node, result, optimize_for);
}

/// Descend while fully expanded and non-terminal, then expand one child.
/// Terminal nodes are returned as-is.
fn select_and_expand(tree: &mut SearchTree, rule: SelectionRule, c: f32) -> NodeId {
    let mut current = tree.root();

    while tree.get(current).is_fully_expanded() && !tree.get(current).is_terminal() {
        match select_best_child(tree, current, rule, c) {
            Some(child) => current = child,
            None => break,
        }
    }

    if tree.get(current).is_terminal() {
        return current;
    }
    tree.expand(current).unwrap_or(current)
}

fn select_best_child(
    tree: &SearchTree,
    id: NodeId,
    rule: SelectionRule,
    c: f32,
) -> Option<NodeId> {
    let node = tree.get(id);
    if node.children.is_empty() {
        return None;
    }

    let parent_visits = node.visits;
    node.children
        .iter()
        .max_by(|(_, a), (_, b)| {
            let child_a = tree.get(*a);
            let child_b = tree.get(*b);
            let score_a = rule.score(child_a.wins, child_a.visits, parent_visits, c);
            let score_b = rule.score(child_b.wins, child_b.visits, parent_visits, c);
            score_a
                .partial_cmp(&score_b)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(_, id)| *id)
}

/// Value a node by rollout; terminal nodes already know their outcome.
fn simulate<R: Rng>(tree: &SearchTree, id: NodeId, rng: &mut R) -> WinState {
    let node = tree.get(id);
    if node.is_terminal() {
        return node.state.winner();
    }
    rollout(&node.state, rng)
}

// ============================================================================
// BACKPROPAGATION
// ============================================================================

/// Standard rule: every node on the path gains a visit; a node gains win
/// credit when the side that moved into it (its parent's side to move) came
/// out on top. A draw credits every parented node - tie-averse bookkeeping,
/// not a symmetric half point.
pub fn backpropagate(tree: &mut SearchTree, from: NodeId, result: WinState) {
    let mut current = Some(from);
    while let Some(id) = current {
        let parent = tree.get(id).parent;
        let credit = match parent {
            Some(pid) => win_credit(tree.get(pid).state.to_move, result),
            None => 0.0,
        };

        let node = tree.get_mut(id);
        node.visits += 1;
        node.wins += credit;
        current = parent;
    }
}

/// Asymmetric rule: only nodes whose parent has the optimized color to move
/// accrue credit; everything else just counts the visit. A white win pays
/// double when optimizing for white.
pub fn backpropagate_aggressive(
    tree: &mut SearchTree,
    from: NodeId,
    result: WinState,
    optimize_for: Player,
) {
    let mut current = Some(from);
    while let Some(id) = current {
        let parent = tree.get(id).parent;
        let credit = match parent {
            Some(pid) if tree.get(pid).state.to_move == optimize_for => {
                aggressive_credit(optimize_for, result)
            }
            _ => 0.0,
        };

        let node = tree.get_mut(id);
        node.visits += 1;
        node.wins += credit;
        current = parent;
    }
}

fn win_credit(parent_to_move: Player, result: WinState) -> f32 {
    match result {
        WinState::Draw => 1.0,
        WinState::BlackWin if parent_to_move == Player::Black => 1.0,
        WinState::WhiteWin if parent_to_move == Player::White => 1.0,
        _ => 0.0,
    }
}

fn aggressive_credit(optimize_for: Player, result: WinState) -> f32 {
    match (optimize_for, result) {
        (Player::Black, WinState::BlackWin) => 1.0,
        (Player::White, WinState::WhiteWin) => 2.0,
        (_, WinState::Draw) => 1.0,
        _ => 0.0,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use othello_core::{Board, Cell, GameState};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn terminal_state() -> GameState {
        let mut board = Board::default();
        board.set_cell(0, 0, Cell::Black);
        GameState {
            board,
            to_move: Player::Black,
        }
    }

    #[test]
    fn test_uct_score_formulas() {
        let c = EXPLORATION;
        let exploitation = 7.0 / 10.0;
        let exploration = (100.0f32.ln() / 10.0).sqrt();

        let standard = uct_score(7.0, 10, 100, c);
        assert!((standard - (c * exploration + exploitation)).abs() < 1e-6);

        let biased = exploitation_biased_score(7.0, 10, 100, c);
        assert!((biased - (exploration + c * exploitation)).abs() < 1e-6);

        assert!(standard != biased);
    }

    #[test]
    fn test_unvisited_children_score_infinity() {
        assert!(uct_score(0.0, 0, 50, EXPLORATION).is_infinite());
        assert!(exploitation_biased_score(0.0, 0, 50, EXPLORATION).is_infinite());
    }

    #[test]
    fn test_visit_accounting() {
        let mut tree = SearchTree::initial();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        run_search(&mut tree, &SearchConfig::standard(100), &mut rng);

        assert_eq!(tree.total_visits(), 100);
        // Every iteration descends through exactly one root child.
        let first_level: u32 = tree.move_statistics().iter().map(|(_, v, _)| v).sum();
        assert_eq!(first_level, 100);
    }

    #[test]
    fn test_search_on_terminal_root_is_a_noop() {
        let mut tree = SearchTree::new(terminal_state());
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        run_search(&mut tree, &SearchConfig::standard(50), &mut rng);

        assert_eq!(tree.total_visits(), 0);
        assert_eq!(tree.len(), 1);
        assert!(tree.best_move().is_none());
    }

    #[test]
    fn test_all_policies_complete_their_budget() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for config in [
            SearchConfig::standard(25),
            SearchConfig::exploitation_biased(25),
            SearchConfig::aggressive(25, Player::Black),
            SearchConfig::aggressive(25, Player::White),
        ] {
            let mut tree = SearchTree::initial();
            run_search(&mut tree, &config, &mut rng);
            assert_eq!(tree.total_visits(), 25);
            assert!(tree.best_move().is_some());
        }
    }

    #[test]
    fn test_backpropagate_credits_parents_mover() {
        let mut tree = SearchTree::initial(); // black to move at the root
        let child = tree.expand(tree.root()).unwrap();

        backpropagate(&mut tree, child, WinState::BlackWin);

        // The child was reached by black's move, so black's win credits it.
        assert_eq!(tree.get(child).visits, 1);
        assert_eq!(tree.get(child).wins, 1.0);
        // The root has no parent and collects no credit.
        assert_eq!(tree.get(tree.root()).visits, 1);
        assert_eq!(tree.get(tree.root()).wins, 0.0);

        backpropagate(&mut tree, child, WinState::WhiteWin);
        assert_eq!(tree.get(child).visits, 2);
        assert_eq!(tree.get(child).wins, 1.0);
    }

    #[test]
    fn test_backpropagate_counts_draws_as_wins() {
        let mut tree = SearchTree::initial();
        let child = tree.expand(tree.root()).unwrap();
        let grandchild = tree.expand(child).unwrap();

        backpropagate(&mut tree, grandchild, WinState::Draw);

        // Both parented levels collect the draw credit.
        assert_eq!(tree.get(child).wins, 1.0);
        assert_eq!(tree.get(grandchild).wins, 1.0);
    }

    #[test]
    fn test_aggressive_backprop_skips_the_other_color() {
        let mut tree = SearchTree::initial(); // root: black to move
        let child = tree.expand(tree.root()).unwrap(); // child: white to move
        let grandchild = tree.expand(child).unwrap();

        backpropagate_aggressive(&mut tree, grandchild, WinState::BlackWin, Player::Black);

        // child's parent (root) has black to move: credited.
        assert_eq!(tree.get(child).wins, 1.0);
        // grandchild's parent (child) has white to move: visit only.
        assert_eq!(tree.get(grandchild).wins, 0.0);
        assert_eq!(tree.get(grandchild).visits, 1);
    }

    #[test]
    fn test_aggressive_backprop_doubles_white_wins() {
        let mut tree = SearchTree::initial();
        let child = tree.expand(tree.root()).unwrap();
        assert_eq!(tree.get(child).state.to_move, Player::White);
        let grandchild = tree.expand(child).unwrap();

        backpropagate_aggressive(&mut tree, grandchild, WinState::WhiteWin, Player::White);

        // grandchild's parent has white to move: double credit.
        assert_eq!(tree.get(grandchild).wins, 2.0);
        // child's parent (root, black to move): nothing.
        assert_eq!(tree.get(child).wins, 0.0);

        backpropagate_aggressive(&mut tree, grandchild, WinState::Draw, Player::White);
        assert_eq!(tree.get(grandchild).wins, 3.0);
    }

    #[test]
    fn test_search_is_reproducible_under_a_fixed_seed() {
        let run = || {
            let mut tree = SearchTree::initial();
            let mut rng = ChaCha8Rng::seed_from_u64(9);
            run_search(&mut tree, &SearchConfig::standard(200), &mut rng);
            (tree.best_move(), tree.move_statistics())
        };

        assert_eq!(run(), run());
    }
}
