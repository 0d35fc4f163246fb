//! PUCT search
//!
//! Same select/expand/simulate/backpropagate skeleton as the UCT loop, but
//! selection weights exploration by a per-move prior and exploitation is a
//! running-average reward. Priors are uniform over the legal moves at node
//! creation and never updated - a heuristic stand-in, not a learned policy.
//!
//! Per-move statistics live on the parent in fixed 64-element arrays indexed
//! directly by square: no hashing, branch-free updates.

use crate::rollout::rollout;
use crate::tree::NodeId;
use othello_core::{GameState, MoveError, Player, Square, WinState};
use rand::Rng;
use tracing::debug;

// ============================================================================
// TYPES
// ============================================================================

/// Default PUCT exploration constant.
pub const DEFAULT_PUCT_C: f32 = 2.0;

const BOARD_SQUARES: usize = 64;

/// A node in the PUCT tree. Edge statistics (N, Q, P) are stored on the
/// parent, keyed by the move's square index.
#[derive(Clone, Debug)]
pub struct PuctNode {
    pub state: GameState,
    pub parent: Option<NodeId>,
    pub incoming_move: Option<Square>,
    pub children: Vec<(Square, NodeId)>,
    pub untried_moves: Vec<Square>,
    /// Number of simulations that passed through this node.
    pub visits: u32,
    /// N: how often each move was taken from here.
    pub move_visits: [u32; BOARD_SQUARES],
    /// Q: running-average reward of each move, from this node's side to move.
    pub move_values: [f32; BOARD_SQUARES],
    /// P: prior probability of each move; uniform over the legal moves at
    /// creation, summing to 1, zero elsewhere.
    pub priors: [f32; BOARD_SQUARES],
    terminal: bool,
}

impl PuctNode {
    pub fn new(state: GameState, parent: Option<NodeId>, incoming_move: Option<Square>) -> Self {
        let terminal = state.is_terminal();
        let untried_moves = if terminal {
            Vec::new()
        } else {
            state.legal_move_squares()
        };

        let mut priors = [0.0; BOARD_SQUARES];
        if !untried_moves.is_empty() {
            let uniform = 1.0 / untried_moves.len() as f32;
            for &mv in &untried_moves {
                priors[mv as usize] = uniform;
            }
        }

        Self {
            state,
            parent,
            incoming_move,
            children: Vec::new(),
            untried_moves,
            visits: 0,
            move_visits: [0; BOARD_SQUARES],
            move_values: [0.0; BOARD_SQUARES],
            priors,
            terminal,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn is_fully_expanded(&self) -> bool {
        self.untried_moves.is_empty()
    }
}

/// Arena-allocated PUCT tree with a movable root.
#[derive(Debug)]
pub struct PuctTree {
    nodes: Vec<PuctNode>,
    root: NodeId,
}

impl PuctTree {
    pub fn new(root_state: GameState) -> Self {
        Self {
            nodes: vec![PuctNode::new(root_state, None, None)],
            root: NodeId(0),
        }
    }

    /// Tree rooted at the standard opening, black to move.
    pub fn initial() -> Self {
        Self::new(GameState::initial())
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> &PuctNode {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut PuctNode {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn total_visits(&self) -> u32 {
        self.get(self.root).visits
    }

    /// Expand one untried move of `id` into a new child.
    pub fn expand(&mut self, id: NodeId) -> Option<NodeId> {
        let mv = self.get_mut(id).untried_moves.pop()?;
        let child_state = self
            .get(id)
            .state
            .apply_move(mv)
            .expect("untried moves are legal for the node's side to move");

        let child_id = NodeId(self.nodes.len());
        self.nodes.push(PuctNode::new(child_state, Some(id), Some(mv)));
        self.get_mut(id).children.push((mv, child_id));

        Some(child_id)
    }

    /// Re-root after `mv` is played, reusing the expanded subtree when one
    /// exists (statistics preserved), else building a fresh node.
    pub fn advance(mut self, mv: Square) -> Result<PuctTree, MoveError> {
        let found = self
            .get(self.root)
            .children
            .iter()
            .find(|(m, _)| *m == mv)
            .map(|(_, id)| *id);

        if let Some(child_id) = found {
            self.get_mut(child_id).parent = None;
            self.root = child_id;
            return Ok(self);
        }

        let next = self.get(self.root).state.apply_move(mv)?;
        Ok(PuctTree::new(next))
    }

    /// Best move from the current root by child visit count.
    pub fn best_move(&self) -> Option<Square> {
        self.get(self.root)
            .children
            .iter()
            .max_by_key(|(_, id)| self.get(*id).visits)
            .map(|(mv, _)| *mv)
    }

    /// Per-move visit counts at the root (the N table, visited moves only).
    pub fn root_move_visits(&self) -> Vec<(Square, u32)> {
        let root = self.get(self.root);
        (0..BOARD_SQUARES as Square)
            .filter(|&sq| root.move_visits[sq as usize] > 0)
            .map(|sq| (sq, root.move_visits[sq as usize]))
            .collect()
    }
}

// ============================================================================
// SELECTION / BACKPROPAGATION
// ============================================================================

/// PUCT score of taking `mv` from `node`:
/// `Q(s,a) + c * P(s,a) * sqrt(N(s)) / (1 + N(s,a))`.
pub fn puct_score(node: &PuctNode, mv: Square, c: f32) -> f32 {
    let q = node.move_values[mv as usize];
    let p = node.priors[mv as usize];
    let parent_visits = node.visits as f32;
    let move_visits = node.move_visits[mv as usize] as f32;
    q + c * p * parent_visits.sqrt() / (1.0 + move_visits)
}

fn select_leaf(tree: &PuctTree, c: f32) -> NodeId {
    let mut current = tree.root();
    while tree.get(current).is_fully_expanded() && !tree.get(current).is_terminal() {
        match best_child(tree, current, c) {
            Some(child) => current = child,
            None => break,
        }
    }
    current
}

fn best_child(tree: &PuctTree, id: NodeId, c: f32) -> Option<NodeId> {
    let node = tree.get(id);
    if node.children.is_empty() {
        return None;
    }

    node.children
        .iter()
        .max_by(|(mv_a, _), (mv_b, _)| {
            let score_a = puct_score(node, *mv_a, c);
            let score_b = puct_score(node, *mv_b, c);
            score_a
                .partial_cmp(&score_b)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(_, id)| *id)
}

fn expand_leaf(tree: &mut PuctTree, id: NodeId) -> NodeId {
    if tree.get(id).is_terminal() {
        return id;
    }
    tree.expand(id).unwrap_or(id)
}

/// Reward of `result` from the point of view of the side that just moved.
fn reward_for(parent_to_move: Player, result: WinState) -> f32 {
    match result {
        WinState::Draw => 0.5,
        WinState::BlackWin if parent_to_move == Player::Black => 1.0,
        WinState::WhiteWin if parent_to_move == Player::White => 1.0,
        _ => 0.0,
    }
}

/// Walk from the simulated node to the root. Every node gains a visit; on
/// each parent edge the move's visit count goes up and its Q moves toward
/// the reward by `(reward - Q) / n`, with `n` the child's post-increment
/// visit count.
pub fn backpropagate(tree: &mut PuctTree, from: NodeId, result: WinState) {
    let mut current = Some(from);
    while let Some(id) = current {
        tree.get_mut(id).visits += 1;

        let parent = tree.get(id).parent;
        if let Some(pid) = parent {
            let mv = tree
                .get(id)
                .incoming_move
                .expect("non-root nodes record their incoming move");
            let reward = reward_for(tree.get(pid).state.to_move, result);
            let child_visits = tree.get(id).visits;

            let parent_node = tree.get_mut(pid);
            parent_node.move_visits[mv as usize] += 1;
            let q = parent_node.move_values[mv as usize];
            parent_node.move_values[mv as usize] += (reward - q) / child_visits as f32;
        }

        current = parent;
    }
}

// ============================================================================
// SEARCH LOOP
// ============================================================================

/// Run `iterations` rounds of PUCT from the tree's root.
///
/// A terminal root is a no-op: the tree is left untouched.
pub fn run_puct_search<R: Rng>(tree: &mut PuctTree, iterations: u32, c: f32, rng: &mut R) {
    if tree.get(tree.root()).is_terminal() {
        debug!("puct search skipped: terminal root");
        return;
    }

    for _ in 0..iterations {
        let selected = select_leaf(tree, c);
        let node = expand_leaf(tree, selected);

        let result = if tree.get(node).is_terminal() {
            tree.get(node).state.winner()
        } else {
            rollout(&tree.get(node).state, rng)
        };

        backpropagate(tree, node, result);
    }

    debug!(
        iterations,
        nodes = tree.len(),
        root_visits = tree.total_visits(),
        best = ?tree.best_move(),
        "puct search complete"
    );
}

// ============================================================================
// TESTS
// ============================================================================
