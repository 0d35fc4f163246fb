//! UCT tree structure and node management
//!
//! Uses arena allocation: nodes live in a flat `Vec` and refer to each other
//! by index, so promoting a subtree when a move is played is an O(1)
//! reparent instead of a pointer surgery.

use othello_core::{GameState, MoveError, Square};

// ============================================================================
// TYPES
// ============================================================================

/// Node identifier (index into the arena).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// A node in the search tree.
#[derive(Clone, Debug)]
pub struct Node {
    /// Game state at this node.
    pub state: GameState,
    /// Parent node (None for the root, and for promoted ex-children).
    pub parent: Option<NodeId>,
    /// Move that led to this node (None for the root).
    pub incoming_move: Option<Square>,
    /// Children: (move, node_id) pairs, in expansion order.
    pub children: Vec<(Square, NodeId)>,
    /// Legal moves not yet expanded; popped from the back.
    pub untried_moves: Vec<Square>,
    /// Number of simulations that passed through this node.
    pub visits: u32,
    /// Accumulated win credit, scored from the parent's side to move.
    pub wins: f32,
    terminal: bool,
}

impl Node {
    pub fn new(state: GameState, parent: Option<NodeId>, incoming_move: Option<Square>) -> Self {
        let terminal = state.is_terminal();
        let untried_moves = if terminal {
            Vec::new()
        } else {
            state.legal_move_squares()
        };

        Self {
            state,
            parent,
            incoming_move,
            children: Vec::new(),
            untried_moves,
            visits: 0,
            wins: 0.0,
            terminal,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn is_fully_expanded(&self) -> bool {
        self.untried_moves.is_empty()
    }

    /// Win ratio seen from the parent's side to move.
    pub fn win_rate(&self) -> f32 {
        if self.visits == 0 {
            0.5
        } else {
            self.wins / self.visits as f32
        }
    }
}

// ============================================================================
// SEARCH TREE
// ============================================================================

/// Arena-allocated search tree with a movable root.
#[derive(Debug)]
pub struct SearchTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl SearchTree {
    pub fn new(root_state: GameState) -> Self {
        Self {
            nodes: vec![Node::new(root_state, None, None)],
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

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Number of nodes in the arena (including any detached from the
    /// current root by [`SearchTree::advance`]).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Total simulations recorded at the current root.
    pub fn total_visits(&self) -> u32 {
        self.get(self.root).visits
    }

    /// Expand one untried move of `id` into a new child.
    ///
    /// Returns the child's id, or None if the node is fully expanded.
    pub fn expand(&mut self, id: NodeId) -> Option<NodeId> {
        let mv = self.get_mut(id).untried_moves.pop()?;
        let child_state = self
            .get(id)
            .state
            .apply_move(mv)
            .expect("untried moves are legal for the node's side to move");

        let child_id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(child_state, Some(id), Some(mv)));
        self.get_mut(id).children.push((mv, child_id));

        Some(child_id)
    }

    /// Re-root the tree after `mv` is played from the current root.
    ///
    /// If the move was already expanded, its child is detached (parent link
    /// cleared) and promoted to root with all accumulated statistics;
    /// otherwise a fresh single-node tree is built from the resulting state.
    pub fn advance(mut self, mv: Square) -> Result<SearchTree, MoveError> {
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
        Ok(SearchTree::new(next))
    }

    /// Best move from the current root: highest visit count, the robust
    /// proxy for move strength (never the raw win ratio).
    pub fn best_move(&self) -> Option<Square> {
        self.get(self.root)
            .children
            .iter()
            .max_by_key(|(_, id)| self.get(*id).visits)
            .map(|(mv, _)| *mv)
    }

    /// Per-move (visits, win rate) snapshot of the root's children.
    pub fn move_statistics(&self) -> Vec<(Square, u32, f32)> {
        self.get(self.root)
            .children
            .iter()
            .map(|(mv, id)| {
                let child = self.get(*id);
                (*mv, child.visits, child.win_rate())
            })
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use othello_core::{square_at, Board, Cell, Player};

    #[test]
    fn test_root_node_creation() {
        let tree = SearchTree::initial();
        let root = tree.get(tree.root());

        assert_eq!(tree.len(), 1);
        assert!(root.parent.is_none());
        assert!(root.incoming_move.is_none());
        assert_eq!(root.untried_moves.len(), 4);
        assert_eq!(root.visits, 0);
        assert_eq!(root.wins, 0.0);
        assert!(!root.is_terminal());
    }

    #[test]
    fn test_expand_moves_one_square_to_children() {
        let mut tree = SearchTree::initial();
        let before = tree.get(tree.root()).untried_moves.clone();

        let child_id = tree.expand(tree.root()).unwrap();

        let root = tree.get(tree.root());
        assert_eq!(tree.len(), 2);
        assert_eq!(root.untried_moves.len(), before.len() - 1);
        assert_eq!(root.children.len(), 1);

        let (mv, id) = root.children[0];
        assert_eq!(id, child_id);
        assert_eq!(Some(mv), before.last().copied());
        assert!(!root.untried_moves.contains(&mv));
        assert_eq!(tree.get(child_id).parent, Some(tree.root()));
        assert_eq!(tree.get(child_id).incoming_move, Some(mv));
    }

    #[test]
    fn test_expand_exhausts_untried_moves() {
        let mut tree = SearchTree::initial();
        for _ in 0..4 {
            assert!(tree.expand(tree.root()).is_some());
        }
        assert!(tree.expand(tree.root()).is_none());
        assert!(tree.get(tree.root()).is_fully_expanded());
        assert_eq!(tree.get(tree.root()).children.len(), 4);
    }

    #[test]
    fn test_terminal_node_has_no_untried_moves() {
        let mut board = Board::default();
        board.set_cell(0, 0, Cell::Black);
        let state = GameState {
            board,
            to_move: Player::Black,
        };

        let tree = SearchTree::new(state);
        let root = tree.get(tree.root());
        assert!(root.is_terminal());
        assert!(root.untried_moves.is_empty());
        assert!(root.is_fully_expanded());
    }

    #[test]
    fn test_advance_promotes_expanded_child() {
        let mut tree = SearchTree::initial();
        let child_id = tree.expand(tree.root()).unwrap();
        let mv = tree.get(child_id).incoming_move.unwrap();
        tree.get_mut(child_id).visits = 17;
        tree.get_mut(child_id).wins = 9.0;

        let tree = tree.advance(mv).unwrap();

        assert_eq!(tree.root(), child_id);
        let root = tree.get(tree.root());
        assert!(root.parent.is_none());
        assert_eq!(root.visits, 17);
        assert_eq!(root.wins, 9.0);
    }

    #[test]
    fn test_advance_builds_fresh_node_for_unexpanded_move() {
        let tree = SearchTree::initial();
        let mv = square_at(2, 3);

        let tree = tree.advance(mv).unwrap();

        let root = tree.get(tree.root());
        assert!(root.parent.is_none());
        assert_eq!(root.visits, 0);
        assert_eq!(root.state.score(), (4, 1));
        assert_eq!(root.state.to_move, Player::White);
    }

    #[test]
    fn test_advance_rejects_illegal_move() {
        let tree = SearchTree::initial();
        assert!(tree.advance(square_at(0, 0)).is_err());
    }

    #[test]
    fn test_best_move_is_by_visits_not_win_rate() {
        let mut tree = SearchTree::initial();
        let a = tree.expand(tree.root()).unwrap();
        let b = tree.expand(tree.root()).unwrap();

        // `a` has the worse ratio but more visits.
        tree.get_mut(a).visits = 10;
        tree.get_mut(a).wins = 2.0;
        tree.get_mut(b).visits = 5;
        tree.get_mut(b).wins = 5.0;

        let best = tree.best_move().unwrap();
        assert_eq!(Some(best), tree.get(a).incoming_move);
    }

    #[test]
    fn test_move_statistics() {
        let mut tree = SearchTree::initial();
        let a = tree.expand(tree.root()).unwrap();
        tree.get_mut(a).visits = 10;
        tree.get_mut(a).wins = 7.0;

        let stats = tree.move_statistics();
        assert_eq!(stats.len(), 1);
        let (mv, visits, win_rate) = stats[0];
        assert_eq!(Some(mv), tree.get(a).incoming_move);
        assert_eq!(visits, 10);
        assert!((win_rate - 0.7).abs() < 1e-6);
    }
}
