//! Root-level search parallelization
//!
//! One master search grows the real tree while `K` workers each grow an
//! independent, private tree from a value copy of the root state. The
//! workers' first-level statistics are then folded into the master root's
//! children. Averaging several shallow independent trees at the root cuts
//! variance compared to one deep tree of the same total budget, and no tree
//! is ever shared between threads, so nothing needs a lock.
//!
//! Merge order is worker-index order (the statistics are commutative sums,
//! but a fixed order keeps seeded runs bit-for-bit reproducible).

use crate::puct::{run_puct_search, PuctTree};
use crate::search::{run_search, SearchConfig};
use crate::tree::SearchTree;
use othello_core::Square;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::debug;

/// Worker count matching the fan-out the engine was tuned with.
pub const DEFAULT_WORKERS: usize = 9;

// ============================================================================
// UCT
// ============================================================================

/// Root-parallel UCT search (standard policy).
///
/// Each worker runs `iterations_per_worker` rounds on its own tree with a
/// private RNG stream seeded from the caller's; the master runs the same
/// budget against the real tree. Worker wins and visits are summed into the
/// master root's matching children, and the merged visit counts drive move
/// selection exactly as in the single-threaded search.
pub fn run_root_parallel_search<R: Rng>(
    tree: SearchTree,
    iterations_per_worker: u32,
    workers: usize,
    rng: &mut R,
) -> SearchTree {
    if tree.get(tree.root()).is_terminal() {
        return tree;
    }

    let root_state = tree.get(tree.root()).state;
    let config = SearchConfig::standard(iterations_per_worker);
    let master_seed: u64 = rng.gen();
    let worker_seed_base: u64 = rng.gen();

    let mut tree = tree;
    let (mut tree, worker_stats) = rayon::join(
        move || {
            let mut master_rng = ChaCha8Rng::seed_from_u64(master_seed);
            run_search(&mut tree, &config, &mut master_rng);
            tree
        },
        || {
            (0..workers)
                .into_par_iter()
                .map(|index| {
                    let seed = worker_seed_base.wrapping_add(index as u64);
                    let mut worker_rng = ChaCha8Rng::seed_from_u64(seed);
                    let mut worker_tree = SearchTree::new(root_state);
                    run_search(&mut worker_tree, &config, &mut worker_rng);
                    first_level_stats(&worker_tree)
                })
                .collect::<Vec<_>>()
        },
    );

    for stats in &worker_stats {
        for &(mv, wins, visits) in stats {
            if let Some(child_id) = child_by_move(&tree, mv) {
                let child = tree.get_mut(child_id);
                child.wins += wins;
                child.visits += visits;
            }
        }
    }

    debug!(
        workers,
        iterations_per_worker,
        merged_visits = tree.move_statistics().iter().map(|(_, v, _)| v).sum::<u32>(),
        best = ?tree.best_move(),
        "root-parallel search merged"
    );

    tree
}

/// First-level (move, wins, visits) triples of a finished worker tree.
fn first_level_stats(tree: &SearchTree) -> Vec<(Square, f32, u32)> {
    let root = tree.get(tree.root());
    root.children
        .iter()
        .map(|(mv, id)| {
            let child = tree.get(*id);
            (*mv, child.wins, child.visits)
        })
        .collect()
}

fn child_by_move(tree: &SearchTree, mv: Square) -> Option<crate::tree::NodeId> {
    tree.get(tree.root())
        .children
        .iter()
        .find(|(m, _)| *m == mv)
        .map(|(_, id)| *id)
}

// ============================================================================
// PUCT
// ============================================================================

/// Root-parallel PUCT search.
///
/// Workers report per-move visit counts only; move selection is by visits,
/// so the Q/P tables of the private trees have nothing left to contribute
/// once their visits are merged.
pub fn run_root_parallel_puct_search<R: Rng>(
    tree: PuctTree,
    iterations_per_worker: u32,
    workers: usize,
    c: f32,
    rng: &mut R,
) -> PuctTree {
    if tree.get(tree.root()).is_terminal() {
        return tree;
    }

    let root_state = tree.get(tree.root()).state;
    let master_seed: u64 = rng.gen();
    let worker_seed_base: u64 = rng.gen();

    let mut tree = tree;
    let (mut tree, worker_visits) = rayon::join(
        move || {
            let mut master_rng = ChaCha8Rng::seed_from_u64(master_seed);
            run_puct_search(&mut tree, iterations_per_worker, c, &mut master_rng);
            tree
        },
        || {
            (0..workers)
                .into_par_iter()
                .map(|index| {
                    let seed = worker_seed_base.wrapping_add(index as u64);
                    let mut worker_rng = ChaCha8Rng::seed_from_u64(seed);
                    let mut worker_tree = PuctTree::new(root_state);
                    run_puct_search(&mut worker_tree, iterations_per_worker, c, &mut worker_rng);
                    worker_tree.root_move_visits()
                })
                .collect::<Vec<_>>()
        },
    );

    for visits in &worker_visits {
        for &(mv, n) in visits {
            if let Some(child_id) = puct_child_by_move(&tree, mv) {
                tree.get_mut(child_id).visits += n;
            }
        }
    }

    debug!(
        workers,
        iterations_per_worker,
        best = ?tree.best_move(),
        "root-parallel puct search merged"
    );

    tree
}

fn puct_child_by_move(tree: &PuctTree, mv: Square) -> Option<crate::tree::NodeId> {
    tree.get(tree.root())
        .children
        .iter()
        .find(|(m, _)| *m == mv)
        .map(|(_, id)| *id)
}

// ============================================================================
// TESTS
// ============================================================================
