//! Monte Carlo Tree Search (MCTS) driver with RAVE.
//!
//! Each simulation:
//! 1. copies the root board,
//! 2. descends the tree by selection score, replaying moves on the copy,
//! 3. expands the leaf once it has enough visits and steps into one child,
//! 4. finishes the game with a random playout,
//! 5. folds the result back into every node on the path, and gives RAVE
//!    credit to children whose move was played later in the same
//!    simulation by the color to move at that node.
//!
//! The final move is the most visited root child.

use std::time::{Duration, Instant};

use fastrand::Rng;
use log::{debug, info, trace};

use crate::board::{Board, Cell, Color, IllegalMove, MoveBuckets};
use crate::constants::{C_BIAS, DEFAULT_SEED, EXPAND_VISITS, N_SIMS};
use crate::node::{ROOT, Tree};
use crate::playout::PlayedMoves;

/// Search parameters.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Weight of the exploration term.
    pub c_bias: f64,
    /// Visits a leaf needs before expansion.
    pub expand_visits: u32,
    /// Simulations per [`Mcts::search`].
    pub simulations: usize,
    /// Seed of the search RNG.
    pub seed: u64,
    /// Optional wall-clock cap per [`Mcts::search`].
    pub time_limit: Option<Duration>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            c_bias: C_BIAS,
            expand_visits: EXPAND_VISITS,
            simulations: N_SIMS,
            seed: DEFAULT_SEED,
            time_limit: None,
        }
    }
}

impl SearchConfig {
    pub fn with_simulations(mut self, simulations: usize) -> Self {
        self.simulations = simulations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_c_bias(mut self, c_bias: f64) -> Self {
        self.c_bias = c_bias;
        self
    }

    pub fn with_expand_visits(mut self, expand_visits: u32) -> Self {
        self.expand_visits = expand_visits;
        self
    }

    pub fn with_time_limit(mut self, limit: Option<Duration>) -> Self {
        self.time_limit = limit;
        self
    }
}

/// Statistics of one root child.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildStats {
    pub cell: Cell,
    pub visits: u32,
    pub mean: f64,
    pub rave_count: u32,
    pub rave_mean: f64,
}

/// Search state: the root position, the tree above it and the RNG.
pub struct Mcts {
    config: SearchConfig,
    rng: Rng,
    tree: Tree,
    root_board: Board,
    to_move: Color,
    // Scratch reused across simulations
    path: Vec<usize>,
    played: PlayedMoves,
    buckets: MoveBuckets,
}

impl Default for Mcts {
    fn default() -> Self {
        Self::new(SearchConfig::default())
    }
}

impl Mcts {
    /// A search rooted at the empty board with Black to move.
    pub fn new(config: SearchConfig) -> Self {
        let rng = Rng::with_seed(config.seed);
        let mut mcts = Self {
            config,
            rng,
            tree: Tree::new(Color::Black),
            root_board: Board::new(),
            to_move: Color::Black,
            path: Vec::new(),
            played: PlayedMoves::new(),
            buckets: MoveBuckets::default(),
        };
        mcts.set_root(&Board::new(), Color::Black);
        mcts
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Position at the root.
    pub fn board(&self) -> &Board {
        &self.root_board
    }

    /// Color to move at the root.
    pub fn to_move(&self) -> Color {
        self.to_move
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Drop the current tree and search from `board` with `to_move` to play.
    pub fn set_root(&mut self, board: &Board, to_move: Color) {
        self.root_board = board.clone();
        self.to_move = to_move;
        self.tree = Tree::new(to_move);
        let children = self.tree.expand(ROOT, &mut self.root_board);
        debug!("new root: {to_move:?} to move, {children} legal moves");
    }

    /// Run one selection, expansion, simulation and backpropagation cycle.
    pub fn run_once(&mut self) {
        let c_bias = self.config.c_bias;
        let mut board = self.root_board.clone();
        self.path.clear();
        self.played.clear();

        // Selection
        let mut node = ROOT;
        self.path.push(ROOT);
        while let Some(child) = self.tree.select_child(node, c_bias, &mut self.rng) {
            self.step(&mut board, child);
            node = child;
        }

        // Expansion
        let leaf = self.tree.node(node);
        if !leaf.is_expanded()
            && leaf.visits >= self.config.expand_visits.max(1)
            && self.tree.expand(node, &mut board) > 0
        {
            if let Some(child) = self.tree.select_child(node, c_bias, &mut self.rng) {
                self.step(&mut board, child);
                node = child;
            }
        }

        // Simulation
        let to_move = self.tree.node(node).color.other();
        board.classify_into(&mut self.buckets);
        let outcome = board.simulate_from(&mut self.buckets, to_move, &mut self.rng, &mut self.played);

        self.backpropagate(outcome);
    }

    /// Replay the move of `child` on `board` and extend the path.
    fn step(&mut self, board: &mut Board, child: usize) {
        let node = self.tree.node(child);
        if let Some(cell) = node.cell {
            board.commit(cell, node.color);
            self.played.push(cell, node.color);
        }
        self.path.push(child);
    }

    fn backpropagate(&mut self, outcome: f64) {
        for &idx in &self.path {
            self.tree.node_mut(idx).update(outcome);

            let rave_color = self.tree.node(idx).color.other();
            for &cell in self.played.by(rave_color) {
                if let Some(child) = self.tree.node(idx).child_for(cell) {
                    self.tree.node_mut(child).update_rave(outcome);
                }
            }
        }
    }

    /// Run `n` simulations.
    pub fn run(&mut self, n: usize) -> usize {
        self.run_budget(n, None)
    }

    /// Run simulations until `deadline`. Returns how many completed.
    pub fn run_until(&mut self, deadline: Instant) -> usize {
        self.run_budget(usize::MAX, Some(deadline))
    }

    fn run_budget(&mut self, max: usize, deadline: Option<Instant>) -> usize {
        let mut done = 0;
        while done < max {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }
            self.run_once();
            done += 1;
        }
        done
    }

    /// Search with the configured budget and return the chosen move.
    ///
    /// `None` means the side to move has no legal move and has lost.
    pub fn search(&mut self) -> Option<Cell> {
        let start = Instant::now();
        let deadline = self.config.time_limit.map(|limit| start + limit);
        let sims = self.run_budget(self.config.simulations, deadline);
        self.dump_children();

        let best = self.best_move();
        info!(
            "{:?}: best {:?} after {sims} sims in {:.2?} (winrate {:.3}, tree {} nodes)",
            self.to_move,
            best,
            start.elapsed(),
            self.winrate(),
            self.tree.len()
        );
        best
    }

    /// Most visited root child, or `None` if the root has no legal move.
    pub fn best_move(&self) -> Option<Cell> {
        self.tree
            .most_visited_child()
            .and_then(|c| self.tree.node(c).cell)
    }

    /// Win rate estimate for the side to move: the mean of the best child,
    /// or 0 when there is no move.
    pub fn winrate(&self) -> f64 {
        self.tree
            .most_visited_child()
            .map(|c| self.tree.node(c).mean)
            .unwrap_or(0.0)
    }

    /// Play `cell` for `color` on the root position and keep the matching
    /// subtree if the tree has one.
    pub fn advance(&mut self, cell: Cell, color: Color) -> Result<(), IllegalMove> {
        self.root_board.place(cell, color)?;

        let kept = self
            .tree
            .root()
            .child_for(cell)
            .filter(|&c| self.tree.node(c).color == color);
        match kept {
            Some(child) => {
                self.tree.promote(child);
                debug!("reused subtree for {cell}: {} nodes", self.tree.len());
            }
            None => self.tree = Tree::new(color.other()),
        }

        self.to_move = color.other();
        if !self.tree.root().is_expanded() {
            self.tree.expand(ROOT, &mut self.root_board);
        }
        Ok(())
    }

    /// Root children sorted by visits, most visited first.
    pub fn root_stats(&self) -> Vec<ChildStats> {
        let mut stats: Vec<ChildStats> = self
            .tree
            .root()
            .children()
            .filter_map(|c| {
                let node = self.tree.node(c);
                node.cell.map(|cell| ChildStats {
                    cell,
                    visits: node.visits,
                    mean: node.mean,
                    rave_count: node.rave_count,
                    rave_mean: node.rave_mean,
                })
            })
            .collect();
        stats.sort_by(|a, b| b.visits.cmp(&a.visits));
        stats
    }

    fn dump_children(&self) {
        if !log::log_enabled!(log::Level::Trace) {
            return;
        }
        for s in self.root_stats().iter().take(10) {
            trace!(
                "move {} v={} mean={:.3} rave={}/{:.3}",
                s.cell, s.visits, s.mean, s.rave_count, s.rave_mean
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{INIT_RAVE_COUNT, NUM_CELLS};

    fn small_config() -> SearchConfig {
        SearchConfig::default().with_simulations(200).with_seed(11)
    }

    #[test]
    fn test_new_root_is_expanded() {
        let mcts = Mcts::new(small_config());
        assert_eq!(mcts.tree().root().num_children(), NUM_CELLS);
        assert_eq!(mcts.to_move(), Color::Black);
    }

    #[test]
    fn test_root_visits_match_simulations() {
        let mut mcts = Mcts::new(small_config());
        assert_eq!(mcts.run(50), 50);
        assert_eq!(mcts.tree().root().visits, 50);
        let child_visits: u32 = mcts.root_stats().iter().map(|s| s.visits).sum();
        assert_eq!(child_visits, 50);
    }

    #[test]
    fn test_rave_credits_unvisited_siblings() {
        let mut mcts = Mcts::new(small_config());
        mcts.run(1);
        // One simulation visits a single root child, but the playout touched
        // many more cells for Black
        let credited = mcts
            .root_stats()
            .iter()
            .filter(|s| s.rave_count > INIT_RAVE_COUNT)
            .count();
        assert!(credited > 1);
    }

    #[test]
    fn test_rave_credits_only_moves_of_root_mover() {
        let mut mcts = Mcts::new(small_config());
        mcts.run_once();

        let black = mcts.played.by(Color::Black);
        assert!(!black.is_empty());
        for s in mcts.root_stats() {
            assert_eq!(
                s.rave_count > INIT_RAVE_COUNT,
                black.contains(&s.cell),
                "cell {}",
                s.cell
            );
        }
    }

    #[test]
    fn test_rave_credits_white_moves_one_ply_down() {
        let mut mcts = Mcts::new(small_config());
        let mut checked = 0;

        for _ in 0..200 {
            let before: Vec<u32> = (0..mcts.tree.len())
                .map(|i| mcts.tree.node(i).rave_count)
                .collect();
            mcts.run_once();

            // path[1] is a Black move, so its children are White moves
            let black_node = mcts.path[1];
            assert_eq!(mcts.tree.node(black_node).color, Color::Black);
            if mcts.tree.node(black_node).num_children() == 0 {
                continue;
            }
            let white = mcts.played.by(Color::White);
            for c in mcts.tree.node(black_node).children() {
                let node = mcts.tree.node(c);
                let old = before.get(c).copied().unwrap_or(INIT_RAVE_COUNT);
                let cell = node.cell.unwrap();
                assert_eq!(node.rave_count > old, white.contains(&cell), "cell {cell}");
            }
            checked += 1;
        }
        assert!(checked > 0);
    }

    #[test]
    fn test_search_returns_legal_move() {
        let mut mcts = Mcts::new(small_config());
        let cell = mcts.search().unwrap();
        assert!(mcts.board().clone().can_move(cell, Color::Black));
        assert!((0.0..=1.0).contains(&mcts.winrate()));
    }

    #[test]
    fn test_same_seed_same_result() {
        let mut a = Mcts::new(small_config());
        let mut b = Mcts::new(small_config());
        assert_eq!(a.search(), b.search());
        assert_eq!(a.root_stats(), b.root_stats());
    }

    #[test]
    fn test_advance_reuses_subtree() {
        let mut mcts = Mcts::new(small_config());
        mcts.run(300);
        let best = mcts.best_move().unwrap();
        let visits = mcts.root_stats()[0].visits;

        mcts.advance(best, Color::Black).unwrap();
        assert_eq!(mcts.to_move(), Color::White);
        assert_eq!(mcts.tree().root().visits, visits);
        assert_eq!(mcts.board().color_at(best), Some(Color::Black));
        assert!(mcts.tree().root().is_expanded());
        assert_eq!(mcts.tree().root().child_for(best), None);
    }

    #[test]
    fn test_advance_rejects_illegal_move() {
        let mut mcts = Mcts::new(small_config());
        mcts.advance(0, Color::Black).unwrap();
        assert_eq!(mcts.advance(0, Color::White), Err(IllegalMove::Occupied));
        assert_eq!(mcts.to_move(), Color::White);
    }
}
