//! Monte Carlo playouts (random game simulation).
//!
//! A playout finishes the game with uniformly random legal moves until the
//! side to move has none left; that side loses. There is no scoring and no
//! move cap: every move fills a cell, so a game lasts at most `NUM_CELLS`
//! moves.
//!
//! Legal moves are bucketed once per playout ([`Board::classify_into`]) and
//! then drawn with swap-remove, re-checking legality only for the drawn cell.

use fastrand::Rng;

use crate::board::{Board, Cell, Color, MoveBuckets};
use crate::constants::NUM_CELLS;

/// Cells played during one simulation, split by the color that played them.
///
/// Feeds RAVE: a node credits its children whose move appears in the list
/// of the color to move at that node.
#[derive(Debug, Clone)]
pub struct PlayedMoves {
    black: Vec<Cell>,
    white: Vec<Cell>,
}

impl Default for PlayedMoves {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayedMoves {
    pub fn new() -> Self {
        Self {
            black: Vec::with_capacity(NUM_CELLS),
            white: Vec::with_capacity(NUM_CELLS),
        }
    }

    pub fn clear(&mut self) {
        self.black.clear();
        self.white.clear();
    }

    #[inline]
    pub fn push(&mut self, cell: Cell, color: Color) {
        match color {
            Color::Black => self.black.push(cell),
            Color::White => self.white.push(cell),
        }
    }

    /// Cells played by `color`, in play order.
    pub fn by(&self, color: Color) -> &[Cell] {
        match color {
            Color::Black => &self.black,
            Color::White => &self.white,
        }
    }

    pub fn len(&self) -> usize {
        self.black.len() + self.white.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of a finished game from Black's point of view.
#[inline]
pub fn outcome_for_loser(loser: Color) -> f64 {
    match loser {
        Color::Black => -1.0,
        Color::White => 1.0,
    }
}

/// Draw a uniformly random cell out of `bucket`, removing it.
#[inline]
fn draw(bucket: &mut Vec<Cell>, rng: &mut Rng) -> Option<Cell> {
    if bucket.is_empty() {
        return None;
    }
    let i = rng.usize(..bucket.len());
    Some(bucket.swap_remove(i))
}

impl Board {
    /// Play random legal moves until `to_move` runs out of them.
    ///
    /// Returns `+1.0` if Black wins and `-1.0` if White wins. Every cell
    /// played is appended to `played`.
    pub fn simulate(&mut self, to_move: Color, rng: &mut Rng, played: &mut PlayedMoves) -> f64 {
        let mut buckets = MoveBuckets::default();
        self.classify_into(&mut buckets);
        self.simulate_from(&mut buckets, to_move, rng, played)
    }

    /// [`Board::simulate`] with buckets already filled by
    /// [`Board::classify_into`] for the current position.
    pub fn simulate_from(
        &mut self,
        buckets: &mut MoveBuckets,
        to_move: Color,
        rng: &mut Rng,
        played: &mut PlayedMoves,
    ) -> f64 {
        let mut color = to_move;

        // Contested cells first. A drawn cell the mover can't use may still
        // belong to the opponent, so it moves to their one-way bucket.
        while let Some(cell) = draw(&mut buckets.two_way, rng) {
            if self.can_move(cell, color) {
                self.commit(cell, color);
                played.push(cell, color);
                color = color.other();
                continue;
            }
            if self.can_move(cell, color.other()) {
                buckets.one_way(color.other()).push(cell);
            }
        }

        // Each side now plays only from its own bucket. Cells can turn
        // illegal but never legal again, so a stale entry is just dropped.
        loop {
            let bucket = buckets.one_way(color);
            let Some(cell) = draw(bucket, rng) else {
                return outcome_for_loser(color);
            };
            if self.can_move(cell, color) {
                self.commit(cell, color);
                played.push(cell, color);
                color = color.other();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::N;

    #[test]
    fn test_playout_fills_until_stuck() {
        let mut rng = Rng::with_seed(7);
        let mut board = Board::new();
        let mut played = PlayedMoves::new();

        let outcome = board.simulate(Color::Black, &mut rng, &mut played);
        assert!(outcome == 1.0 || outcome == -1.0);
        assert!(!played.is_empty());
        assert!(played.len() <= NUM_CELLS);

        // The loser is the side to move at the end, and really has no move
        let loser = if outcome > 0.0 { Color::White } else { Color::Black };
        assert!(board.legal_moves(loser).is_empty());

        // Colors alternate starting with Black
        let b = played.by(Color::Black).len();
        let w = played.by(Color::White).len();
        assert!(b == w || b == w + 1);
        assert_eq!(board.stone_count(Color::Black) as usize, b);
        assert_eq!(board.stone_count(Color::White) as usize, w);
    }

    #[test]
    fn test_playout_is_deterministic_for_seed() {
        let run = |seed| {
            let mut rng = Rng::with_seed(seed);
            let mut board = Board::new();
            let mut played = PlayedMoves::new();
            let outcome = board.simulate(Color::White, &mut rng, &mut played);
            (outcome, played.by(Color::Black).to_vec(), played.by(Color::White).to_vec())
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn test_side_without_moves_loses_immediately() {
        // One White group covering everything but the corner: playing there
        // is a capture for Black
        let mut board = Board::new();
        for cell in 1..NUM_CELLS {
            board.place(cell, Color::White).unwrap();
        }
        assert!(board.legal_moves(Color::Black).is_empty());

        let mut rng = Rng::with_seed(1);
        let mut played = PlayedMoves::new();
        let outcome = board.simulate(Color::Black, &mut rng, &mut played);
        assert_eq!(outcome, -1.0);
        assert!(played.is_empty());
        assert_eq!(board.stone_count(Color::Black), 0);
        assert_eq!(board.liberty_count(N), 1);
    }
}
