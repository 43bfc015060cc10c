//! Bit-packed NoGo board with incremental group and liberty tracking.
//!
//! Groups are kept in a union-find forest over the cell array. Each group
//! root owns a liberty bitset and its population count, updated on every
//! placement. NoGo has no captures, so a stone never leaves the board and
//! groups only ever merge.
//!
//! Two per-color caches make legality checks cheap:
//! - `illegal[c]`: cells known to be illegal for `c` (occupied cells,
//!   capturing moves, known suicides). Legality in NoGo only shrinks, so a
//!   cell never leaves this set.
//! - `risky[c]`: cells whose status for `c` changed since they were last
//!   checked and need a walk over their neighbors.
//!
//! Any empty cell in neither set is legal for that color.

use std::fmt;
use std::sync::OnceLock;

use thiserror::Error;

use crate::bitset::BitSet;
use crate::constants::{N, NUM_CELLS};

/// A cell index in `0..NUM_CELLS`, row-major.
pub type Cell = usize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    White,
}

impl Color {
    #[inline]
    pub fn other(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

/// Why a placement was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IllegalMove {
    #[error("illegal move: cell is occupied")]
    Occupied,
    #[error("illegal move: suicide")]
    Suicide,
    #[error("illegal move: would capture")]
    Capture,
}

/// Legal moves bucketed by which color may play them.
#[derive(Debug, Clone, Default)]
pub struct MoveBuckets {
    /// Legal for both colors.
    pub two_way: Vec<Cell>,
    /// Legal for Black only.
    pub black_only: Vec<Cell>,
    /// Legal for White only.
    pub white_only: Vec<Cell>,
}

impl MoveBuckets {
    /// The one-way bucket belonging to `color`.
    pub fn one_way(&mut self, color: Color) -> &mut Vec<Cell> {
        match color {
            Color::Black => &mut self.black_only,
            Color::White => &mut self.white_only,
        }
    }

    /// Number of cells `color` may currently play.
    pub fn available(&self, color: Color) -> usize {
        self.two_way.len()
            + match color {
                Color::Black => self.black_only.len(),
                Color::White => self.white_only.len(),
            }
    }
}

struct Adjacency {
    cells: [Cell; 4],
    len: usize,
}

static NEIGHBORS: OnceLock<Vec<Adjacency>> = OnceLock::new();

/// Orthogonal neighbors of `cell` (2 to 4 entries).
#[inline]
pub fn neighbors(cell: Cell) -> &'static [Cell] {
    let table = NEIGHBORS.get_or_init(|| {
        (0..NUM_CELLS)
            .map(|c| {
                let (row, col) = (c / N, c % N);
                let mut adj = Adjacency { cells: [0; 4], len: 0 };
                let mut push = |n: Cell| {
                    adj.cells[adj.len] = n;
                    adj.len += 1;
                };
                if row > 0 {
                    push(c - N);
                }
                if col > 0 {
                    push(c - 1);
                }
                if row + 1 < N {
                    push(c + N);
                }
                if col + 1 < N {
                    push(c + 1);
                }
                adj
            })
            .collect()
    });
    let adj = &table[cell];
    &adj.cells[..adj.len]
}

/// NoGo board state.
///
/// Cheap to clone: every field is a fixed-size array, there is no heap data.
#[derive(Clone, PartialEq, Eq)]
pub struct Board {
    stones: [BitSet; 2],
    parent: [u16; NUM_CELLS],
    liberties: [BitSet; NUM_CELLS],
    liberty_count: [u8; NUM_CELLS],
    illegal: [BitSet; 2],
    risky: [BitSet; 2],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// An empty board.
    pub fn new() -> Self {
        Self {
            stones: [BitSet::new(); 2],
            parent: std::array::from_fn(|i| i as u16),
            liberties: [BitSet::new(); NUM_CELLS],
            liberty_count: [0; NUM_CELLS],
            illegal: [BitSet::new(); 2],
            risky: [BitSet::new(); 2],
        }
    }

    /// Color of the stone at `cell`, if any.
    #[inline]
    pub fn color_at(&self, cell: Cell) -> Option<Color> {
        if self.stones[0].get(cell) {
            Some(Color::Black)
        } else if self.stones[1].get(cell) {
            Some(Color::White)
        } else {
            None
        }
    }

    #[inline]
    pub fn is_occupied(&self, cell: Cell) -> bool {
        self.stones[0].get(cell) || self.stones[1].get(cell)
    }

    pub fn stones(&self, color: Color) -> &BitSet {
        &self.stones[color.index()]
    }

    pub fn stone_count(&self, color: Color) -> u32 {
        self.stones[color.index()].count()
    }

    pub fn is_empty(&self) -> bool {
        self.stones[0].is_empty() && self.stones[1].is_empty()
    }

    /// Color to move, assuming strict alternation from an empty board with
    /// Black first.
    pub fn side_to_move(&self) -> Color {
        if self.stone_count(Color::Black) == self.stone_count(Color::White) {
            Color::Black
        } else {
            Color::White
        }
    }

    // -------------------------------------------------------------------------
    // Union-find
    // -------------------------------------------------------------------------

    /// Group root of `cell`, compressing the path on the way.
    pub fn find(&mut self, cell: Cell) -> Cell {
        let mut c = cell;
        while self.parent[c] as usize != c {
            let grandparent = self.parent[self.parent[c] as usize];
            self.parent[c] = grandparent;
            c = grandparent as usize;
        }
        c
    }

    /// Group root of `cell` without touching the forest.
    pub fn root_of(&self, cell: Cell) -> Cell {
        let mut c = cell;
        while self.parent[c] as usize != c {
            c = self.parent[c] as usize;
        }
        c
    }

    fn unite(&mut self, a: Cell, b: Cell) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra < rb {
            self.parent[rb] = ra as u16;
        } else {
            self.parent[ra] = rb as u16;
        }
    }

    /// Liberty count of the group containing the stone at `cell`.
    pub fn liberty_count(&self, cell: Cell) -> u32 {
        debug_assert!(self.is_occupied(cell));
        self.liberty_count[self.root_of(cell)] as u32
    }

    /// Liberties of the group containing the stone at `cell`.
    pub fn liberties(&self, cell: Cell) -> BitSet {
        debug_assert!(self.is_occupied(cell));
        self.liberties[self.root_of(cell)]
    }

    // -------------------------------------------------------------------------
    // Legality
    // -------------------------------------------------------------------------

    /// Whether `color` may play at `cell`, caching the verdict.
    ///
    /// Repeated calls without an intervening placement return the same
    /// answer. Only the cache bits change.
    pub fn can_move(&mut self, cell: Cell, color: Color) -> bool {
        debug_assert!(cell < NUM_CELLS);
        let c = color.index();
        if self.illegal[c].get(cell) {
            return false;
        }
        if !self.risky[c].get(cell) {
            return true;
        }
        self.risky[c].clear(cell);
        if self.breathes(cell, color) {
            return true;
        }
        self.illegal[c].set(cell);
        false
    }

    /// Same verdict as [`Board::can_move`], without updating the caches.
    pub fn is_legal(&self, cell: Cell, color: Color) -> bool {
        let c = color.index();
        if self.illegal[c].get(cell) {
            return false;
        }
        !self.risky[c].get(cell) || self.breathes(cell, color)
    }

    /// A stone of `color` at `cell` would keep at least one liberty.
    fn breathes(&self, cell: Cell, color: Color) -> bool {
        let own = &self.stones[color.index()];
        let opp = &self.stones[color.other().index()];
        neighbors(cell).iter().any(|&n| {
            if own.get(n) {
                self.liberty_count[self.root_of(n)] != 1
            } else {
                !opp.get(n)
            }
        })
    }

    /// Playing `color` at `cell` would take the last liberty of an
    /// adjacent opposing group.
    fn would_capture(&self, cell: Cell, color: Color) -> bool {
        let opp = &self.stones[color.other().index()];
        neighbors(cell)
            .iter()
            .any(|&n| opp.get(n) && self.liberty_count[self.root_of(n)] == 1)
    }

    // -------------------------------------------------------------------------
    // Placement
    // -------------------------------------------------------------------------

    /// Place a stone, or leave the board untouched if the move is illegal.
    pub fn place(&mut self, cell: Cell, color: Color) -> Result<(), IllegalMove> {
        assert!(cell < NUM_CELLS, "cell {cell} out of range");
        if self.is_occupied(cell) {
            return Err(IllegalMove::Occupied);
        }
        if !self.is_legal(cell, color) {
            return Err(if self.would_capture(cell, color) {
                IllegalMove::Capture
            } else {
                IllegalMove::Suicide
            });
        }
        self.commit(cell, color);
        Ok(())
    }

    /// Place a stone already known to be legal and update groups, liberties
    /// and caches.
    pub(crate) fn commit(&mut self, cell: Cell, color: Color) {
        debug_assert!(self.is_legal(cell, color), "commit of illegal move");
        let me = color.index();
        let them = color.other().index();

        self.illegal[0].set(cell);
        self.illegal[1].set(cell);
        self.stones[me].set(cell);

        let mut libs = BitSet::new();
        for &n in neighbors(cell) {
            if self.stones[me].get(n) {
                let root = self.find(n);
                libs.union_with(&self.liberties[root]);
                self.liberties[root].clear_all();
                self.liberty_count[root] = 0;
                self.unite(cell, root);
            } else if self.stones[them].get(n) {
                let root = self.find(n);
                self.liberties[root].clear(cell);
                self.liberty_count[root] = self.liberties[root].count() as u8;
                if self.liberty_count[root] == 1 {
                    // Their last liberty: a capture for us, critical for them
                    let last = self.liberties[root];
                    self.illegal[me].union_with(&last);
                    self.risky[them].union_with(&last);
                }
            } else {
                self.risky[them].set(n);
                libs.set(n);
            }
        }

        libs.clear(cell);
        let root = self.find(cell);
        self.liberty_count[root] = libs.count() as u8;
        self.liberties[root] = libs;
        if self.liberty_count[root] == 1 {
            self.illegal[them].union_with(&libs);
            self.risky[me].union_with(&libs);
        }
    }

    // -------------------------------------------------------------------------
    // Move generation
    // -------------------------------------------------------------------------

    /// Bucket every empty cell by which colors may legally play it.
    pub fn classify_moves(&mut self) -> MoveBuckets {
        let mut buckets = MoveBuckets::default();
        self.classify_into(&mut buckets);
        buckets
    }

    /// [`Board::classify_moves`] into caller-owned buffers.
    pub fn classify_into(&mut self, buckets: &mut MoveBuckets) {
        buckets.two_way.clear();
        buckets.black_only.clear();
        buckets.white_only.clear();
        for cell in 0..NUM_CELLS {
            if self.is_occupied(cell) {
                continue;
            }
            let black = self.can_move(cell, Color::Black);
            let white = self.can_move(cell, Color::White);
            match (black, white) {
                (true, true) => buckets.two_way.push(cell),
                (true, false) => buckets.black_only.push(cell),
                (false, true) => buckets.white_only.push(cell),
                (false, false) => {}
            }
        }
    }

    /// All cells `color` may legally play, in ascending order.
    pub fn legal_moves(&mut self, color: Color) -> Vec<Cell> {
        (0..NUM_CELLS)
            .filter(|&cell| self.can_move(cell, color))
            .collect()
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board(\n{self})")
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..N {
            for col in 0..N {
                let ch = match self.color_at(row * N + col) {
                    Some(Color::Black) => 'X',
                    Some(Color::White) => 'O',
                    None => '.',
                };
                write!(f, "{ch} ")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbors_corners_and_edges() {
        assert_eq!(neighbors(0), &[N, 1]);
        assert_eq!(neighbors(N - 1).len(), 2);
        assert_eq!(neighbors(1).len(), 3);
        assert_eq!(neighbors(N + 1).len(), 4);
        assert_eq!(neighbors(NUM_CELLS - 1), &[NUM_CELLS - 1 - N, NUM_CELLS - 2]);
    }

    #[test]
    fn test_single_stone() {
        let mut board = Board::new();
        let center = (N / 2) * N + N / 2;
        board.place(center, Color::Black).unwrap();
        assert_eq!(board.color_at(center), Some(Color::Black));
        assert_eq!(board.liberty_count(center), 4);
        assert_eq!(board.side_to_move(), Color::White);
    }

    #[test]
    fn test_corner_stone_has_two_liberties() {
        let mut board = Board::new();
        board.place(0, Color::White).unwrap();
        assert_eq!(board.liberty_count(0), 2);
        let libs: Vec<_> = board.liberties(0).iter().collect();
        assert_eq!(libs, vec![1, N]);
    }

    #[test]
    fn test_occupied_rejected() {
        let mut board = Board::new();
        board.place(5, Color::Black).unwrap();
        assert_eq!(board.place(5, Color::White), Err(IllegalMove::Occupied));
        assert_eq!(board.place(5, Color::Black), Err(IllegalMove::Occupied));
    }

    #[test]
    fn test_suicide_in_corner() {
        // White at 1 and N leaves the corner without liberties for Black
        let mut board = Board::new();
        board.place(1, Color::White).unwrap();
        board.place(N, Color::White).unwrap();

        let before = board.clone();
        assert_eq!(board.place(0, Color::Black), Err(IllegalMove::Suicide));
        assert_eq!(board, before);
        assert!(!board.can_move(0, Color::Black));
        // White may still fill its own eye: the groups keep other liberties
        assert!(board.can_move(0, Color::White));
    }

    #[test]
    fn test_capture_rejected() {
        // Black at 0, White at 1: Black's only liberty is N
        let mut board = Board::new();
        board.place(0, Color::Black).unwrap();
        board.place(1, Color::White).unwrap();
        assert_eq!(board.liberty_count(0), 1);

        let before = board.clone();
        assert_eq!(board.place(N, Color::White), Err(IllegalMove::Capture));
        assert_eq!(board, before);
        // Black extending out of atari is fine
        assert!(board.can_move(N, Color::Black));
    }

    #[test]
    fn test_extending_out_of_atari() {
        // Black 0 + N against White 1 and N + 1: the group's only liberty is
        // 2 * N, which Black may still extend into.
        let mut board = Board::new();
        board.place(0, Color::Black).unwrap();
        board.place(1, Color::White).unwrap();
        board.place(N + 1, Color::White).unwrap();
        board.place(N, Color::Black).unwrap();
        assert_eq!(board.liberty_count(0), 1);
        assert_eq!(board.find(0), board.find(N));

        assert!(board.can_move(2 * N, Color::Black));
        assert!(!board.can_move(2 * N, Color::White));
        assert_eq!(board.place(2 * N, Color::White), Err(IllegalMove::Capture));
    }

    #[test]
    fn test_filling_own_last_liberty_is_suicide() {
        // Black 1 and N share their only liberty, the corner
        let mut board = Board::new();
        board.place(1, Color::Black).unwrap();
        board.place(N, Color::Black).unwrap();
        board.place(2, Color::White).unwrap();
        board.place(N + 1, Color::White).unwrap();
        board.place(2 * N, Color::White).unwrap();
        assert_eq!(board.liberty_count(1), 1);
        assert_eq!(board.liberty_count(N), 1);

        assert!(!board.can_move(0, Color::Black));
        assert_eq!(board.place(0, Color::Black), Err(IllegalMove::Suicide));
        assert_eq!(board.place(0, Color::White), Err(IllegalMove::Capture));
    }

    #[test]
    fn test_classify_moves_empty_board() {
        let mut board = Board::new();
        let buckets = board.classify_moves();
        assert_eq!(buckets.two_way.len(), NUM_CELLS);
        assert!(buckets.black_only.is_empty());
        assert!(buckets.white_only.is_empty());
    }

    #[test]
    fn test_classify_moves_one_way() {
        let mut board = Board::new();
        board.place(1, Color::White).unwrap();
        board.place(N, Color::White).unwrap();
        let buckets = board.classify_moves();
        assert!(buckets.white_only.contains(&0));
        assert!(!buckets.two_way.contains(&0));
        assert_eq!(buckets.available(Color::White), NUM_CELLS - 2);
        assert_eq!(buckets.available(Color::Black), NUM_CELLS - 3);
    }

    #[test]
    fn test_display() {
        let mut board = Board::new();
        board.place(0, Color::Black).unwrap();
        board.place(NUM_CELLS - 1, Color::White).unwrap();
        let s = board.to_string();
        assert!(s.starts_with("X . "));
        assert!(s.trim_end().ends_with('O'));
        assert_eq!(s.lines().count(), N);
    }
}
