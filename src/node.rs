//! Search tree nodes stored in a flat arena.
//!
//! Nodes live in one `Vec` and refer to their children by index. The
//! children of a node are created together on expansion, so they always
//! occupy one contiguous range `first_child..first_child + num_children`.
//! A per-node `cell -> child` table routes RAVE credit in O(1).
//!
//! Nodes hold statistics only. The board for a node is rebuilt by replaying
//! moves from the root during descent.

use std::ops::Range;

use fastrand::Rng;

use crate::board::{Board, Cell, Color};
use crate::constants::{INIT_MEAN, INIT_RAVE_COUNT, INIT_RAVE_MEAN, NUM_CELLS, TIE_EPS};

/// Index of the root in the arena.
pub const ROOT: usize = 0;

const NO_CHILD: u16 = u16::MAX;

/// One vertex of the search tree.
#[derive(Debug, Clone)]
pub struct Node {
    /// Cell played to reach this node (`None` for the root).
    pub cell: Option<Cell>,
    /// Color that played `cell`. For the root, the color that moved last.
    pub color: Color,
    /// Number of backpropagated results.
    pub visits: u32,
    /// Mean result from `color`'s point of view.
    pub mean: f64,
    /// RAVE samples, starting from a virtual prior.
    pub rave_count: u32,
    /// Mean RAVE result from `color`'s point of view.
    pub rave_mean: f64,
    expanded: bool,
    first_child: u32,
    num_children: u32,
    child_slots: Vec<u16>,
}

impl Node {
    pub fn new(cell: Option<Cell>, color: Color) -> Self {
        Self {
            cell,
            color,
            visits: 0,
            mean: INIT_MEAN,
            rave_count: INIT_RAVE_COUNT,
            rave_mean: INIT_RAVE_MEAN,
            expanded: false,
            first_child: 0,
            num_children: 0,
            child_slots: Vec::new(),
        }
    }

    /// 1.0 if `outcome` (Black's view, ±1) is a win for this node's color.
    #[inline]
    pub fn value(&self, outcome: f64) -> f64 {
        let won = match self.color {
            Color::Black => outcome > 0.0,
            Color::White => outcome < 0.0,
        };
        if won { 1.0 } else { 0.0 }
    }

    pub fn update(&mut self, outcome: f64) {
        let value = self.value(outcome);
        self.mean = (self.mean * self.visits as f64 + value) / (self.visits as f64 + 1.0);
        self.visits += 1;
    }

    pub fn update_rave(&mut self, outcome: f64) {
        let value = self.value(outcome);
        self.rave_mean =
            (self.rave_mean * self.rave_count as f64 + value) / (self.rave_count as f64 + 1.0);
        self.rave_count += 1;
    }

    /// Has expansion been attempted? A terminal node is expanded with no
    /// children.
    #[inline]
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    #[inline]
    pub fn num_children(&self) -> usize {
        self.num_children as usize
    }

    #[inline]
    pub fn children(&self) -> Range<usize> {
        let first = self.first_child as usize;
        first..first + self.num_children as usize
    }

    /// Arena index of the child reached by playing `cell`.
    #[inline]
    pub fn child_for(&self, cell: Cell) -> Option<usize> {
        match self.child_slots.get(cell) {
            Some(&slot) if slot != NO_CHILD => Some(self.first_child as usize + slot as usize),
            _ => None,
        }
    }
}

/// Selection score blending the Monte Carlo mean, the RAVE estimate and a
/// UCT exploration bonus.
///
/// ```text
/// (rave_mean * rave_count + mean * visits + c * sqrt(ln(parent_visits) * visits))
///     / (visits + rave_count)
/// ```
pub fn score(parent_visits: u32, child: &Node, c_bias: f64) -> f64 {
    let n = child.visits as f64;
    let r = child.rave_count as f64;
    if n + r == 0.0 {
        return f64::INFINITY;
    }
    let ln_parent = (parent_visits.max(1) as f64).ln();
    (child.rave_mean * r + child.mean * n + c_bias * (ln_parent * n).sqrt()) / (n + r)
}

/// Arena holding the whole search tree. The root is always at [`ROOT`].
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// A tree holding only a root for a position where `to_move` plays next.
    pub fn new(to_move: Color) -> Self {
        Self {
            nodes: vec![Node::new(None, to_move.other())],
        }
    }

    #[inline]
    pub fn node(&self, idx: usize) -> &Node {
        &self.nodes[idx]
    }

    #[inline]
    pub fn node_mut(&mut self, idx: usize) -> &mut Node {
        &mut self.nodes[idx]
    }

    #[inline]
    pub fn root(&self) -> &Node {
        &self.nodes[ROOT]
    }

    /// Total node count.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Create one child per legal move of the color to move at `idx`.
    ///
    /// `board` must be the position at `idx`. Returns the number of
    /// children; zero marks the node terminal.
    pub fn expand(&mut self, idx: usize, board: &mut Board) -> usize {
        debug_assert!(!self.nodes[idx].expanded, "node expanded twice");
        let color = self.nodes[idx].color.other();
        let first = self.nodes.len();
        let mut slots = vec![NO_CHILD; NUM_CELLS];

        for cell in 0..NUM_CELLS {
            if board.can_move(cell, color) {
                slots[cell] = (self.nodes.len() - first) as u16;
                self.nodes.push(Node::new(Some(cell), color));
            }
        }

        let count = self.nodes.len() - first;
        let node = &mut self.nodes[idx];
        node.expanded = true;
        node.first_child = first as u32;
        node.num_children = count as u32;
        node.child_slots = if count > 0 { slots } else { Vec::new() };
        count
    }

    /// Best-scoring child of `idx`, ties broken uniformly at random.
    pub fn select_child(&self, idx: usize, c_bias: f64, rng: &mut Rng) -> Option<usize> {
        let parent = &self.nodes[idx];
        let children = parent.children();
        if children.is_empty() {
            return None;
        }

        // One pass: a clear winner restarts the tie set, near-ties join it
        // by reservoir sampling
        let mut best = f64::NEG_INFINITY;
        let mut chosen = children.start;
        let mut ties = 0;
        for c in children {
            let s = score(parent.visits, &self.nodes[c], c_bias);
            if s > best + TIE_EPS {
                best = s;
                chosen = c;
                ties = 1;
            } else if s == best || best - s <= TIE_EPS {
                ties += 1;
                if rng.usize(..ties) == 0 {
                    chosen = c;
                }
                best = best.max(s);
            }
        }
        Some(chosen)
    }

    /// Child of the root with the most visits. First one wins on equal
    /// counts.
    pub fn most_visited_child(&self) -> Option<usize> {
        self.root()
            .children()
            .fold(None, |best: Option<usize>, c| match best {
                Some(b) if self.nodes[b].visits >= self.nodes[c].visits => Some(b),
                _ => Some(c),
            })
    }

    /// Make `child` the new root, dropping everything outside its subtree.
    ///
    /// Walks the kept subtree breadth-first and moves each node into a fresh
    /// arena, so each child block stays contiguous and no recursion is
    /// needed.
    pub fn promote(&mut self, child: usize) {
        let mut old = std::mem::take(&mut self.nodes);
        let mut nodes = Vec::with_capacity(old.len());
        nodes.push(std::mem::replace(&mut old[child], Node::new(None, Color::Black)));

        let mut i = 0;
        while i < nodes.len() {
            let range = nodes[i].children();
            if !range.is_empty() {
                nodes[i].first_child = nodes.len() as u32;
                for c in range {
                    nodes.push(std::mem::replace(&mut old[c], Node::new(None, Color::Black)));
                }
            }
            i += 1;
        }

        nodes[ROOT].cell = None;
        self.nodes = nodes;
    }
}
