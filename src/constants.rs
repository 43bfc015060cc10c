//! Constants for board dimensions and search parameters.
//!
//! Cells are indexed row-major from zero, so the board is a plain
//! `N * N` array with no padding. Neighbor lists are precomputed once
//! (see [`crate::board::neighbors`]).
//!
//! # Board Size Configuration
//!
//! The board size is controlled by Cargo features:
//! - `board9x9` (default): 9x9 board
//! - `board13x13`: 13x13 board
//!
//! ```sh
//! cargo build                                               # 9x9 (default)
//! cargo build --no-default-features --features board13x13  # 13x13
//! ```

// =============================================================================
// Board Geometry
// =============================================================================

/// Board side length.
#[cfg(feature = "board9x9")]
pub const N: usize = 9;

#[cfg(feature = "board13x13")]
pub const N: usize = 13;

#[cfg(all(feature = "board9x9", feature = "board13x13"))]
compile_error!("Cannot enable both 'board9x9' and 'board13x13' features at the same time");

#[cfg(not(any(feature = "board9x9", feature = "board13x13")))]
compile_error!("Must enable exactly one board size feature: 'board9x9' or 'board13x13'");

/// Number of cells on the board.
pub const NUM_CELLS: usize = N * N;

/// Number of 64-bit words needed to hold one bit per cell.
pub const WORDS: usize = NUM_CELLS.div_ceil(64);

// =============================================================================
// MCTS Parameters
// =============================================================================

/// Default number of simulations per move.
pub const N_SIMS: usize = 20_000;

/// Weight of the UCT exploration term in the selection score.
pub const C_BIAS: f64 = 0.25;

/// Scores closer than this are treated as tied during selection.
pub const TIE_EPS: f64 = 1e-4;

/// Visits a leaf needs before it is expanded (a leaf is always simulated
/// at least once first).
pub const EXPAND_VISITS: u32 = 0;

/// Default seed for the search RNG.
pub const DEFAULT_SEED: u64 = 0x5eed_1e55_c0ff_ee00;

// =============================================================================
// Node Initialization
// =============================================================================

/// Starting value estimate for a fresh node.
pub const INIT_MEAN: f64 = 0.5;

/// Starting RAVE estimate for a fresh node.
pub const INIT_RAVE_MEAN: f64 = 0.5;

/// Virtual RAVE samples a fresh node starts with. Keeps the selection score
/// finite before the node has any visits of its own.
pub const INIT_RAVE_COUNT: u32 = 20;
