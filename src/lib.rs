//! NoGo-RAVE: a NoGo engine built on a bitboard with cached liberties and
//! an MCTS + RAVE search.
//!
//! NoGo is played on a Go board, but capturing is forbidden and so is
//! suicide. The first player without a legal move loses.
//!
//! ## Modules
//!
//! - [`constants`] - Board dimensions and search parameters
//! - [`bitset`] - Fixed-size cell sets
//! - [`board`] - Board state, union-find groups, legality caches
//! - [`playout`] - Random game simulation
//! - [`node`] - Search tree arena and the RAVE selection score
//! - [`mcts`] - Monte Carlo Tree Search driver
//! - [`gtp`] - Go Text Protocol front end
//!
//! ## Example
//!
//! ```
//! use nogo_rave::board::Color;
//! use nogo_rave::mcts::{Mcts, SearchConfig};
//!
//! let mut mcts = Mcts::new(SearchConfig::default().with_simulations(100));
//! let best = mcts.search().expect("the empty board has legal moves");
//! mcts.advance(best, Color::Black).unwrap();
//! println!("{}", mcts.board());
//! ```

pub mod bitset;
pub mod board;
pub mod constants;
pub mod gtp;
pub mod mcts;
pub mod node;
pub mod playout;
