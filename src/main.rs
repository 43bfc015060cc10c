//! NoGo-RAVE command line.
//!
//! ## Usage
//!
//! - `nogo-rave` - Play one self-play game
//! - `nogo-rave gtp` - Start a GTP server for GUI or referee integration
//! - `nogo-rave selfplay` - Play a self-play game and print the result

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use flexi_logger::Logger;
use log::info;

use nogo_rave::board::Color;
use nogo_rave::gtp::{GtpEngine, vertex};
use nogo_rave::mcts::{Mcts, SearchConfig};

/// NoGo-RAVE: a NoGo MCTS engine
#[derive(Parser)]
#[command(name = "nogo-rave")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Simulations per move
    #[arg(long, global = true)]
    sims: Option<usize>,

    /// Seed of the search RNG
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Exploration weight in the selection score
    #[arg(long, global = true)]
    c_bias: Option<f64>,

    /// Visits a leaf needs before it is expanded
    #[arg(long, global = true)]
    expand_visits: Option<u32>,

    /// Wall-clock cap per move in milliseconds
    #[arg(long, global = true)]
    time_ms: Option<u64>,

    /// Log level, used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the GTP (Go Text Protocol) server
    Gtp,
    /// Let the engine play a full game against itself
    Selfplay,
}

impl Cli {
    fn search_config(&self) -> SearchConfig {
        let mut config = SearchConfig::default();
        if let Some(sims) = self.sims {
            config = config.with_simulations(sims);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(c_bias) = self.c_bias {
            config = config.with_c_bias(c_bias);
        }
        if let Some(expand_visits) = self.expand_visits {
            config = config.with_expand_visits(expand_visits);
        }
        config.with_time_limit(self.time_ms.map(Duration::from_millis))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // GTP owns stdout, so logs always go to stderr
    let _logger = Logger::try_with_env_or_str(&cli.log_level)?
        .format(flexi_logger::colored_default_format)
        .log_to_stderr()
        .start()?;

    let config = cli.search_config();
    match cli.command {
        Some(Commands::Gtp) => GtpEngine::new(config).run(),
        Some(Commands::Selfplay) | None => run_selfplay(config),
    }
}

fn run_selfplay(config: SearchConfig) -> Result<()> {
    let mut mcts = Mcts::new(config);
    info!("self-play with {:?}", mcts.config());
    let mut color = Color::Black;
    let mut moves = 0;

    while let Some(cell) = mcts.search() {
        mcts.advance(cell, color)?;
        moves += 1;
        info!("{moves:3}. {color:?} {}", vertex(cell));
        color = color.other();
    }

    println!("{}", mcts.board());
    println!(
        "{:?} has no legal move after {moves} moves; {:?} wins",
        color,
        color.other()
    );
    Ok(())
}
