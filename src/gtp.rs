//! Go Text Protocol (GTP) front end for NoGo.
//!
//! A thin line-oriented coordinator: it parses commands, translates vertices
//! such as `C5` into cell indices and drives [`Mcts`]. Only the commands a
//! NoGo referee needs are supported.
//!
//! ## Supported Commands
//!
//! - `name`, `version`, `protocol_version`
//! - `list_commands`, `known_command <cmd>`
//! - `quit`
//! - `boardsize <size>` - only the compiled-in size is accepted
//! - `clear_board`
//! - `play <color> <vertex>`
//! - `genmove <color>` - replies `resign` when no legal move is left
//! - `showboard`
//!
//! ## Example
//!
//! ```ignore
//! use nogo_rave::gtp::GtpEngine;
//! let mut engine = GtpEngine::new(Default::default());
//! engine.run()?;
//! ```

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};
use log::{debug, info};

use crate::board::{Board, Cell, Color};
use crate::constants::N;
use crate::mcts::{Mcts, SearchConfig};

/// The list of known GTP commands.
const KNOWN_COMMANDS: &[&str] = &[
    "boardsize",
    "clear_board",
    "genmove",
    "known_command",
    "list_commands",
    "name",
    "play",
    "protocol_version",
    "quit",
    "showboard",
    "version",
];

/// Column letters, skipping 'I'.
const COLUMNS: &[u8] = b"ABCDEFGHJKLMNOPQRST";

/// Parse a vertex such as `"C5"` into a cell. Row `N` is the top row.
pub fn parse_vertex(s: &str) -> Option<Cell> {
    let bytes = s.as_bytes();
    let (&letter, digits) = bytes.split_first()?;
    let col = COLUMNS[..N]
        .iter()
        .position(|&c| c == letter.to_ascii_uppercase())?;
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let row: usize = std::str::from_utf8(digits).ok()?.parse().ok()?;
    if !(1..=N).contains(&row) {
        return None;
    }
    Some((N - row) * N + col)
}

/// Format a cell as a vertex such as `"C5"`.
pub fn vertex(cell: Cell) -> String {
    let (row, col) = (cell / N, cell % N);
    format!("{}{}", COLUMNS[col] as char, N - row)
}

/// Parse a GTP color argument.
pub fn parse_color(s: &str) -> Option<Color> {
    match s.to_ascii_lowercase().as_str() {
        "b" | "black" => Some(Color::Black),
        "w" | "white" => Some(Color::White),
        _ => None,
    }
}

/// GTP engine state.
pub struct GtpEngine {
    mcts: Mcts,
}

impl GtpEngine {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            mcts: Mcts::new(config),
        }
    }

    pub fn board(&self) -> &Board {
        self.mcts.board()
    }

    /// Run the GTP command loop, reading from stdin and writing to stdout.
    pub fn run(&mut self) -> Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();

        for line in stdin.lock().lines() {
            let line = line.context("reading command")?;
            let Some(reply) = self.handle_line(&line) else {
                continue;
            };
            write!(stdout, "{reply}")?;
            stdout.flush()?;
            if reply.quit {
                break;
            }
        }
        Ok(())
    }

    /// Process one input line. Blank lines and comments produce no reply;
    /// a bare id gets an error reply.
    pub fn handle_line(&mut self, line: &str) -> Option<Reply> {
        let line = Self::preprocess(line);
        let (id, command_line) = Self::parse_id(&line);

        let parts: Vec<&str> = command_line.split_whitespace().collect();
        let Some((command, args)) = parts.split_first() else {
            return id.map(|id| Reply {
                id: Some(id),
                result: Err("empty command".to_string()),
                quit: false,
            });
        };
        let command = command.to_lowercase();

        debug!("gtp <- {command_line}");
        let result = self.execute(&command, args);
        Some(Reply {
            id,
            result: result.map_err(|e| e.to_string()),
            quit: command == "quit",
        })
    }

    /// Drop control characters and comments, turn tabs into spaces.
    fn preprocess(raw: &str) -> String {
        let without_comment = raw.split('#').next().unwrap_or("");
        without_comment
            .chars()
            .filter_map(|c| match c {
                '\t' => Some(' '),
                c if c.is_control() => None,
                c => Some(c),
            })
            .collect()
    }

    /// Parse an optional numeric command ID from the beginning of the line.
    fn parse_id(line: &str) -> (Option<u32>, &str) {
        let trimmed = line.trim();
        let end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        match trimmed[..end].parse::<u32>() {
            Ok(id) => (Some(id), trimmed[end..].trim()),
            Err(_) => (None, trimmed),
        }
    }

    /// Execute a GTP command and return its response text.
    fn execute(&mut self, command: &str, args: &[&str]) -> Result<String> {
        match command {
            "name" => Ok(env!("CARGO_PKG_NAME").to_string()),

            "version" => Ok(env!("CARGO_PKG_VERSION").to_string()),

            "protocol_version" => Ok("2".to_string()),

            "list_commands" => Ok(KNOWN_COMMANDS.join("\n")),

            "known_command" => {
                let name = args.first().context("missing argument")?;
                let known = KNOWN_COMMANDS.contains(&name.to_lowercase().as_str());
                Ok(known.to_string())
            }

            "quit" => Ok(String::new()),

            "boardsize" => {
                let size: usize = args
                    .first()
                    .context("missing argument")?
                    .parse()
                    .context("invalid size")?;
                if size != N {
                    bail!("unacceptable size, only {N} is supported (got {size})");
                }
                self.mcts.set_root(&Board::new(), Color::Black);
                Ok(String::new())
            }

            "clear_board" => {
                self.mcts.set_root(&Board::new(), Color::Black);
                Ok(String::new())
            }

            "play" => {
                let [color, vertex_arg, ..] = args else {
                    bail!("missing arguments");
                };
                let color = parse_color(color).context("invalid color")?;
                let cell = parse_vertex(vertex_arg).context("invalid vertex")?;
                self.mcts.advance(cell, color)?;
                Ok(String::new())
            }

            "genmove" => {
                let color = args
                    .first()
                    .and_then(|c| parse_color(c))
                    .context("invalid color")?;
                if self.mcts.to_move() != color {
                    let board = self.mcts.board().clone();
                    self.mcts.set_root(&board, color);
                }

                match self.mcts.search() {
                    Some(cell) => {
                        self.mcts.advance(cell, color)?;
                        info!("genmove {color:?} -> {}", vertex(cell));
                        Ok(vertex(cell))
                    }
                    None => {
                        info!("genmove {color:?} -> resign");
                        Ok("resign".to_string())
                    }
                }
            }

            "showboard" => Ok(format!("\n{}", self.mcts.board())),

            _ => bail!("unknown command: {command}"),
        }
    }
}

/// One GTP response.
#[derive(Debug)]
pub struct Reply {
    pub id: Option<u32>,
    pub result: std::result::Result<String, String>,
    pub quit: bool,
}

impl std::fmt::Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (prefix, message) = match &self.result {
            Ok(m) => ('=', m),
            Err(m) => ('?', m),
        };
        let id = self.id.map(|i| i.to_string()).unwrap_or_default();
        write!(f, "{prefix}{id} {message}\n\n")
    }
}
