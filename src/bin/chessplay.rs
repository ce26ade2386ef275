// Copyright 2021 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use chessplay::board::{Board, Endgame, LastMove};
use chessplay::core::{Color, Square};
use chessplay::fen::START_POSITION;
use chessplay::player::{PlayerKind, RandomMover};
use chessplay::uci::{self, UciEngine};
use structopt::StructOpt;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Copy, Clone, Debug)]
enum Controller {
    Human,
    Computer,
    Random,
}

impl FromStr for Controller {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "human" => Ok(Controller::Human),
            "computer" => Ok(Controller::Computer),
            "random" => Ok(Controller::Random),
            _ => Err(anyhow!("unknown player {:?}, expected human, computer or random", s)),
        }
    }
}

/// Plays a game of chess in the terminal. Moves are entered in standard algebraic notation.
#[derive(Debug, StructOpt)]
struct Options {
    /// FEN of the position to start from. Defaults to the standard starting position.
    #[structopt(long)]
    fen: Option<String>,
    /// Who plays white: human, computer or random.
    #[structopt(long, default_value = "human")]
    white: Controller,
    /// Who plays black: human, computer or random.
    #[structopt(long, default_value = "human")]
    black: Controller,
    /// JSON file describing the available UCI engines.
    #[structopt(long, default_value = "engine.json")]
    engine_config: PathBuf,
    /// Name of the engine to use for computer players.
    #[structopt(long, default_value = "stockfish")]
    engine: String,
    /// Seed for random players.
    #[structopt(long)]
    seed: Option<u64>,
    /// Draw the board with chess symbols and rank and file labels.
    #[structopt(long)]
    unicode: bool,
}

fn player_kind(options: &Options, controller: Controller) -> Result<PlayerKind> {
    let kind = match controller {
        Controller::Human => PlayerKind::Human,
        Controller::Random => {
            let mover = match options.seed {
                Some(seed) => RandomMover::new(seed),
                None => RandomMover::from_entropy(),
            };
            PlayerKind::Computer(Box::new(mover))
        }
        Controller::Computer => {
            let config = uci::load_config(&options.engine_config, &options.engine)?;
            let engine = UciEngine::spawn(&options.engine, &config)?;
            PlayerKind::Computer(Box::new(engine))
        }
    };

    Ok(kind)
}

fn prompt<I>(lines: &mut I, text: &str) -> Result<Option<String>>
where
    I: Iterator<Item = io::Result<String>>,
{
    print!("{}", text);
    io::stdout().flush()?;
    match lines.next() {
        Some(line) => Ok(Some(line?.trim().to_owned())),
        None => Ok(None),
    }
}

fn describe(attackers: &[Square]) -> String {
    attackers
        .iter()
        .map(|sq| sq.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_env("CHESSPLAY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let options = Options::from_args();
    let mut board = Board::from_fen(options.fen.as_deref().unwrap_or(START_POSITION))?;
    for (color, controller) in [(Color::White, options.white), (Color::Black, options.black)] {
        board.set_player(color, player_kind(&options, controller)?);
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        if options.unicode {
            print!("{}", board.diagram(true, true));
        } else {
            print!("{}", board);
        }

        let side = board.side_to_move();
        match board.check_endgame()? {
            Some(Endgame::Checkmate) => {
                println!("checkmate, {} wins", side.toggle());
                return Ok(());
            }
            Some(Endgame::Stalemate) => {
                println!("stalemate");
                return Ok(());
            }
            None => {}
        }

        if board.is_in_check(side) {
            println!("{} is in check", side);
        }

        if !board.players().current().is_human() {
            if let Some(LastMove::Rejected { attackers }) = board.do_computer_move()? {
                bail!(
                    "{} suggested a move that leaves its king attacked from {}",
                    side,
                    describe(&attackers)
                );
            }

            continue;
        }

        let text = match prompt(&mut lines, &format!("{} to move> ", side))? {
            Some(text) => text,
            None => return Ok(()),
        };

        match text.as_str() {
            "" => continue,
            "quit" | "exit" => return Ok(()),
            "fen" => {
                println!("{}", board.as_fen());
                continue;
            }
            _ => {}
        }

        match board.play_move(&text) {
            Ok(LastMove::Played) => {}
            Ok(LastMove::Rejected { attackers }) => {
                println!(
                    "{} leaves your king in check from {}",
                    text,
                    describe(&attackers)
                );
                continue;
            }
            Err(err) => {
                println!("{}", err);
                continue;
            }
        }

        while board.pawn_needs_promotion().is_some() {
            let choice = match prompt(&mut lines, "promote to (q, r, b, n)> ")? {
                Some(choice) => choice,
                None => return Ok(()),
            };

            if let Err(err) = board.promote_pawn(choice.chars().next().unwrap_or('q')) {
                println!("{}", err);
            }
        }
    }
}
