// Copyright 2021 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use chessplay::core::{PieceKind, Square};
use chessplay::Board;
use structopt::StructOpt;

/// Lists the legal moves in a position, in long algebraic notation.
#[derive(Debug, StructOpt)]
struct Options {
    /// FEN representation of the position to analyze.
    #[structopt(name = "FEN")]
    fen: String,
    /// Only list moves of the piece on this square.
    #[structopt(name = "SQUARE")]
    square: Option<Square>,
    /// Print the position as a JSON state record instead.
    #[structopt(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let ops = Options::from_args();
    let mut board = Board::from_fen(&ops.fen)?;
    if ops.json {
        println!("{}", serde_json::to_string_pretty(&board.to_record())?);
        return Ok(());
    }

    let moves = board.safe_moves()?;
    for (from, to) in moves {
        if ops.square.map_or(false, |sq| sq != from) {
            continue;
        }

        let promotes = board.piece_at(from).map_or(false, |piece| {
            piece.kind() == PieceKind::Pawn && to.rank() == piece.color().promotion_rank()
        });
        if promotes {
            for letter in ['q', 'r', 'b', 'n'] {
                println!("{}{}{}", from, to, letter);
            }
        } else {
            println!("{}{}", from, to);
        }
    }

    Ok(())
}
