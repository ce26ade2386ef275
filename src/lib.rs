// Copyright 2017-2021 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `chessplay`, a chess rules engine.
//!
//! `chessplay` keeps the state of a game and knows every rule of chess: which squares each piece
//! can reach, when a king is in check, castling, en passant, promotion, checkmate and stalemate.
//! Positions come in and go out as [`StateRecord`]s or FEN text. It does not think about which
//! move is best; when a computer is playing, that decision is delegated to an external UCI engine
//! or a random mover.

pub mod board;
pub mod core;
pub mod fen;
pub mod notation;
pub mod piece;
pub mod pieces;
pub mod player;
pub mod state;
pub mod uci;

pub use board::Board;
pub use state::StateRecord;
