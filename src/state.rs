// Copyright 2017-2021 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The state record: a plain, serializable description of a position that boards are imported
//! from and exported to.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{CastleStatus, Color, PieceKind, Square};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("no {0} king in the position")]
    MissingKing(Color),
    #[error("more than one {0} king in the position")]
    DuplicateKing(Color),
    #[error("square {0} is occupied twice")]
    SquareOccupiedTwice(Square),
    #[error("{0} is in check, but it is not {0}'s turn")]
    IdleKingInCheck(Color),
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastleRights {
    pub kingside: bool,
    pub queenside: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceRecord {
    pub kind: PieceKind,
    pub color: Color,
    pub square: Square,
    /// Castling rights; only meaningful on kings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub castling: Option<CastleRights>,
    /// The square skipped by a pawn's double step on the previous move.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub en_passant: Option<Square>,
}

impl PieceRecord {
    pub fn new(kind: PieceKind, color: Color, square: Square) -> PieceRecord {
        PieceRecord {
            kind,
            color,
            square,
            castling: None,
            en_passant: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    pub pieces: Vec<PieceRecord>,
    pub side_to_move: Color,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
}

impl StateRecord {
    /// Checks the structural invariants a board relies on: one king per side and at most one
    /// piece per square.
    pub fn validate(&self) -> Result<(), StateError> {
        let mut seen = [false; 64];
        for piece in &self.pieces {
            let slot = &mut seen[piece.square.index()];
            if *slot {
                return Err(StateError::SquareOccupiedTwice(piece.square));
            }

            *slot = true;
        }

        for color in crate::core::colors() {
            let kings = self
                .pieces
                .iter()
                .filter(|p| p.kind == PieceKind::King && p.color == color)
                .count();
            match kings {
                0 => return Err(StateError::MissingKing(color)),
                1 => {}
                _ => return Err(StateError::DuplicateKing(color)),
            }
        }

        Ok(())
    }

    /// The castling rights of both sides, gathered from the king records.
    pub fn castle_status(&self) -> CastleStatus {
        let mut status = CastleStatus::NONE;
        for piece in &self.pieces {
            if let (PieceKind::King, Some(rights)) = (piece.kind, piece.castling) {
                if rights.kingside {
                    status |= CastleStatus::kingside(piece.color);
                }
                if rights.queenside {
                    status |= CastleStatus::queenside(piece.color);
                }
            }
        }

        status
    }

    /// The en passant target square, if the previous move was a double pawn step.
    pub fn en_passant_square(&self) -> Option<Square> {
        self.pieces.iter().find_map(|p| p.en_passant)
    }

    /// Returns a copy with pieces sorted by square, for order-insensitive comparison.
    pub fn normalized(&self) -> StateRecord {
        let mut record = self.clone();
        record.pieces.sort_by_key(|p| p.square);
        record
    }
}
