// Copyright 2017-2021 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use thiserror::Error;

use crate::core::{PieceKind, Square};
use crate::piece::{king_home, CastleLayout, CastleSide, Piece, PieceId};
use crate::pieces::{Pieces, Positions};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("move {from}{to} was already reverted")]
    AlreadyReverted { from: Square, to: Square },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MoveState {
    Applied,
    Reverted,
}

/// The rook half of a castling move.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RookShift {
    pub rook: PieceId,
    pub from: Square,
    pub to: Square,
}

/// One ply, applied to a position. Records everything needed to put the position back exactly
/// as it was, and the effects that only happen once the move is accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Move {
    piece: PieceId,
    from: Square,
    to: Square,
    promotion: Option<PieceKind>,
    captured: Option<PieceId>,
    en_passant_victim: Option<(PieceId, Square)>,
    castle: Option<RookShift>,
    pieces_to_remove: Vec<PieceId>,
    pieces_to_add: Vec<PieceId>,
    capture: bool,
    pawn_advance: bool,
    switch_players: bool,
    disable_castle: bool,
    state: MoveState,
}

impl Move {
    /// Moves `piece` to `to` in the position array, along with the castling rook or the en
    /// passant victim when the move is one of those.
    pub fn apply(
        positions: &mut Positions,
        pieces: &mut Pieces,
        piece: PieceId,
        to: Square,
        promotion: Option<PieceKind>,
    ) -> Move {
        let mover = pieces.get(piece);
        let from = mover
            .square()
            .expect("a piece being moved must be on the board");
        let is_pawn = mover.kind() == PieceKind::Pawn;
        let mut mov = Move {
            piece,
            from,
            to,
            promotion,
            captured: None,
            en_passant_victim: None,
            castle: None,
            pieces_to_remove: Vec::new(),
            pieces_to_add: Vec::new(),
            capture: false,
            pawn_advance: false,
            switch_players: true,
            disable_castle: false,
            state: MoveState::Applied,
        };

        if let Some(captured) = positions.get(to) {
            mov.capture = true;
            mov.captured = Some(captured);
            mov.pieces_to_remove.push(captured);
        } else {
            if let Some(shift) = castle_for(positions, mover, from, to) {
                positions.set(shift.from, None);
                positions.set(shift.to, Some(shift.rook));
                pieces.get_mut(shift.rook).square = Some(shift.to);
                mov.castle = Some(shift);
                mov.disable_castle = true;
            } else if let Some((victim, square)) = en_passant_for(pieces, mover, to) {
                positions.set(square, None);
                mov.en_passant_victim = Some((victim, square));
                mov.pieces_to_remove.push(victim);
            }

            mov.pawn_advance = is_pawn;
        }

        positions.set(from, None);
        positions.set(to, Some(piece));
        pieces.get_mut(piece).square = Some(to);
        mov
    }

    pub fn piece(&self) -> PieceId {
        self.piece
    }

    pub fn from(&self) -> Square {
        self.from
    }

    pub fn to(&self) -> Square {
        self.to
    }

    pub fn state(&self) -> MoveState {
        self.state
    }

    pub fn is_capture(&self) -> bool {
        self.capture
    }

    pub fn is_pawn_advance(&self) -> bool {
        self.pawn_advance
    }

    pub fn switches_players(&self) -> bool {
        self.switch_players
    }

    pub fn castle(&self) -> Option<RookShift> {
        self.castle
    }

    pub fn pieces_to_remove(&self) -> &[PieceId] {
        &self.pieces_to_remove
    }

    pub fn pieces_to_add(&self) -> &[PieceId] {
        &self.pieces_to_add
    }

    /// Effects that only happen to an accepted move: finishing an en passant capture, promotion,
    /// spending the castling move and counting the move.
    pub fn post_move(&mut self, positions: &mut Positions, pieces: &mut Pieces) {
        if self.en_passant_victim.is_some() {
            self.capture = true;
        }

        let mover = pieces.get(self.piece);
        let color = mover.color();
        let promotes = mover.kind() == PieceKind::Pawn
            && !mover.is_promoted()
            && self.to.rank() == color.promotion_rank();
        if promotes {
            match self.promotion {
                Some(kind) => {
                    let mut promoted = Piece::new(kind, color, Some(self.to));
                    promoted.promoted = true;
                    let id = pieces.create(promoted);
                    positions.set(self.to, Some(id));
                    self.pieces_to_remove.push(self.piece);
                    self.pieces_to_add.push(id);
                }
                None => {
                    if let Some(pawn) = pieces.get_mut(self.piece).pawn_mut() {
                        pawn.promotion_pending = true;
                    }
                }
            }
        }

        let mover = pieces.get_mut(self.piece);
        if self.disable_castle {
            if let Some(king) = mover.king_mut() {
                king.kingside.valid = false;
                king.queenside.valid = false;
            }
        }

        mover.move_count += 1;
    }

    /// Records the skipped square on a pawn that just moved two ranks.
    pub fn record_double_step(&self, pieces: &mut Pieces) {
        let skipped = match (self.from.rank().as_u8(), self.to.rank().as_u8()) {
            (from, to) if from + 2 == to => self.from.translate(0, 1),
            (from, to) if to + 2 == from => self.from.translate(0, -1),
            _ => None,
        };

        if let Some(pawn) = pieces.get_mut(self.piece).pawn_mut() {
            pawn.double_move_target = skipped;
        }
    }

    /// Puts every piece this move touched back on its original square. A move can only be
    /// reverted once.
    pub fn revert(
        &mut self,
        positions: &mut Positions,
        pieces: &mut Pieces,
    ) -> Result<(), MoveError> {
        if self.state == MoveState::Reverted {
            return Err(MoveError::AlreadyReverted {
                from: self.from,
                to: self.to,
            });
        }

        positions.set(self.to, self.captured);
        positions.set(self.from, Some(self.piece));
        pieces.get_mut(self.piece).square = Some(self.from);
        if let Some(captured) = self.captured {
            pieces.get_mut(captured).square = Some(self.to);
        }

        if let Some(shift) = self.castle {
            positions.set(shift.to, None);
            positions.set(shift.from, Some(shift.rook));
            pieces.get_mut(shift.rook).square = Some(shift.from);
        }

        if let Some((victim, square)) = self.en_passant_victim {
            positions.set(square, Some(victim));
            pieces.get_mut(victim).square = Some(square);
        }

        self.pieces_to_remove.clear();
        self.pieces_to_add.clear();
        self.capture = false;
        self.pawn_advance = false;
        self.switch_players = false;
        self.disable_castle = false;
        self.state = MoveState::Reverted;
        Ok(())
    }
}

fn castle_for(
    positions: &Positions,
    mover: &Piece,
    from: Square,
    to: Square,
) -> Option<RookShift> {
    if !mover.is_king() || from != king_home(mover.color()) {
        return None;
    }

    CastleSide::BOTH.iter().find_map(|&side| {
        let layout = CastleLayout::of(mover.color(), side);
        if layout.king_destination() != to {
            return None;
        }

        positions.get(layout.rook).map(|rook| RookShift {
            rook,
            from: layout.rook,
            to: layout.rook_destination(),
        })
    })
}

fn en_passant_for(pieces: &Pieces, mover: &Piece, to: Square) -> Option<(PieceId, Square)> {
    let pawn = mover.pawn()?;
    if !pawn.en_passant || pawn.en_passant_move != Some(to) {
        return None;
    }

    let victim = pawn.en_passant_victim?;
    let square = pieces.get(victim).square()?;
    Some((victim, square))
}
