// Copyright 2017-2021 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The collection of pieces on a board, and the update that derives every piece's move sets from
//! the position.
//!
//! The update runs in a fixed order. Every non-king piece is scouted and classified first, since
//! a king's scout needs the finished move sets of the enemy pieces to know which squares it must
//! avoid. Kings go second. En passant, check status and castling are layered on afterwards.

use crate::core::{self, Color, PieceKind, Square, SquareSet};
use crate::piece::{
    king_home, CastleLayout, CastleSide, Occupant, Piece, PieceId, ScoutReport, Sighting,
};

/// The square-indexed view of the board: which piece, if any, stands on each square.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Positions([Option<PieceId>; 64]);

impl Positions {
    pub fn new() -> Positions {
        Positions([None; 64])
    }

    pub fn get(&self, square: Square) -> Option<PieceId> {
        self.0[square.index()]
    }

    pub fn set(&mut self, square: Square, piece: Option<PieceId>) {
        self.0[square.index()] = piece;
    }

    pub fn is_occupied(&self, square: Square) -> bool {
        self.get(square).is_some()
    }

    /// Iterates over occupied squares in ascending order.
    pub fn occupied(&self) -> impl Iterator<Item = (Square, PieceId)> + '_ {
        core::squares().filter_map(move |sq| self.get(sq).map(|id| (sq, id)))
    }
}

impl Default for Positions {
    fn default() -> Self {
        Positions::new()
    }
}

/// How much of the update to run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UpdateMode {
    /// Everything, including en passant windows, castling rights and castling destinations.
    Full,
    /// Only what check detection needs. Never touches en passant state or castling rights, so it
    /// is safe to run on a tentative position.
    MateProbe,
}

/// Arena of every piece that has ever been on the board, plus the ordered set of live ones.
#[derive(Clone, Debug, Default)]
pub struct Pieces {
    arena: Vec<Piece>,
    live: Vec<PieceId>,
    masked: Vec<PieceId>,
    lost: Vec<PieceId>,
}

impl Pieces {
    pub fn new() -> Pieces {
        Pieces::default()
    }

    /// Moves a piece into the arena without making it live.
    pub fn create(&mut self, piece: Piece) -> PieceId {
        self.arena.push(piece);
        PieceId(self.arena.len() - 1)
    }

    /// Moves a piece into the arena and makes it live.
    pub fn insert(&mut self, piece: Piece) -> PieceId {
        let id = self.create(piece);
        self.add(id);
        id
    }

    pub fn add(&mut self, id: PieceId) {
        if !self.live.contains(&id) {
            self.live.push(id);
        }
    }

    /// Removes a piece from play; it stays in the arena and is remembered as lost.
    pub fn remove(&mut self, id: PieceId) {
        if let Some(idx) = self.live.iter().position(|&live| live == id) {
            self.live.remove(idx);
            self.lost.push(id);
        }

        self.arena[id.0].square = None;
    }

    pub fn get(&self, id: PieceId) -> &Piece {
        &self.arena[id.0]
    }

    pub fn get_mut(&mut self, id: PieceId) -> &mut Piece {
        &mut self.arena[id.0]
    }

    pub fn has(&self, id: PieceId) -> bool {
        self.live.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Hides pieces from iteration without removing them.
    pub fn mask(&mut self, ids: &[PieceId]) {
        self.masked.extend_from_slice(ids);
    }

    pub fn unmask_all(&mut self) {
        self.masked.clear();
    }

    pub fn is_masked(&self, id: PieceId) -> bool {
        self.masked.contains(&id)
    }

    /// Live, unmasked pieces in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = PieceId> + '_ {
        self.live
            .iter()
            .copied()
            .filter(move |id| !self.masked.contains(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (PieceId, &Piece)> + '_ {
        self.ids().map(move |id| (id, self.get(id)))
    }

    pub fn of_color(&self, color: Color) -> impl Iterator<Item = (PieceId, &Piece)> + '_ {
        self.iter().filter(move |(_, piece)| piece.color == color)
    }

    pub fn king(&self, color: Color) -> Option<PieceId> {
        self.of_color(color)
            .find(|(_, piece)| piece.is_king())
            .map(|(id, _)| id)
    }

    pub fn lost(&self) -> impl Iterator<Item = (PieceId, &Piece)> + '_ {
        self.lost.iter().map(move |&id| (id, self.get(id)))
    }

    pub fn promoted(&self) -> impl Iterator<Item = (PieceId, &Piece)> + '_ {
        self.iter().filter(|(_, piece)| piece.promoted)
    }

    /// The pawn that double-stepped on the last move, if any.
    pub fn double_moved_pawn(&self) -> Option<PieceId> {
        self.iter()
            .find(|(_, piece)| {
                piece
                    .pawn()
                    .map_or(false, |pawn| pawn.double_move_target.is_some())
            })
            .map(|(id, _)| id)
    }

    /// The pawn waiting for a promotion choice, if any.
    pub fn promotion_pending(&self) -> Option<PieceId> {
        self.iter()
            .find(|(_, piece)| piece.pawn().map_or(false, |pawn| pawn.promotion_pending))
            .map(|(id, _)| id)
    }

    pub fn reset_promotion(&mut self) {
        for piece in self.arena.iter_mut() {
            if let Some(pawn) = piece.pawn_mut() {
                pawn.promotion_pending = false;
            }
        }
    }

    pub fn reset_en_passant(&mut self) {
        for piece in self.arena.iter_mut() {
            if let Some(pawn) = piece.pawn_mut() {
                pawn.reset_en_passant();
            }
        }
    }

    /// Squares denied to the king of `color` by the opposing side.
    pub fn king_exclusion_zone(&self, color: Color) -> SquareSet {
        let mut zone = SquareSet::empty();
        for (_, piece) in self.of_color(color.toggle()) {
            zone |= piece.king_exclusion();
        }

        zone
    }

    pub fn occupant(&self, positions: &Positions, color: Color, square: Square) -> Occupant {
        match positions.get(square) {
            None => Occupant::Empty,
            Some(id) => {
                let other = self.get(id);
                if other.color == color {
                    Occupant::Ally
                } else if other.is_king() {
                    Occupant::EnemyKing
                } else {
                    Occupant::Enemy
                }
            }
        }
    }

    /// Annotates a piece's move pool with what stands on each square. A king does not see the
    /// squares its enemies deny it.
    pub fn scout(&self, positions: &Positions, id: PieceId) -> ScoutReport {
        let piece = self.get(id);
        let excluded = if piece.is_king() {
            self.king_exclusion_zone(piece.color)
        } else {
            SquareSet::empty()
        };

        piece
            .move_pool()
            .into_iter()
            .map(|(heading, squares)| {
                let sightings = squares
                    .into_iter()
                    .filter(|&sq| !excluded.contains(sq))
                    .map(|square| Sighting {
                        square,
                        occupant: self.occupant(positions, piece.color, square),
                    })
                    .collect();
                (heading, sightings)
            })
            .collect()
    }

    /// Enemy pieces whose legal moves include the king's square.
    pub fn checkers(&self, king: PieceId) -> Vec<PieceId> {
        let king = self.get(king);
        let square = match king.square {
            Some(square) => square,
            None => return Vec::new(),
        };

        self.of_color(king.color.toggle())
            .filter(|(_, piece)| piece.legal_moves.contains(square))
            .map(|(id, _)| id)
            .collect()
    }

    /// Recomputes every live piece's move sets from the position.
    pub fn update(&mut self, positions: &Positions, mode: UpdateMode) {
        self.sync_squares(positions);

        let (kings, others): (Vec<PieceId>, Vec<PieceId>) =
            self.ids().partition(|&id| self.get(id).is_king());
        for id in others.into_iter().chain(kings) {
            let report = self.scout(positions, id);
            self.get_mut(id).classify(&report);
        }

        if mode == UpdateMode::Full {
            self.update_en_passant(positions);
        }

        self.update_check();
        if mode == UpdateMode::Full {
            self.update_castling_rights(positions);
        }

        self.update_castling(positions, mode);
    }

    fn sync_squares(&mut self, positions: &Positions) {
        for id in self.live.clone() {
            if !self.masked.contains(&id) {
                self.arena[id.0].square = None;
            }
        }

        for (square, id) in positions.occupied() {
            if self.has(id) && !self.is_masked(id) {
                self.arena[id.0].square = Some(square);
            }
        }
    }

    fn update_en_passant(&mut self, positions: &Positions) {
        let victim = match self.double_moved_pawn() {
            Some(victim) => victim,
            None => return,
        };

        let (victim_square, target, victim_color) = {
            let piece = self.get(victim);
            match (piece.square, piece.pawn().and_then(|p| p.double_move_target)) {
                (Some(square), Some(target)) => (square, target, piece.color),
                _ => return,
            }
        };

        for files in [-1, 1] {
            let adjacent = match victim_square.translate(files, 0) {
                Some(sq) => sq,
                None => continue,
            };

            let capturer = match positions.get(adjacent) {
                Some(id) if !self.is_masked(id) => id,
                _ => continue,
            };

            let piece = self.get_mut(capturer);
            if piece.color == victim_color {
                continue;
            }

            if let Some(pawn) = piece.pawn_mut() {
                pawn.en_passant = true;
                pawn.en_passant_move = Some(target);
                pawn.en_passant_victim = Some(victim);
            } else {
                continue;
            }

            piece.legal_moves.insert(target);
        }
    }

    fn update_check(&mut self) {
        let kings: Vec<PieceId> = self
            .iter()
            .filter(|(_, piece)| piece.is_king())
            .map(|(id, _)| id)
            .collect();
        for id in kings {
            let color = self.get(id).color;
            let enemy_attacks = self.king_exclusion_zone(color);
            let checked_by = self.checkers(id);
            let king = self.get_mut(id);
            let in_check = king
                .square
                .map_or(false, |square| enemy_attacks.contains(square));
            if let Some(state) = king.king_mut() {
                state.enemy_attacks = enemy_attacks;
                state.in_check = in_check;
                state.checked_by = checked_by;
            }
        }
    }

    fn update_castling_rights(&mut self, positions: &Positions) {
        let kings: Vec<PieceId> = self
            .iter()
            .filter(|(_, piece)| piece.is_king())
            .map(|(id, _)| id)
            .collect();
        for id in kings {
            let (color, unmoved) = {
                let king = self.get(id);
                let unmoved = king.move_count == 0 && king.square == Some(king_home(king.color));
                (king.color, unmoved)
            };

            for side in CastleSide::BOTH {
                let layout = CastleLayout::of(color, side);
                let partner = positions.get(layout.rook).filter(|&rook| {
                    let rook = self.get(rook);
                    rook.kind() == PieceKind::Rook && rook.color == color && rook.move_count == 0
                });

                if let Some(state) = self.get_mut(id).king_mut() {
                    let castling = state.castling_mut(side);
                    if !unmoved || partner.is_none() {
                        castling.allowed = false;
                        castling.rook = None;
                    } else if castling.allowed {
                        castling.rook = partner;
                    }
                }
            }
        }
    }

    fn update_castling(&mut self, positions: &Positions, mode: UpdateMode) {
        let kings: Vec<PieceId> = self
            .iter()
            .filter(|(_, piece)| piece.is_king())
            .map(|(id, _)| id)
            .collect();
        for id in kings {
            let king = self.get_mut(id);
            let color = king.color;
            let mut destinations = SquareSet::empty();
            if let Some(state) = king.king_mut() {
                let in_check = state.in_check;
                for side in CastleSide::BOTH {
                    let layout = CastleLayout::of(color, side);
                    let clear = layout.empty.iter().all(|&sq| !positions.is_occupied(sq));
                    let safe = layout
                        .transition
                        .iter()
                        .all(|&sq| !state.enemy_attacks.contains(sq));
                    let castling = state.castling_mut(side);
                    castling.valid = !in_check && clear && safe;
                    if castling.allowed && castling.valid {
                        destinations.insert(layout.king_destination());
                    }
                }
            }

            if mode == UpdateMode::Full {
                king.legal_moves |= destinations;
            }
        }
    }
}
