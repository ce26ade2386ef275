// Copyright 2017-2021 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Individual chess pieces: their movement geometry and the classification of what they can see
//! into legal moves, guarded allies and squares denied to the enemy king.

use derive_more::Display;

use crate::core::{self, knight_jumps, ray, Color, Heading, PieceKind, Square, SquareSet};

/// Stable handle to a piece owned by a [`crate::pieces::Pieces`] arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display(fmt = "#{}", _0)]
pub struct PieceId(pub(crate) usize);

/// What a piece sees on a square of its move pool.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Occupant {
    Empty,
    Ally,
    Enemy,
    EnemyKing,
}

/// One square of a scout report.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Sighting {
    pub square: Square,
    pub occupant: Occupant,
}

/// Geometric destinations of a piece, grouped by heading, nearest square first.
pub type MovePool = Vec<(Heading, Vec<Square>)>;

/// A move pool annotated with the occupant of every square.
pub type ScoutReport = Vec<(Heading, Vec<Sighting>)>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CastleSide {
    Kingside,
    Queenside,
}

impl CastleSide {
    pub const BOTH: [CastleSide; 2] = [CastleSide::Kingside, CastleSide::Queenside];
}

/// The fixed squares involved in one castling move.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CastleLayout {
    /// Where the partner rook starts.
    pub rook: Square,
    /// Squares the king passes through, in order; the last one is where the king lands and the
    /// first one is where the rook lands.
    pub transition: [Square; 2],
    /// Squares between king and rook, all of which must be empty.
    pub empty: &'static [Square],
}

impl CastleLayout {
    pub fn of(color: Color, side: CastleSide) -> CastleLayout {
        match (color, side) {
            (Color::White, CastleSide::Kingside) => CastleLayout {
                rook: core::H1,
                transition: [core::F1, core::G1],
                empty: &[core::F1, core::G1],
            },
            (Color::White, CastleSide::Queenside) => CastleLayout {
                rook: core::A1,
                transition: [core::D1, core::C1],
                empty: &[core::D1, core::C1, core::B1],
            },
            (Color::Black, CastleSide::Kingside) => CastleLayout {
                rook: core::H8,
                transition: [core::F8, core::G8],
                empty: &[core::F8, core::G8],
            },
            (Color::Black, CastleSide::Queenside) => CastleLayout {
                rook: core::A8,
                transition: [core::D8, core::C8],
                empty: &[core::D8, core::C8, core::B8],
            },
        }
    }

    pub fn king_destination(&self) -> Square {
        self.transition[1]
    }

    pub fn rook_destination(&self) -> Square {
        self.transition[0]
    }
}

/// The square a king must stand on to castle.
pub fn king_home(color: Color) -> Square {
    match color {
        Color::White => core::E1,
        Color::Black => core::E8,
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Castling {
    /// The permanent right. Once revoked it never comes back.
    pub allowed: bool,
    /// Whether castling is possible this turn.
    pub valid: bool,
    pub rook: Option<PieceId>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KingState {
    pub kingside: Castling,
    pub queenside: Castling,
    pub in_check: bool,
    pub checked_by: Vec<PieceId>,
    pub enemy_attacks: SquareSet,
}

impl KingState {
    pub fn castling(&self, side: CastleSide) -> &Castling {
        match side {
            CastleSide::Kingside => &self.kingside,
            CastleSide::Queenside => &self.queenside,
        }
    }

    pub fn castling_mut(&mut self, side: CastleSide) -> &mut Castling {
        match side {
            CastleSide::Kingside => &mut self.kingside,
            CastleSide::Queenside => &mut self.queenside,
        }
    }

    pub fn can_castle(&self, side: CastleSide) -> bool {
        let castling = self.castling(side);
        castling.allowed && castling.valid
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PawnState {
    pub en_passant: bool,
    pub en_passant_move: Option<Square>,
    pub en_passant_victim: Option<PieceId>,
    /// The square skipped by this pawn's double step, set only right after that step.
    pub double_move_target: Option<Square>,
    pub promotion_pending: bool,
}

impl PawnState {
    pub fn reset_en_passant(&mut self) {
        self.en_passant = false;
        self.en_passant_move = None;
        self.en_passant_victim = None;
        self.double_move_target = None;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Variant {
    Pawn(PawnState),
    Knight,
    Bishop,
    Rook,
    Queen,
    King(KingState),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Piece {
    pub(crate) color: Color,
    pub(crate) square: Option<Square>,
    pub(crate) move_count: u32,
    pub(crate) promoted: bool,
    pub(crate) legal_moves: SquareSet,
    pub(crate) allies_in_legal_moves: SquareSet,
    pub(crate) illegal_enemy_king_moves: SquareSet,
    pub(crate) variant: Variant,
}

impl Piece {
    pub fn new(kind: PieceKind, color: Color, square: Option<Square>) -> Piece {
        let variant = match kind {
            PieceKind::Pawn => Variant::Pawn(PawnState::default()),
            PieceKind::Knight => Variant::Knight,
            PieceKind::Bishop => Variant::Bishop,
            PieceKind::Rook => Variant::Rook,
            PieceKind::Queen => Variant::Queen,
            PieceKind::King => Variant::King(KingState::default()),
        };

        Piece {
            color,
            square,
            move_count: 0,
            promoted: false,
            legal_moves: SquareSet::empty(),
            allies_in_legal_moves: SquareSet::empty(),
            illegal_enemy_king_moves: SquareSet::empty(),
            variant,
        }
    }

    pub fn kind(&self) -> PieceKind {
        match self.variant {
            Variant::Pawn(_) => PieceKind::Pawn,
            Variant::Knight => PieceKind::Knight,
            Variant::Bishop => PieceKind::Bishop,
            Variant::Rook => PieceKind::Rook,
            Variant::Queen => PieceKind::Queen,
            Variant::King(_) => PieceKind::King,
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn square(&self) -> Option<Square> {
        self.square
    }

    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    pub fn is_promoted(&self) -> bool {
        self.promoted
    }

    pub fn is_king(&self) -> bool {
        matches!(self.variant, Variant::King(_))
    }

    pub fn legal_moves(&self) -> SquareSet {
        self.legal_moves
    }

    pub fn allies_in_legal_moves(&self) -> SquareSet {
        self.allies_in_legal_moves
    }

    pub fn illegal_enemy_king_moves(&self) -> SquareSet {
        self.illegal_enemy_king_moves
    }

    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    pub fn pawn(&self) -> Option<&PawnState> {
        match &self.variant {
            Variant::Pawn(state) => Some(state),
            _ => None,
        }
    }

    pub fn pawn_mut(&mut self) -> Option<&mut PawnState> {
        match &mut self.variant {
            Variant::Pawn(state) => Some(state),
            _ => None,
        }
    }

    pub fn king(&self) -> Option<&KingState> {
        match &self.variant {
            Variant::King(state) => Some(state),
            _ => None,
        }
    }

    pub fn king_mut(&mut self) -> Option<&mut KingState> {
        match &mut self.variant {
            Variant::King(state) => Some(state),
            _ => None,
        }
    }

    /// The letter for this piece in FEN: upper case for white, lower case for black.
    pub fn as_char(&self) -> char {
        self.kind().as_char(self.color)
    }

    /// Returns every square this piece could reach on an empty board, grouped by heading.
    pub fn move_pool(&self) -> MovePool {
        let square = match self.square {
            Some(square) => square,
            None => return Vec::new(),
        };

        let rays = |headings: &[Heading], limit: usize| -> MovePool {
            headings
                .iter()
                .map(|&heading| (heading, ray(square, self.color, heading, limit)))
                .collect()
        };

        match self.variant {
            Variant::Pawn(_) => {
                let mut pool = rays(&[Heading::Forward], 2);
                pool.extend(rays(&[Heading::ForwardLeft, Heading::ForwardRight], 1));
                pool
            }
            Variant::Knight => vec![(Heading::Jump, knight_jumps(square).to_vec())],
            Variant::Bishop => rays(&Heading::DIAGONAL, 7),
            Variant::Rook => rays(&Heading::ORTHOGONAL, 7),
            Variant::Queen => rays(&Heading::ALL, 7),
            Variant::King(_) => rays(&Heading::ALL, 1),
        }
    }

    pub(crate) fn clear_moves(&mut self) {
        self.legal_moves.clear();
        self.allies_in_legal_moves.clear();
        self.illegal_enemy_king_moves.clear();
    }

    /// Sorts a scout report into this piece's three move sets, replacing whatever they held.
    pub fn classify(&mut self, report: &ScoutReport) {
        self.clear_moves();
        match self.kind() {
            PieceKind::Bishop | PieceKind::Rook | PieceKind::Queen => {
                for (_, sightings) in report {
                    self.classify_ray(sightings);
                }
            }
            PieceKind::Knight => {
                for sighting in report.iter().flat_map(|(_, s)| s) {
                    if sighting.occupant == Occupant::Ally {
                        self.allies_in_legal_moves.insert(sighting.square);
                    } else {
                        self.legal_moves.insert(sighting.square);
                    }

                    self.illegal_enemy_king_moves.insert(sighting.square);
                }
            }
            PieceKind::King => {
                for sighting in report.iter().flat_map(|(_, s)| s) {
                    match sighting.occupant {
                        Occupant::Ally => self.allies_in_legal_moves.insert(sighting.square),
                        Occupant::Enemy | Occupant::EnemyKing => {
                            self.legal_moves.insert(sighting.square)
                        }
                        Occupant::Empty => {
                            self.legal_moves.insert(sighting.square);
                            self.illegal_enemy_king_moves.insert(sighting.square);
                        }
                    }
                }
            }
            PieceKind::Pawn => {
                let on_home_rank = self.square.map(|sq| sq.rank()) == Some(self.color.pawn_rank());
                for (heading, sightings) in report {
                    if *heading == Heading::Forward {
                        for (i, sighting) in sightings.iter().enumerate() {
                            if sighting.occupant != Occupant::Empty || (i > 0 && !on_home_rank) {
                                break;
                            }

                            self.legal_moves.insert(sighting.square);
                        }

                        continue;
                    }

                    for sighting in sightings {
                        match sighting.occupant {
                            Occupant::Enemy | Occupant::EnemyKing => {
                                self.legal_moves.insert(sighting.square)
                            }
                            Occupant::Ally => self.allies_in_legal_moves.insert(sighting.square),
                            Occupant::Empty => {}
                        }

                        self.illegal_enemy_king_moves.insert(sighting.square);
                    }
                }
            }
        }
    }

    fn classify_ray(&mut self, sightings: &[Sighting]) {
        for (i, sighting) in sightings.iter().enumerate() {
            match sighting.occupant {
                Occupant::Empty => {
                    self.legal_moves.insert(sighting.square);
                    self.illegal_enemy_king_moves.insert(sighting.square);
                }
                Occupant::Ally => {
                    self.allies_in_legal_moves.insert(sighting.square);
                    return;
                }
                Occupant::Enemy => {
                    self.legal_moves.insert(sighting.square);
                    return;
                }
                Occupant::EnemyKing => {
                    // the king cannot step back along the line it is attacked on
                    self.legal_moves.insert(sighting.square);
                    if let Some(past) = sightings.get(i + 1) {
                        self.illegal_enemy_king_moves.insert(past.square);
                    }

                    return;
                }
            }
        }
    }

    /// Squares this piece denies to the enemy king.
    pub fn king_exclusion(&self) -> SquareSet {
        match self.variant {
            Variant::Pawn(_) => self.allies_in_legal_moves | self.illegal_enemy_king_moves,
            Variant::King(_) => self
                .move_pool()
                .into_iter()
                .flat_map(|(_, squares)| squares)
                .collect(),
            _ => self.legal_moves | self.allies_in_legal_moves | self.illegal_enemy_king_moves,
        }
    }
}
