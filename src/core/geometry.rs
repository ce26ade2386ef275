// Copyright 2017-2021 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Movement geometry: rays relative to a side of the board and knight jumps. Everything here
//! ignores occupancy; see [`crate::pieces`] for how rays are clipped against the position.

use lazy_static::lazy_static;

use crate::core::{squares, Color, Direction, Square};

/// A named group of squares in a piece's move pool. Headings are relative to the side that owns
/// the piece: white's forward is north, black's forward is south, and left is toward the a-file
/// for white and toward the h-file for black.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Heading {
    Forward,
    Backward,
    Left,
    Right,
    ForwardLeft,
    ForwardRight,
    BackwardLeft,
    BackwardRight,
    /// The knight's pseudo-direction; squares are jump targets rather than a ray.
    Jump,
}

impl Heading {
    pub const ORTHOGONAL: [Heading; 4] = [
        Heading::Forward,
        Heading::Backward,
        Heading::Left,
        Heading::Right,
    ];

    pub const DIAGONAL: [Heading; 4] = [
        Heading::ForwardLeft,
        Heading::ForwardRight,
        Heading::BackwardLeft,
        Heading::BackwardRight,
    ];

    pub const ALL: [Heading; 8] = [
        Heading::Forward,
        Heading::Backward,
        Heading::Left,
        Heading::Right,
        Heading::ForwardLeft,
        Heading::ForwardRight,
        Heading::BackwardLeft,
        Heading::BackwardRight,
    ];

    /// Returns the absolute direction this heading points in for the given side, or None for
    /// `Jump`.
    pub fn direction(self, color: Color) -> Option<Direction> {
        let dir = match self {
            Heading::Forward => Direction::North,
            Heading::Backward => Direction::South,
            Heading::Left => Direction::West,
            Heading::Right => Direction::East,
            Heading::ForwardLeft => Direction::NorthWest,
            Heading::ForwardRight => Direction::NorthEast,
            Heading::BackwardLeft => Direction::SouthWest,
            Heading::BackwardRight => Direction::SouthEast,
            Heading::Jump => return None,
        };

        match color {
            Color::White => Some(dir),
            Color::Black => Some(dir.reverse()),
        }
    }
}

/// Returns up to `limit` squares walking away from `origin` along `heading`, nearest first. The
/// walk stops at the edge of the board. `Jump` yields no squares; use [`knight_jumps`].
pub fn ray(origin: Square, color: Color, heading: Heading, limit: usize) -> Vec<Square> {
    let dir = match heading.direction(color) {
        Some(dir) => dir,
        None => return Vec::new(),
    };

    let mut squares = Vec::new();
    let mut cursor = origin;
    while squares.len() < limit {
        match cursor.towards(dir) {
            Some(next) => {
                squares.push(next);
                cursor = next;
            }
            None => break,
        }
    }

    squares
}

const KNIGHT_VECTORS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

struct KnightTable {
    table: Vec<Vec<Square>>,
}

impl KnightTable {
    fn new() -> KnightTable {
        let table = squares()
            .map(|sq| {
                KNIGHT_VECTORS
                    .iter()
                    .filter_map(|&(files, ranks)| sq.translate(files, ranks))
                    .collect()
            })
            .collect();

        KnightTable { table }
    }

    fn jumps(&self, sq: Square) -> &[Square] {
        &self.table[sq.index()]
    }
}

lazy_static! {
    static ref KNIGHT_TABLE: KnightTable = KnightTable::new();
}

/// Returns the squares a knight on `sq` could jump to on an empty board.
pub fn knight_jumps(sq: Square) -> &'static [Square] {
    KNIGHT_TABLE.jumps(sq)
}
