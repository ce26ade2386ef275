// Copyright 2017-2021 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Move notation: standard algebraic (`Nbd2`, `exd5`, `e8=Q`, `O-O`) and the long algebraic form
//! engines speak (`e2e4`, `e7e8q`).
//!
//! Standard algebraic notation only names the destination and enough of the origin to tell pieces
//! apart, so it has to be resolved against a position before it can be played.

use std::convert::TryFrom;

use thiserror::Error;

use crate::board::Board;
use crate::core::{File, PieceKind, Rank, Square};
use crate::piece::{king_home, CastleLayout, CastleSide};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum NotationError {
    #[error("unreadable move: {0:?}")]
    Invalid(String),
    #[error("no piece can play {0:?}")]
    NoCandidate(String),
    #[error("{text:?} could be played by more than one piece: {candidates:?}")]
    Ambiguous {
        text: String,
        candidates: Vec<Square>,
    },
    #[error("castling is not legal here: {0:?}")]
    CastlingNotLegal(String),
}

/// A move reduced to the squares it connects.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DecodedMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<char>,
}

/// Parses long algebraic notation: origin, destination and an optional promotion letter.
pub fn parse_long_algebraic(text: &str) -> Result<DecodedMove, NotationError> {
    let invalid = || NotationError::Invalid(text.to_owned());
    let from = text
        .get(0..2)
        .and_then(|s| s.parse::<Square>().ok())
        .ok_or_else(invalid)?;
    let to = text
        .get(2..4)
        .and_then(|s| s.parse::<Square>().ok())
        .ok_or_else(invalid)?;
    let promotion = match text.get(4..).ok_or_else(invalid)? {
        "" => None,
        rest => {
            let mut chars = rest.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if "qrbnQRBN".contains(c) => Some(c.to_ascii_lowercase()),
                _ => return Err(invalid()),
            }
        }
    };

    Ok(DecodedMove {
        from,
        to,
        promotion,
    })
}

/// A move in standard algebraic notation, parsed but not yet resolved against a position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct San {
    text: String,
    kind: PieceKind,
    from_file: Option<File>,
    from_rank: Option<Rank>,
    to: Option<Square>,
    promotion: Option<char>,
    castle: Option<CastleSide>,
}

impl San {
    pub fn parse(text: &str) -> Result<San, NotationError> {
        let invalid = || NotationError::Invalid(text.to_owned());
        let mut body = text
            .trim()
            .trim_end_matches(|c: char| matches!(c, '+' | '#' | '†' | '!' | '?'));
        if let Some(rest) = body.strip_suffix("e.p.") {
            body = rest.trim_end();
        }

        let mut san = San {
            text: text.to_owned(),
            kind: PieceKind::King,
            from_file: None,
            from_rank: None,
            to: None,
            promotion: None,
            castle: None,
        };

        match body {
            "O-O" | "0-0" => {
                san.castle = Some(CastleSide::Kingside);
                return Ok(san);
            }
            "O-O-O" | "0-0-0" => {
                san.castle = Some(CastleSide::Queenside);
                return Ok(san);
            }
            _ => {}
        }

        let mut chars: Vec<char> = body.chars().collect();

        // promotion: e8=Q, e8(Q), e8/Q or e8Q
        if chars.last() == Some(&')') {
            let letter = match chars.as_slice() {
                [.., '(', letter, ')'] => *letter,
                _ => return Err(invalid()),
            };
            san.promotion = Some(letter);
            chars.truncate(chars.len() - 3);
        } else if chars.len() >= 2 && matches!(chars[chars.len() - 2], '=' | '/') {
            san.promotion = chars.last().copied();
            chars.truncate(chars.len() - 2);
        } else if chars.len() >= 3
            && matches!(chars[chars.len() - 1], 'Q' | 'R' | 'B' | 'N')
            && chars[chars.len() - 2].is_ascii_digit()
        {
            san.promotion = chars.pop();
        }

        san.kind = match chars.first() {
            Some(&c) if matches!(c, 'K' | 'Q' | 'R' | 'B' | 'N') => {
                chars.remove(0);
                PieceKind::try_from(c).map_err(|_| invalid())?
            }
            _ => PieceKind::Pawn,
        };

        if chars.len() < 2 {
            return Err(invalid());
        }

        let destination: String = chars[chars.len() - 2..].iter().collect();
        san.to = Some(destination.parse().map_err(|_| invalid())?);
        for &c in &chars[..chars.len() - 2] {
            match c {
                'x' | ':' | '-' => {}
                'a'..='h' => san.from_file = File::try_from(c).ok(),
                '1'..='8' => san.from_rank = Rank::try_from(c).ok(),
                _ => return Err(invalid()),
            }
        }

        Ok(san)
    }

    /// Finds the one move in `legal` that this notation describes for the side to move.
    pub fn resolve(
        &self,
        board: &Board,
        legal: &[(Square, Square)],
    ) -> Result<DecodedMove, NotationError> {
        let side = board.side_to_move();
        if let Some(castle) = self.castle {
            let from = king_home(side);
            let to = CastleLayout::of(side, castle).king_destination();
            let is_king = board
                .piece_at(from)
                .map_or(false, |p| p.is_king() && p.color() == side);
            if is_king && legal.contains(&(from, to)) {
                return Ok(DecodedMove {
                    from,
                    to,
                    promotion: None,
                });
            }

            return Err(NotationError::CastlingNotLegal(self.text.clone()));
        }

        let target = self
            .to
            .ok_or_else(|| NotationError::Invalid(self.text.clone()))?;
        let candidates: Vec<Square> = legal
            .iter()
            .filter(|&&(from, to)| {
                to == target
                    && board
                        .piece_at(from)
                        .map_or(false, |p| p.kind() == self.kind && p.color() == side)
                    && self.from_file.map_or(true, |file| from.file() == file)
                    && self.from_rank.map_or(true, |rank| from.rank() == rank)
            })
            .map(|&(from, _)| from)
            .collect();

        match candidates.len() {
            0 => Err(NotationError::NoCandidate(self.text.clone())),
            1 => Ok(DecodedMove {
                from: candidates[0],
                to: target,
                promotion: self.promotion,
            }),
            _ => Err(NotationError::Ambiguous {
                text: self.text.clone(),
                candidates,
            }),
        }
    }
}

/// Strips a leading move number (`1.`, `12...`) from a PGN token.
pub fn strip_move_number(token: &str) -> &str {
    let digits = token
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(token.len());
    if digits > 0 && token[digits..].starts_with('.') {
        token[digits..].trim_start_matches('.')
    } else {
        token
    }
}

/// Returns true for PGN game-termination markers.
pub fn is_result(token: &str) -> bool {
    matches!(token, "1-0" | "0-1" | "1/2-1/2" | "*")
}
