// Copyright 2017-2021 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Reading and writing FEN, the one-line text notation for chess positions. FEN is parsed into
//! and built from a [`StateRecord`]; the board never sees the text.

use std::convert::TryFrom;
use std::fmt::Write;

use thiserror::Error;
use tracing::warn;

use crate::core::{self, parse_piece_char, CastleStatus, Color, File, PieceKind, Rank, Square};
use crate::state::{CastleRights, PieceRecord, StateRecord};

pub const START_POSITION: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Possible errors that can arise when parsing a FEN string.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum FenParseError {
    #[error("unexpected char: {0}")]
    UnexpectedChar(char),
    #[error("unexpected EOF while reading")]
    UnexpectedEnd,
    #[error("invalid digit")]
    InvalidDigit,
    #[error("file does not sum to 8")]
    FileDoesNotSumToEight,
    #[error("unknown piece: {0}")]
    UnknownPiece(char),
    #[error("invalid side to move")]
    InvalidSideToMove,
    #[error("invalid castle")]
    InvalidCastle,
    #[error("castle right listed twice: {0}")]
    DuplicateCastle(char),
    #[error("invalid en-passant")]
    InvalidEnPassant,
    #[error("empty halfmove")]
    EmptyHalfmove,
    #[error("invalid halfmove")]
    InvalidHalfmove,
    #[error("empty fullmove")]
    EmptyFullmove,
    #[error("invalid fullmove")]
    InvalidFullmove,
}

type Stream<'a> = std::iter::Peekable<std::str::Chars<'a>>;

fn eat(iter: &mut Stream<'_>, expected: char) -> Result<(), FenParseError> {
    match iter.next() {
        Some(c) if c == expected => Ok(()),
        Some(c) => Err(FenParseError::UnexpectedChar(c)),
        None => Err(FenParseError::UnexpectedEnd),
    }
}

fn advance(iter: &mut Stream<'_>) {
    let _ = iter.next();
}

fn peek(iter: &mut Stream<'_>) -> Result<char, FenParseError> {
    iter.peek().copied().ok_or(FenParseError::UnexpectedEnd)
}

fn eat_placement(iter: &mut Stream<'_>) -> Result<Vec<PieceRecord>, FenParseError> {
    let mut pieces = Vec::new();
    for rank in core::ranks().rev() {
        let mut file = 0;
        while file <= 7 {
            let c = peek(iter)?;
            // digits 1 through 8 indicate empty squares.
            if c.is_ascii_digit() {
                if !('1'..='8').contains(&c) {
                    return Err(FenParseError::InvalidDigit);
                }

                file += c as u8 - b'0';
                if file > 8 {
                    return Err(FenParseError::FileDoesNotSumToEight);
                }

                advance(iter);
                continue;
            }

            // if it's not a digit, it represents a piece.
            let (color, kind) =
                parse_piece_char(c).map_err(|_| FenParseError::UnknownPiece(c))?;
            let file_idx =
                File::try_from(file).map_err(|_| FenParseError::FileDoesNotSumToEight)?;
            pieces.push(PieceRecord::new(kind, color, Square::of(rank, file_idx)));
            advance(iter);
            file += 1;
        }

        if rank != core::RANK_1 {
            eat(iter, '/')?;
        }
    }

    Ok(pieces)
}

fn eat_side_to_move(iter: &mut Stream<'_>) -> Result<Color, FenParseError> {
    let side = match peek(iter)? {
        'w' => Color::White,
        'b' => Color::Black,
        _ => return Err(FenParseError::InvalidSideToMove),
    };

    advance(iter);
    Ok(side)
}

fn eat_castle_status(iter: &mut Stream<'_>) -> Result<CastleStatus, FenParseError> {
    if peek(iter)? == '-' {
        advance(iter);
        return Ok(CastleStatus::NONE);
    }

    let mut status = CastleStatus::NONE;
    loop {
        let c = peek(iter)?;
        let flag = match c {
            'K' => CastleStatus::WHITE_KINGSIDE,
            'k' => CastleStatus::BLACK_KINGSIDE,
            'Q' => CastleStatus::WHITE_QUEENSIDE,
            'q' => CastleStatus::BLACK_QUEENSIDE,
            ' ' if !status.is_empty() => break,
            _ => return Err(FenParseError::InvalidCastle),
        };

        if status.contains(flag) {
            return Err(FenParseError::DuplicateCastle(c));
        }

        status |= flag;
        advance(iter);
    }

    Ok(status)
}

fn eat_en_passant(iter: &mut Stream<'_>) -> Result<Option<Square>, FenParseError> {
    let c = peek(iter)?;
    if c == '-' {
        advance(iter);
        return Ok(None);
    }

    let file = File::try_from(c).map_err(|_| FenParseError::InvalidEnPassant)?;
    advance(iter);
    let rank = Rank::try_from(peek(iter)?).map_err(|_| FenParseError::InvalidEnPassant)?;
    if rank != core::RANK_3 && rank != core::RANK_6 {
        return Err(FenParseError::InvalidEnPassant);
    }

    advance(iter);
    Ok(Some(Square::of(rank, file)))
}

fn eat_number(iter: &mut Stream<'_>) -> String {
    let mut buf = String::new();
    while let Some(&c) = iter.peek() {
        if !c.is_ascii_digit() {
            break;
        }

        buf.push(c);
        advance(iter);
    }

    buf
}

fn eat_halfmove(iter: &mut Stream<'_>) -> Result<u32, FenParseError> {
    peek(iter)?;
    let buf = eat_number(iter);
    if buf.is_empty() {
        return Err(FenParseError::EmptyHalfmove);
    }

    buf.parse::<u32>()
        .map_err(|_| FenParseError::InvalidHalfmove)
}

fn eat_fullmove(iter: &mut Stream<'_>) -> Result<u32, FenParseError> {
    peek(iter)?;
    let buf = eat_number(iter);
    if buf.is_empty() {
        return Err(FenParseError::EmptyFullmove);
    }

    if let Some(c) = iter.next() {
        return Err(FenParseError::UnexpectedChar(c));
    }

    buf.parse::<u32>()
        .map_err(|_| FenParseError::InvalidFullmove)
}

/// Parses FEN text into a state record. Castling letters go on the king of that color, and the
/// en passant square goes on the pawn that just made the double step.
pub fn parse(fen: &str) -> Result<StateRecord, FenParseError> {
    let iter = &mut fen.chars().peekable();
    let mut pieces = eat_placement(iter)?;
    eat(iter, ' ')?;
    let side_to_move = eat_side_to_move(iter)?;
    eat(iter, ' ')?;
    let castle_status = eat_castle_status(iter)?;
    eat(iter, ' ')?;
    let en_passant = eat_en_passant(iter)?;
    eat(iter, ' ')?;
    let halfmove_clock = eat_halfmove(iter)?;
    eat(iter, ' ')?;
    let fullmove_number = eat_fullmove(iter)?;

    for king in pieces.iter_mut().filter(|p| p.kind == PieceKind::King) {
        king.castling = Some(CastleRights {
            kingside: castle_status.contains(CastleStatus::kingside(king.color)),
            queenside: castle_status.contains(CastleStatus::queenside(king.color)),
        });
    }

    if let Some(target) = en_passant {
        // the pawn that double-stepped belongs to the side that just moved
        let mover = side_to_move.toggle();
        let pawn_square = match mover {
            Color::White => target.translate(0, 1),
            Color::Black => target.translate(0, -1),
        };

        let pawn = pieces.iter_mut().find(|p| {
            Some(p.square) == pawn_square && p.kind == PieceKind::Pawn && p.color == mover
        });
        match pawn {
            Some(pawn) => pawn.en_passant = Some(target),
            None => warn!(%target, "en passant square has no matching pawn, ignoring"),
        }
    }

    Ok(StateRecord {
        pieces,
        side_to_move,
        halfmove_clock,
        fullmove_number,
    })
}

/// Builds FEN text from a state record.
pub fn build(record: &StateRecord) -> String {
    let mut board = [None; 64];
    for piece in &record.pieces {
        board[piece.square.index()] = Some(piece.kind.as_char(piece.color));
    }

    let mut buf = String::new();
    for rank in core::ranks().rev() {
        let mut empty_squares = 0;
        for file in core::files() {
            let square = Square::of(rank, file);
            if let Some(c) = board[square.index()] {
                if empty_squares != 0 {
                    write!(&mut buf, "{}", empty_squares).unwrap();
                }
                buf.push(c);
                empty_squares = 0;
            } else {
                empty_squares += 1;
            }
        }

        if empty_squares != 0 {
            write!(&mut buf, "{}", empty_squares).unwrap();
        }

        if rank != core::RANK_1 {
            buf.push('/');
        }
    }

    buf.push(' ');
    match record.side_to_move {
        Color::White => buf.push('w'),
        Color::Black => buf.push('b'),
    }
    buf.push(' ');
    let status = record.castle_status();
    if status.is_empty() {
        buf.push('-');
    }
    for (flag, c) in [
        (CastleStatus::WHITE_KINGSIDE, 'K'),
        (CastleStatus::WHITE_QUEENSIDE, 'Q'),
        (CastleStatus::BLACK_KINGSIDE, 'k'),
        (CastleStatus::BLACK_QUEENSIDE, 'q'),
    ] {
        if status.contains(flag) {
            buf.push(c);
        }
    }
    buf.push(' ');
    if let Some(ep_square) = record.en_passant_square() {
        write!(&mut buf, "{}", ep_square).unwrap();
    } else {
        buf.push('-');
    }
    write!(
        &mut buf,
        " {} {}",
        record.halfmove_clock, record.fullmove_number
    )
    .unwrap();
    buf
}

#[cfg(test)]
mod tests {
    mod parse {
        use crate::core::*;
        use crate::fen::{parse, FenParseError, START_POSITION};

        #[test]
        fn fen_smoke() {
            let record = parse("8/8/8/8/8/8/8/8 w - - 0 0").unwrap();

            // white's turn to move.
            assert_eq!(Color::White, record.side_to_move);
            assert!(record.pieces.is_empty());
            assert!(record.castle_status().is_empty());
            assert!(record.en_passant_square().is_none());
            assert_eq!(0, record.halfmove_clock);
            assert_eq!(0, record.fullmove_number);
        }

        #[test]
        fn starting_position() {
            let record = parse(START_POSITION).unwrap();
            assert_eq!(record.pieces.len(), 32);
            let at = |sq: Square| record.pieces.iter().find(|p| p.square == sq).unwrap();
            assert_eq!(at(A8).kind, PieceKind::Rook);
            assert_eq!(at(A8).color, Color::Black);
            assert_eq!(at(E1).kind, PieceKind::King);
            assert_eq!(at(D1).kind, PieceKind::Queen);
            assert_eq!(at(G2).kind, PieceKind::Pawn);
            assert_eq!(at(G2).color, Color::White);
            assert_eq!(
                record.castle_status(),
                CastleStatus::WHITE | CastleStatus::BLACK
            );
        }

        #[test]
        fn en_passant_attaches_to_pawn() {
            let record = parse("8/8/8/2k5/2pP4/8/B7/4K3 b - d3 5 3").unwrap();
            let pawn = record.pieces.iter().find(|p| p.square == D4).unwrap();
            assert_eq!(pawn.en_passant, Some(D3));
            assert_eq!(record.en_passant_square(), Some(D3));
        }

        #[test]
        fn orphan_en_passant_is_dropped() {
            let record = parse("4k3/8/8/8/8/8/8/4K3 w - e6 0 1").unwrap();
            assert_eq!(record.en_passant_square(), None);
        }

        #[test]
        fn empty() {
            assert_eq!(parse("").unwrap_err(), FenParseError::UnexpectedEnd);
        }

        #[test]
        fn no_fields() {
            let err = parse("8/8/1P2K3/8/2n5/1q6/8/5k2").unwrap_err();
            assert_eq!(err, FenParseError::UnexpectedEnd);
        }

        #[test]
        fn unknown_piece() {
            let err = parse("z7/8/8/8/8/8/8/8 w - - 0 0").unwrap_err();
            assert_eq!(FenParseError::UnknownPiece('z'), err);
            assert!(parse("defo_invalid").is_err());
        }

        #[test]
        fn invalid_digit() {
            let err = parse("9/8/8/8/8/8/8/8 w - - 0 0").unwrap_err();
            assert_eq!(FenParseError::InvalidDigit, err);
        }

        #[test]
        fn not_sum_to_8() {
            let err = parse("pppp5/8/8/8/8/8/8/8 w - - 0 0").unwrap_err();
            assert_eq!(FenParseError::FileDoesNotSumToEight, err);
        }

        #[test]
        fn too_many_squares_in_rank() {
            let err = parse("r6r1b2k1bq/8/8/7B/8/8/R3K2R b QK - 3 2").unwrap_err();
            assert_eq!(FenParseError::UnexpectedChar('1'), err);
        }

        #[test]
        fn bad_side_to_move() {
            let err = parse("8/8/8/8/8/8/8/8 c - - 0 0").unwrap_err();
            assert_eq!(FenParseError::InvalidSideToMove, err);
        }

        #[test]
        fn bad_castle_status() {
            let err = parse("8/8/8/8/8/8/8/8 w a - 0 0").unwrap_err();
            assert_eq!(FenParseError::InvalidCastle, err);
            let err = parse("2r5/3pk3/8/2P5/8/2K5/8/8 w pQ - 5 4").unwrap_err();
            assert_eq!(FenParseError::InvalidCastle, err);
        }

        #[test]
        fn duplicate_castle() {
            let err = parse("r3k2r/8/8/8/8/8/8/R3K2R w KKQ - 0 1").unwrap_err();
            assert_eq!(FenParseError::DuplicateCastle('K'), err);
        }

        #[test]
        fn bad_en_passant() {
            let err = parse("8/8/8/8/8/8/8/8 w - 88 0 0").unwrap_err();
            assert_eq!(FenParseError::InvalidEnPassant, err);
            let err = parse("3k4/3p4/8/K1P4r/8/8/8/8 b - d4 0 1").unwrap_err();
            assert_eq!(FenParseError::InvalidEnPassant, err);
        }

        #[test]
        fn empty_halfmove() {
            let err = parse("8/8/8/8/8/8/8/8 w - - q 0").unwrap_err();
            assert_eq!(FenParseError::EmptyHalfmove, err);
        }

        #[test]
        fn invalid_halfmove() {
            let err = parse("8/8/8/8/8/8/8/8 w - - 4294967296 0").unwrap_err();
            assert_eq!(FenParseError::InvalidHalfmove, err);
        }

        #[test]
        fn empty_fullmove() {
            let err = parse("8/8/8/8/8/8/8/8 w - - 0 q").unwrap_err();
            assert_eq!(FenParseError::EmptyFullmove, err);
        }

        #[test]
        fn fullmove_early_end() {
            let err = parse("8/8/8/8/8/8/8/8 w - - 0").unwrap_err();
            assert_eq!(FenParseError::UnexpectedEnd, err);
        }

        #[test]
        fn invalid_fullmove() {
            let err = parse("8/8/8/8/8/8/8/8 w - - 0 4294967296").unwrap_err();
            assert_eq!(FenParseError::InvalidFullmove, err);
        }

        #[test]
        fn trailing_garbage() {
            let err = parse("8/8/8/8/8/8/8/8 w - - 0 1 x").unwrap_err();
            assert_eq!(FenParseError::UnexpectedChar(' '), err);
        }
    }

    mod build {
        use crate::fen::{build, parse, START_POSITION};

        #[test]
        fn start_position_roundtrip() {
            let record = parse(START_POSITION).unwrap();
            assert_eq!(build(&record), START_POSITION);
        }

        #[test]
        fn castling_letters_are_ordered() {
            let record = parse("r3k2r/1b4bq/8/8/8/8/7B/R3K2R w qkQK - 0 1").unwrap();
            assert_eq!(build(&record), "r3k2r/1b4bq/8/8/8/8/7B/R3K2R w KQkq - 0 1");
        }

        #[test]
        fn en_passant_roundtrip() {
            let fen = "8/8/1k6/2b5/2pP4/8/5K2/8 b - d3 0 1";
            assert_eq!(build(&parse(fen).unwrap()), fen);
        }
    }
}
