// Copyright 2017-2021 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A game in progress: the position, the pieces on it, both players and the move clocks.
//!
//! Every call to [`Board::turn`] either commits a move completely or leaves the board exactly as
//! it found it. Moves are first played tentatively with a probe update; if the mover's own king
//! ends up in check the move is reverted and reported as rejected.

mod r#move;

use std::fmt;

use derive_more::Display;
use thiserror::Error;
use tracing::{debug, info};

pub use self::r#move::{Move, MoveError, MoveState, RookShift};

use crate::core::{self, Color, PieceKind, Square, SquareSet};
use crate::fen::{self, FenParseError, START_POSITION};
use crate::notation::{self, NotationError, San};
use crate::piece::{Piece, PieceId, ScoutReport};
use crate::pieces::{Pieces, Positions, UpdateMode};
use crate::player::{PlayerKind, Players};
use crate::state::{CastleRights, PieceRecord, StateError, StateRecord};
use crate::uci::EngineError;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("{to} is not a legal destination for the piece on {from}")]
    InvalidDestination { from: Square, to: Square },
    #[error("no piece on {0}")]
    NoPieceAt(Square),
    #[error("the king on {0} cannot be captured")]
    KingCapture(Square),
    #[error("the piece on {square} is {color}, but it is {to_move}'s turn")]
    WrongSide {
        square: Square,
        color: Color,
        to_move: Color,
    },
    #[error("cannot promote to {0:?}, expected one of q, r, b, n")]
    InvalidPromotionChoice(char),
    #[error("pawns cannot promote to a king")]
    KingPromotion,
    #[error("no pawn is waiting for promotion")]
    NoPendingPromotion,
    #[error("{notation} leaves the king in check from {attackers:?}")]
    KingLeftInCheck {
        notation: String,
        attackers: Vec<Square>,
    },
    #[error(transparent)]
    DoubleRevert(#[from] MoveError),
    #[error("malformed state: {0}")]
    MalformedState(#[from] StateError),
    #[error("invalid FEN: {0}")]
    Fen(#[from] FenParseError),
    #[error(transparent)]
    Notation(#[from] NotationError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// The outcome of the most recent turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LastMove {
    Played,
    /// The move would have left the mover's king in check from these squares.
    Rejected { attackers: Vec<Square> },
}

impl LastMove {
    pub fn is_success(&self) -> bool {
        matches!(self, LastMove::Played)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display)]
pub enum Endgame {
    #[display(fmt = "checkmate")]
    Checkmate,
    #[display(fmt = "stalemate")]
    Stalemate,
}

fn promotion_kind(choice: char) -> Result<PieceKind, BoardError> {
    match choice.to_ascii_lowercase() {
        'q' => Ok(PieceKind::Queen),
        'r' => Ok(PieceKind::Rook),
        'b' => Ok(PieceKind::Bishop),
        'n' => Ok(PieceKind::Knight),
        'k' => Err(BoardError::KingPromotion),
        _ => Err(BoardError::InvalidPromotionChoice(choice)),
    }
}

#[derive(Debug)]
pub struct Board {
    positions: Positions,
    pieces: Pieces,
    players: Players,
    halfmove_clock: u32,
    fullmove_number: u32,
    last_move: Option<LastMove>,
}

impl Board {
    /// Constructs a new board at the starting position, with two human players.
    pub fn new() -> Board {
        Board::from_fen(START_POSITION).expect("the start position is a valid position")
    }

    pub fn from_record(record: &StateRecord) -> Result<Board, BoardError> {
        let mut board = Board {
            positions: Positions::new(),
            pieces: Pieces::new(),
            players: Players::new(),
            halfmove_clock: 0,
            fullmove_number: 1,
            last_move: None,
        };

        board.reset(Some(record))?;
        Ok(board)
    }

    pub fn from_fen(text: &str) -> Result<Board, BoardError> {
        let record = fen::parse(text)?;
        Board::from_record(&record)
    }

    /// Replaces the position with `record`, or with the starting position when there is none.
    /// Players keep their kinds; the side to move comes from the record. On error the board is
    /// left untouched.
    pub fn reset(&mut self, record: Option<&StateRecord>) -> Result<(), BoardError> {
        let start;
        let record = match record {
            Some(record) => record,
            None => {
                start = fen::parse(START_POSITION)?;
                &start
            }
        };

        record.validate()?;
        let mut positions = Positions::new();
        let mut pieces = Pieces::new();
        for entry in &record.pieces {
            let mut piece = Piece::new(entry.kind, entry.color, Some(entry.square));
            if let (Some(rights), Some(king)) = (entry.castling, piece.king_mut()) {
                king.kingside.allowed = rights.kingside;
                king.queenside.allowed = rights.queenside;
            }

            if let (Some(target), Some(pawn)) = (entry.en_passant, piece.pawn_mut()) {
                pawn.double_move_target = Some(target);
            }

            let id = pieces.insert(piece);
            positions.set(entry.square, Some(id));
        }

        pieces.update(&positions, UpdateMode::Full);
        let idle = record.side_to_move.toggle();
        let idle_in_check = pieces
            .king(idle)
            .and_then(|id| pieces.get(id).king())
            .map_or(false, |state| state.in_check);
        if idle_in_check {
            return Err(StateError::IdleKingInCheck(idle).into());
        }

        self.positions = positions;
        self.pieces = pieces;
        self.players.set_current(record.side_to_move);
        self.halfmove_clock = record.halfmove_clock;
        self.fullmove_number = record.fullmove_number;
        self.last_move = None;
        self.update();
        Ok(())
    }

    /// A compact diagram of the position, with chess symbols instead of FEN letters when
    /// `unicode` is set and rank and file labels when `labels` is set.
    pub fn diagram(&self, unicode: bool, labels: bool) -> Diagram<'_> {
        Diagram {
            board: self,
            unicode,
            labels,
        }
    }

    /// Exports the position, pieces listed from a8 to h1.
    pub fn to_record(&self) -> StateRecord {
        let mut pieces = Vec::new();
        for rank in core::ranks().rev() {
            for file in core::files() {
                let square = Square::of(rank, file);
                let piece = match self.piece_at(square) {
                    Some(piece) => piece,
                    None => continue,
                };

                let mut record = PieceRecord::new(piece.kind(), piece.color(), square);
                if let Some(king) = piece.king() {
                    record.castling = Some(CastleRights {
                        kingside: king.kingside.allowed,
                        queenside: king.queenside.allowed,
                    });
                }

                if let Some(pawn) = piece.pawn() {
                    record.en_passant = pawn.double_move_target;
                }

                pieces.push(record);
            }
        }

        StateRecord {
            pieces,
            side_to_move: self.side_to_move(),
            halfmove_clock: self.halfmove_clock,
            fullmove_number: self.fullmove_number,
        }
    }

    pub fn as_fen(&self) -> String {
        fen::build(&self.to_record())
    }

    /// Recomputes every piece's move sets, castling rights and en passant windows.
    pub fn update(&mut self) {
        self.pieces.update(&self.positions, UpdateMode::Full);
    }

    pub fn is_occupied(&self, square: Square) -> bool {
        self.positions.is_occupied(square)
    }

    pub fn piece_at(&self, square: Square) -> Option<&Piece> {
        self.positions.get(square).map(|id| self.pieces.get(id))
    }

    /// Every piece in play.
    pub fn pieces(&self) -> impl Iterator<Item = &Piece> + '_ {
        self.pieces.iter().map(|(_, piece)| piece)
    }

    /// The destinations of the piece on `square`. These are pseudo-legal: a move that exposes the
    /// mover's own king is still listed here and is only caught by [`Board::turn`].
    pub fn legal_moves(&self, square: Square) -> SquareSet {
        self.piece_at(square)
            .map_or(SquareSet::empty(), |piece| piece.legal_moves())
    }

    /// Every pseudo-legal move of the side to move.
    pub fn candidate_moves(&self) -> Vec<(Square, Square)> {
        self.pieces
            .of_color(self.side_to_move())
            .filter_map(|(_, piece)| piece.square().map(|from| (from, piece.legal_moves())))
            .flat_map(|(from, legal)| legal.into_iter().map(move |to| (from, to)))
            .collect()
    }

    pub fn scout(&self, square: Square) -> Option<ScoutReport> {
        self.positions
            .get(square)
            .map(|id| self.pieces.scout(&self.positions, id))
    }

    /// Squares of the pieces giving check to the king of `color`.
    pub fn check_attackers(&self, color: Color) -> Vec<Square> {
        self.king(color)
            .and_then(|king| king.king())
            .map_or_else(Vec::new, |state| self.squares_of(&state.checked_by))
    }

    pub fn is_in_check(&self, color: Color) -> bool {
        self.king(color)
            .and_then(|king| king.king())
            .map_or(false, |state| state.in_check)
    }

    pub fn king(&self, color: Color) -> Option<&Piece> {
        self.pieces.king(color).map(|id| self.pieces.get(id))
    }

    /// The square of a pawn that reached the last rank without a promotion choice.
    pub fn pawn_needs_promotion(&self) -> Option<Square> {
        self.pieces
            .promotion_pending()
            .and_then(|id| self.pieces.get(id).square())
    }

    pub fn promoted_pieces(&self) -> impl Iterator<Item = &Piece> + '_ {
        self.pieces.promoted().map(|(_, piece)| piece)
    }

    /// Pieces captured or promoted away, in the order they left the board.
    pub fn lost_pieces(&self) -> impl Iterator<Item = &Piece> + '_ {
        self.pieces.lost().map(|(_, piece)| piece)
    }

    pub fn side_to_move(&self) -> Color {
        self.players.to_move()
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    pub fn last_move(&self) -> Option<&LastMove> {
        self.last_move.as_ref()
    }

    pub fn players(&self) -> &Players {
        &self.players
    }

    pub fn players_mut(&mut self) -> &mut Players {
        &mut self.players
    }

    pub fn set_player(&mut self, color: Color, kind: PlayerKind) {
        self.players.set(color, kind);
    }

    fn holds_king(&self, square: Square) -> bool {
        self.piece_at(square).map_or(false, Piece::is_king)
    }

    fn squares_of(&self, ids: &[PieceId]) -> Vec<Square> {
        ids.iter()
            .filter_map(|&id| self.pieces.get(id).square())
            .collect()
    }

    /// Plays a move with a probe update and reports whether it leaves the mover in check. The
    /// move is left applied; the caller either commits or reverts it.
    fn tentative(
        &mut self,
        piece: PieceId,
        to: Square,
        promotion: Option<PieceKind>,
    ) -> (Move, Option<Vec<Square>>) {
        let color = self.pieces.get(piece).color();
        let mov = Move::apply(&mut self.positions, &mut self.pieces, piece, to, promotion);
        self.pieces.mask(mov.pieces_to_remove());
        self.pieces.update(&self.positions, UpdateMode::MateProbe);
        let attackers = self
            .king(color)
            .and_then(|king| king.king())
            .filter(|state| state.in_check)
            .map(|state| self.squares_of(&state.checked_by));
        self.pieces.unmask_all();
        (mov, attackers)
    }

    /// Moves the piece on `from` to `to`. `promotion` names the piece a pawn becomes on the last
    /// rank; without it the pawn is left waiting for [`Board::promote_pawn`].
    ///
    /// Returns [`LastMove::Rejected`] if the move would leave the mover's king in check. Either
    /// way the board is consistent when this returns.
    pub fn turn(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<char>,
    ) -> Result<LastMove, BoardError> {
        let id = self.positions.get(from).ok_or(BoardError::NoPieceAt(from))?;
        let piece = self.pieces.get(id);
        let to_move = self.side_to_move();
        if piece.color() != to_move {
            return Err(BoardError::WrongSide {
                square: from,
                color: piece.color(),
                to_move,
            });
        }

        if !piece.legal_moves().contains(to) {
            return Err(BoardError::InvalidDestination { from, to });
        }

        if self.holds_king(to) {
            return Err(BoardError::KingCapture(to));
        }

        let promotion = promotion.map(promotion_kind).transpose()?;
        self.pieces.reset_promotion();
        let (mut mov, attackers) = self.tentative(id, to, promotion);
        if let Some(attackers) = attackers {
            mov.revert(&mut self.positions, &mut self.pieces)?;
            self.update();
            info!(%from, %to, ?attackers, "move rejected, king would be in check");
            let outcome = LastMove::Rejected { attackers };
            self.last_move = Some(outcome.clone());
            return Ok(outcome);
        }

        mov.post_move(&mut self.positions, &mut self.pieces);
        for &removed in mov.pieces_to_remove() {
            self.pieces.remove(removed);
        }

        for &added in mov.pieces_to_add() {
            self.pieces.add(added);
        }

        self.pieces.reset_en_passant();
        mov.record_double_step(&mut self.pieces);
        if mov.switches_players() {
            self.players.switch();
            if self.players.to_move() == Color::White {
                self.fullmove_number += 1;
            }
        }

        if mov.is_capture() || mov.is_pawn_advance() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }

        self.update();
        debug!(%from, %to, capture = mov.is_capture(), "move played");
        self.last_move = Some(LastMove::Played);
        Ok(LastMove::Played)
    }

    /// Replaces the pawn waiting on the last rank with a piece of kind `choice`.
    pub fn promote_pawn(&mut self, choice: char) -> Result<(), BoardError> {
        let kind = promotion_kind(choice)?;
        let pawn = self
            .pieces
            .promotion_pending()
            .ok_or(BoardError::NoPendingPromotion)?;
        let (color, square) = {
            let pawn = self.pieces.get(pawn);
            (pawn.color(), pawn.square().ok_or(BoardError::NoPendingPromotion)?)
        };

        let mut promoted = Piece::new(kind, color, Some(square));
        promoted.promoted = true;
        self.pieces.reset_promotion();
        self.pieces.remove(pawn);
        let id = self.pieces.insert(promoted);
        self.positions.set(square, Some(id));
        self.update();
        debug!(%square, %kind, "pawn promoted");
        Ok(())
    }

    /// Every move of the side to move that does not leave its own king in check. The board is
    /// back in its original state afterwards.
    pub fn safe_moves(&mut self) -> Result<Vec<(Square, Square)>, BoardError> {
        self.update();
        let side = self.side_to_move();
        if self.king(side).is_none() {
            return Err(StateError::MissingKing(side).into());
        }

        let candidates: Vec<(PieceId, Square, SquareSet)> = self
            .pieces
            .of_color(side)
            .filter_map(|(id, piece)| piece.square().map(|sq| (id, sq, piece.legal_moves())))
            .collect();

        let mut safe = Vec::new();
        for (id, from, destinations) in candidates {
            for to in destinations {
                if self.holds_king(to) {
                    continue;
                }

                let (mut mov, attackers) = self.tentative(id, to, None);
                mov.revert(&mut self.positions, &mut self.pieces)?;
                self.pieces.update(&self.positions, UpdateMode::MateProbe);
                if attackers.is_none() {
                    safe.push((from, to));
                }
            }
        }

        self.update();
        Ok(safe)
    }

    /// Checks whether the side to move has any move that keeps its king safe.
    pub fn check_endgame(&mut self) -> Result<Option<Endgame>, BoardError> {
        if !self.safe_moves()?.is_empty() {
            return Ok(None);
        }

        let side = self.side_to_move();
        let endgame = if self.is_in_check(side) {
            Endgame::Checkmate
        } else {
            Endgame::Stalemate
        };

        info!(%side, %endgame, "game over");
        Ok(Some(endgame))
    }

    /// Asks the current player's move suggester for a move and plays it. Does nothing when a
    /// human is to move.
    pub fn do_computer_move(&mut self) -> Result<Option<LastMove>, BoardError> {
        let fen = self.as_fen();
        let suggestion = match self.players.current_mut().suggester() {
            Some(suggester) => suggester.best_move(&fen)?,
            None => return Ok(None),
        };

        let decoded = notation::parse_long_algebraic(&suggestion)?;
        debug!(%suggestion, "computer move");
        self.turn(decoded.from, decoded.to, decoded.promotion)
            .map(Some)
    }

    /// Plays one move in standard algebraic notation.
    pub fn play_move(&mut self, text: &str) -> Result<LastMove, BoardError> {
        let san = San::parse(text)?;
        let safe = self.safe_moves()?;
        let decoded = match san.resolve(self, &safe) {
            // fall back to moves that expose the king, so the turn reports who attacks it
            Err(NotationError::NoCandidate(_)) => san.resolve(self, &self.candidate_moves())?,
            other => other?,
        };

        self.turn(decoded.from, decoded.to, decoded.promotion)
    }

    /// Plays whitespace-separated moves in standard algebraic notation, stopping at the first
    /// one that cannot be played.
    pub fn play(&mut self, text: &str) -> Result<(), BoardError> {
        for token in text.split_whitespace() {
            if token == "e.p." {
                continue;
            }

            self.play_checked(token)?;
        }

        Ok(())
    }

    /// Plays the movetext of a PGN game. Move numbers and the result marker are skipped.
    pub fn play_pgn(&mut self, text: &str) -> Result<(), BoardError> {
        for token in text.split_whitespace() {
            let token = notation::strip_move_number(token);
            if token.is_empty() || token == "e.p." || notation::is_result(token) {
                continue;
            }

            self.play_checked(token)?;
        }

        Ok(())
    }

    fn play_checked(&mut self, token: &str) -> Result<(), BoardError> {
        match self.play_move(token)? {
            LastMove::Played => Ok(()),
            LastMove::Rejected { attackers } => Err(BoardError::KingLeftInCheck {
                notation: token.to_owned(),
                attackers,
            }),
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::new()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for rank in core::ranks().rev() {
            for file in core::files() {
                match self.piece_at(Square::of(rank, file)) {
                    Some(piece) => write!(f, " {} ", piece.as_char())?,
                    None => write!(f, " . ")?,
                }
            }

            writeln!(f, "| {}", rank)?;
        }

        for _ in core::files() {
            write!(f, "---")?;
        }

        writeln!(f)?;
        for file in core::files() {
            write!(f, " {} ", file)?;
        }

        writeln!(f)
    }
}

/// See [`Board::diagram`].
pub struct Diagram<'a> {
    board: &'a Board,
    unicode: bool,
    labels: bool,
}

impl fmt::Display for Diagram<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.labels {
            write!(f, " ")?;
            for file in core::files() {
                write!(f, " {}", file)?;
            }

            writeln!(f)?;
        }

        for rank in core::ranks().rev() {
            if self.labels {
                write!(f, "{}", rank)?;
            }

            for file in core::files() {
                let symbol = match self.board.piece_at(Square::of(rank, file)) {
                    Some(piece) if self.unicode => piece.kind().as_symbol(piece.color()),
                    Some(piece) => piece.as_char(),
                    None => '-',
                };

                if self.labels || file != core::FILE_A {
                    write!(f, " ")?;
                }

                write!(f, "{}", symbol)?;
            }

            writeln!(f)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::board::{Board, BoardError, Endgame, LastMove};
    use crate::core::*;
    use crate::fen;

    fn squares(list: &[Square]) -> SquareSet {
        list.iter().copied().collect()
    }

    mod import {
        use super::*;
        use crate::state::{PieceRecord, StateError, StateRecord};

        const POSITIONS: &[&str] = &[
            fen::START_POSITION,
            "r6r/1b2k1bq/8/8/7B/8/8/R3K2R b QK - 3 2",
            "8/8/8/2k5/2pP4/8/B7/4K3 b - d3 5 3",
            "r1bqkbnr/pppppppp/n7/8/8/P7/1PPPPPPP/RNBQKBNR w QqKk - 2 2",
            "r3k2r/p1pp1pb1/bn2Qnp1/2qPN3/1p2P3/2N5/PPPBBPPP/R3K2R b QqKk - 3 2",
            "rnb2k1r/pp1Pbppp/2p5/q7/2B5/8/PPPQNnPP/RNB1K2R w QK - 3 9",
            "2r5/3pk3/8/2P5/8/2K5/8/8 w - - 5 4",
            "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
            "8/8/1k6/2b5/2pP4/8/5K2/8 b - d3 0 1",
            "5k2/8/8/8/8/8/8/4K2R w K - 0 1",
            "r3k2r/8/3Q4/8/8/5q2/8/R3K2R b KQkq - 0 1",
            "2K2r2/4P3/8/8/8/8/8/3k4 w - - 0 1",
        ];

        #[test]
        fn fen_round_trip() {
            for &text in POSITIONS {
                let board = Board::from_fen(text).unwrap();
                let expected = fen::build(&fen::parse(text).unwrap());
                assert_eq!(board.as_fen(), expected, "{}", text);
            }
        }

        #[test]
        fn record_round_trip() {
            for &text in POSITIONS {
                let record = fen::parse(text).unwrap();
                let board = Board::from_record(&record).unwrap();
                assert_eq!(
                    board.to_record().normalized(),
                    record.normalized(),
                    "{}",
                    text
                );
            }
        }

        #[test]
        fn start_position() {
            let board = Board::new();
            assert_eq!(board.as_fen(), fen::START_POSITION);
            assert_eq!(board.pieces().count(), 32);
            assert_eq!(board.side_to_move(), Color::White);
            assert_eq!(board.fullmove_number(), 1);
            assert!(board.last_move().is_none());
        }

        #[test]
        fn invalid_fen() {
            assert!(matches!(
                Board::from_fen("defo_invalid"),
                Err(BoardError::Fen(_))
            ));
        }

        #[test]
        fn missing_king() {
            let record = StateRecord {
                pieces: vec![PieceRecord::new(PieceKind::King, Color::White, E1)],
                side_to_move: Color::White,
                halfmove_clock: 0,
                fullmove_number: 1,
            };

            assert!(matches!(
                Board::from_record(&record),
                Err(BoardError::MalformedState(StateError::MissingKing(
                    Color::Black
                )))
            ));
        }

        #[test]
        fn failed_reset_keeps_position() {
            let mut board = Board::new();
            board.play("e4").unwrap();
            let before = board.as_fen();
            let mut record = board.to_record();
            record.pieces.retain(|p| p.kind != PieceKind::King);
            assert!(board.reset(Some(&record)).is_err());
            assert_eq!(board.as_fen(), before);
        }

        #[test]
        fn diagram() {
            let board = Board::new();
            let plain = board.diagram(false, false).to_string();
            assert_eq!(plain.lines().next(), Some("r n b q k b n r"));
            assert_eq!(plain.lines().nth(4), Some("- - - - - - - -"));

            let fancy = board.diagram(true, true).to_string();
            let lines: Vec<_> = fancy.lines().collect();
            assert_eq!(lines.len(), 9);
            assert_eq!(lines[0], "  a b c d e f g h");
            assert_eq!(lines[1], "8 ♜ ♞ ♝ ♛ ♚ ♝ ♞ ♜");
            assert_eq!(lines[7], "2 ♙ ♙ ♙ ♙ ♙ ♙ ♙ ♙");
        }

        #[test]
        fn idle_side_in_check() {
            assert!(matches!(
                Board::from_fen("4k3/8/8/8/8/8/8/4RK2 w - - 0 1"),
                Err(BoardError::MalformedState(StateError::IdleKingInCheck(
                    Color::Black
                )))
            ));

            let mut board = Board::new();
            let record = fen::parse("4k3/8/8/8/8/8/8/4RK2 w - - 0 1").unwrap();
            assert!(board.reset(Some(&record)).is_err());
            assert_eq!(board.as_fen(), fen::START_POSITION);
        }

        #[test]
        fn reset_to_start() {
            let mut board = Board::from_fen("5k2/8/8/8/8/8/8/4K2R w K - 0 1").unwrap();
            board.reset(None).unwrap();
            assert_eq!(board.as_fen(), fen::START_POSITION);
        }

        #[test]
        fn display() {
            let board = Board::new();
            let text = board.to_string();
            let mut lines = text.lines();
            assert_eq!(lines.next(), Some(" r  n  b  q  k  b  n  r | 8"));
            assert_eq!(lines.last(), Some(" a  b  c  d  e  f  g  h "));
        }
    }

    mod legal {
        use super::*;

        const EN_PASSANT: &str = "8/8/8/2k5/2pP4/8/B7/4K3 b - d3 5 3";
        const MIDDLEGAME: &str =
            "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10";
        const KING_IN_CHECK: &str = "r6r/1b2k1bq/8/8/7B/8/8/R3K2R b QK - 3 2";

        #[test]
        fn start_position() {
            let board = Board::new();
            assert_eq!(board.legal_moves(A7), squares(&[A6, A5]));
            assert_eq!(board.legal_moves(A2), squares(&[A3, A4]));
            assert_eq!(board.legal_moves(B8), squares(&[A6, C6]));
            assert_eq!(board.legal_moves(B1), squares(&[A3, C3]));
            for sq in [C8, C1, A8, A1, D8, D1, E8, E1] {
                assert!(board.legal_moves(sq).is_empty(), "{}", sq);
            }

            assert!(board.legal_moves(E4).is_empty());
        }

        #[test]
        fn en_passant_position() {
            let board = Board::from_fen(EN_PASSANT).unwrap();
            assert_eq!(board.legal_moves(D4), squares(&[C5, D5]));
            assert_eq!(board.legal_moves(A2), squares(&[B3, C4, B1]));
            assert_eq!(board.legal_moves(C4), squares(&[C3, D3]));
            assert_eq!(
                board.legal_moves(C5),
                squares(&[B4, B5, B6, C6, D6, D5, D4])
            );
            assert_eq!(board.legal_moves(E1), squares(&[D1, D2, E2, F2, F1]));
            assert!(board.is_in_check(Color::Black));
            assert_eq!(board.check_attackers(Color::Black), vec![D4]);
        }

        #[test]
        fn two_sliders() {
            let board = Board::from_fen("4r2k/8/8/b7/8/8/8/4K3 w - - 0 1").unwrap();
            let attackers: SquareSet = board
                .check_attackers(Color::White)
                .into_iter()
                .collect();
            assert_eq!(attackers, squares(&[A5, E8]));
            assert_eq!(board.legal_moves(E1), squares(&[D1, F1, F2]));
        }

        #[test]
        fn contact_check() {
            let mut board = Board::from_fen("k7/8/8/8/8/8/4r3/4K3 w - - 0 1").unwrap();
            assert_eq!(board.check_attackers(Color::White), vec![E2]);
            assert_eq!(board.legal_moves(E1), squares(&[D1, F1, E2]));
            assert_eq!(board.turn(E1, E2, None).unwrap(), LastMove::Played);
            assert_eq!(board.lost_pieces().count(), 1);
        }

        #[test]
        fn protected_contact_check() {
            let mut board = Board::from_fen("k3r3/8/8/8/8/8/4r3/4K3 w - - 0 1").unwrap();
            assert_eq!(board.check_attackers(Color::White), vec![E2]);
            assert_eq!(board.legal_moves(E1), squares(&[D1, F1]));
            assert!(matches!(
                board.turn(E1, E2, None),
                Err(BoardError::InvalidDestination { from: E1, to: E2 })
            ));
        }

        #[test]
        fn middlegame() {
            let board = Board::from_fen(MIDDLEGAME).unwrap();
            assert_eq!(board.legal_moves(A6), squares(&[A5]));
            assert_eq!(board.legal_moves(A3), squares(&[A4]));
            assert_eq!(
                board.legal_moves(C5),
                squares(&[D4, E3, F2, B4, A3, B6, A7])
            );
            assert_eq!(
                board.legal_moves(C4),
                squares(&[B5, A6, D5, E6, F7, B3, A2])
            );
            assert_eq!(board.legal_moves(F8), squares(&[E8, D8, C8, B8]));
            assert_eq!(board.legal_moves(F1), squares(&[E1, D1, C1, B1]));
            assert_eq!(board.legal_moves(E7), squares(&[E6, E8, D7, D8]));
            assert_eq!(board.legal_moves(E2), squares(&[E1, E3, D1, D2]));
            assert_eq!(board.legal_moves(F6), squares(&[D7, D5, E8, H5, E4]));
            assert_eq!(board.legal_moves(F3), squares(&[D4, D2, E1, H4, E5]));
            assert_eq!(board.legal_moves(G8), squares(&[H8]));
            assert_eq!(board.legal_moves(G1), squares(&[H1]));
        }

        #[test]
        fn king_in_check() {
            let board = Board::from_fen(KING_IN_CHECK).unwrap();
            assert_eq!(
                board.legal_moves(A8),
                squares(&[G8, F8, E8, D8, C8, B8, A7, A6, A5, A4, A3, A2, A1])
            );
            assert_eq!(
                board.legal_moves(A1),
                squares(&[B1, C1, D1, A8, A7, A6, A5, A4, A3, A2])
            );
            assert_eq!(
                board.legal_moves(H7),
                squares(&[H6, H5, H4, G6, F5, E4, D3, C2, B1, G8])
            );

            // d8 lies on the bishop's line behind the king
            assert_eq!(
                board.legal_moves(E7),
                squares(&[D6, D7, E8, F8, F7, E6])
            );
            assert!(board.is_in_check(Color::Black));
            assert_eq!(board.check_attackers(Color::Black), vec![H4]);
            assert!(!board.is_in_check(Color::White));
        }

        #[test]
        fn safe_moves_respect_pins() {
            let mut board = Board::from_fen("4k3/4r3/8/8/8/8/4N3/4K3 w - - 0 1").unwrap();
            let before = board.as_fen();
            let safe = board.safe_moves().unwrap();
            assert!(safe.iter().all(|&(from, _)| from == E1));
            assert_eq!(safe.len(), 4);
            assert_eq!(board.as_fen(), before);
            assert_eq!(board.legal_moves(E2).len(), 6);
        }

        #[test]
        fn update_is_idempotent() {
            let mut board = Board::from_fen(MIDDLEGAME).unwrap();
            let before: Vec<_> = board.pieces().cloned().collect();
            board.update();
            let after: Vec<_> = board.pieces().cloned().collect();
            assert_eq!(before, after);
        }
    }

    mod turn {
        use super::*;

        #[test]
        fn plain_move() {
            let mut board = Board::new();
            assert_eq!(board.turn(G1, F3, None).unwrap(), LastMove::Played);
            assert_eq!(board.side_to_move(), Color::Black);
            assert_eq!(board.halfmove_clock(), 1);
            assert_eq!(board.fullmove_number(), 1);
            assert!(!board.is_occupied(G1));
            assert_eq!(board.piece_at(F3).unwrap().kind(), PieceKind::Knight);
            assert_eq!(board.piece_at(F3).unwrap().move_count(), 1);

            board.turn(E7, E5, None).unwrap();
            assert_eq!(board.side_to_move(), Color::White);
            assert_eq!(board.halfmove_clock(), 0);
            assert_eq!(board.fullmove_number(), 2);
            assert_eq!(board.last_move(), Some(&LastMove::Played));
        }

        #[test]
        fn errors_leave_board_untouched() {
            let mut board = Board::new();
            assert!(matches!(
                board.turn(E4, E5, None),
                Err(BoardError::NoPieceAt(E4))
            ));
            assert!(matches!(
                board.turn(E7, E5, None),
                Err(BoardError::WrongSide {
                    square: E7,
                    color: Color::Black,
                    to_move: Color::White
                })
            ));
            assert!(matches!(
                board.turn(E2, E5, None),
                Err(BoardError::InvalidDestination { from: E2, to: E5 })
            ));
            assert!(matches!(
                board.turn(E2, E4, Some('x')),
                Err(BoardError::InvalidPromotionChoice('x'))
            ));
            assert!(matches!(
                board.turn(E2, E4, Some('K')),
                Err(BoardError::KingPromotion)
            ));
            assert_eq!(board.as_fen(), fen::START_POSITION);
        }

        #[test]
        fn king_cannot_be_captured() {
            let mut board = Board::from_fen("4k3/8/8/8/8/8/8/4RK2 b - - 0 1").unwrap();
            board.players.switch();
            board.update();
            let before = board.as_fen();
            assert!(board.legal_moves(E1).contains(E8));
            assert!(matches!(
                board.turn(E1, E8, None),
                Err(BoardError::KingCapture(E8))
            ));
            assert_eq!(board.as_fen(), before);
            assert!(board.king(Color::Black).is_some());
            assert!(!board.safe_moves().unwrap().contains(&(E1, E8)));
        }

        #[test]
        fn discovered_double_attack_is_rejected() {
            let mut board = Board::from_fen("7k/8/8/K7/8/R1b5/8/r7 w - - 0 1").unwrap();
            assert_eq!(board.check_attackers(Color::White), vec![C3]);
            let before = board.as_fen();
            let outcome = board.turn(A3, B3, None).unwrap();
            assert_eq!(outcome, LastMove::Rejected { attackers: vec![C3, A1] });
            assert_eq!(board.as_fen(), before);
            assert_eq!(board.check_attackers(Color::White), vec![C3]);
        }

        #[test]
        fn pinned_piece_is_rejected() {
            let mut board = Board::from_fen("4k3/4r3/8/8/8/8/4N3/4K3 w - - 0 1").unwrap();
            let before = board.as_fen();
            let outcome = board.turn(E2, C3, None).unwrap();
            assert_eq!(outcome, LastMove::Rejected { attackers: vec![E7] });
            assert!(!outcome.is_success());
            assert_eq!(board.last_move(), Some(&outcome));
            assert_eq!(board.as_fen(), before);
            assert_eq!(board.piece_at(E2).unwrap().move_count(), 0);
            assert_eq!(board.side_to_move(), Color::White);
        }

        #[test]
        fn rejected_move_keeps_castling_rights() {
            let mut board = Board::from_fen("4k3/8/8/8/8/8/8/r3K2R w K - 0 1").unwrap();
            assert!(board.is_in_check(Color::White));
            let legal = board.legal_moves(H1);
            let outcome = board.turn(H1, H5, None).unwrap();
            assert_eq!(outcome, LastMove::Rejected { attackers: vec![A1] });
            assert_eq!(board.as_fen(), "4k3/8/8/8/8/8/8/r3K2R w K - 0 1");
            assert_eq!(board.legal_moves(H1), legal);
        }

        #[test]
        fn capture_resets_clock() {
            let mut board = Board::from_fen("4k3/8/8/3p4/8/8/8/3RK3 w - - 7 20").unwrap();
            board.turn(D1, D5, None).unwrap();
            assert_eq!(board.halfmove_clock(), 0);
            assert_eq!(board.pieces().count(), 3);
            let lost: Vec<_> = board.lost_pieces().collect();
            assert_eq!(lost.len(), 1);
            assert_eq!(lost[0].kind(), PieceKind::Pawn);
            assert_eq!(lost[0].square(), None);
        }

        #[test]
        fn en_passant_capture() {
            let mut board = Board::new();
            board.play("e4 a6 e5 d5").unwrap();
            assert!(board.legal_moves(E5).contains(D6));
            assert!(board.as_fen().contains(" d6 "));

            board.play("exd6").unwrap();
            assert!(!board.is_occupied(D5));
            assert_eq!(board.piece_at(D6).unwrap().color(), Color::White);
            assert_eq!(board.lost_pieces().count(), 1);
            assert_eq!(board.halfmove_clock(), 0);
        }

        #[test]
        fn en_passant_window_closes() {
            let mut board = Board::new();
            board.play("e4 a6 e5 d5 h3 h6").unwrap();
            assert_eq!(board.legal_moves(E5), squares(&[E6]));
            assert!(board.as_fen().contains(" - "));
        }

        #[test]
        fn pinned_en_passant_is_rejected() {
            // taking on e3 would open the fourth rank between the rook and the king
            let mut board = Board::from_fen("8/8/8/8/k2pP2R/8/8/4K3 b - e3 0 1").unwrap();
            assert!(board.legal_moves(D4).contains(E3));
            let outcome = board.turn(D4, E3, None).unwrap();
            assert_eq!(outcome, LastMove::Rejected { attackers: vec![H4] });
            assert_eq!(board.piece_at(E4).unwrap().kind(), PieceKind::Pawn);
        }

        #[test]
        fn castling() {
            let mut board = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
            assert!(board.legal_moves(E1).contains(G1));
            assert!(board.legal_moves(E1).contains(C1));
            board.turn(E1, G1, None).unwrap();
            assert_eq!(board.piece_at(G1).unwrap().kind(), PieceKind::King);
            assert_eq!(board.piece_at(F1).unwrap().kind(), PieceKind::Rook);
            assert!(!board.is_occupied(H1));
            assert_eq!(board.as_fen(), "r3k2r/8/8/8/8/8/8/R4RK1 b kq - 1 1");

            board.play("O-O-O").unwrap();
            assert_eq!(board.as_fen(), "2kr3r/8/8/8/8/8/8/R4RK1 w - - 2 2");
        }

        #[test]
        fn castling_through_attack_is_disabled() {
            let board = Board::from_fen("r3k2r/8/3Q4/8/8/5q2/8/R3K2R b KQkq - 0 1").unwrap();
            assert!(!board.legal_moves(E8).contains(G8));
            assert!(!board.legal_moves(E8).contains(C8));
            assert!(!board.legal_moves(E1).contains(G1));
            assert!(!board.legal_moves(E1).contains(C1));
            // the rights themselves survive
            assert!(board.as_fen().contains(" KQkq "));
        }

        #[test]
        fn rook_and_king_moves_revoke_rights() {
            let mut board = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
            board.turn(H1, H2, None).unwrap();
            assert!(board.as_fen().contains(" Qkq "));
            board.turn(A8, A7, None).unwrap();
            assert!(board.as_fen().contains(" Qk "));
            board.turn(E1, E2, None).unwrap();
            assert!(board.as_fen().contains(" k "));
        }

        #[test]
        fn promotion_with_choice() {
            let mut board = Board::from_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1").unwrap();
            board.turn(A7, A8, Some('n')).unwrap();
            let knight = board.piece_at(A8).unwrap();
            assert_eq!(knight.kind(), PieceKind::Knight);
            assert_eq!(knight.color(), Color::White);
            assert!(knight.is_promoted());
            assert_eq!(board.promoted_pieces().count(), 1);
            assert_eq!(board.lost_pieces().count(), 1);
            assert_eq!(board.pawn_needs_promotion(), None);
            assert_eq!(board.as_fen(), "N7/7k/8/8/8/8/8/K7 b - - 0 1");
        }

        #[test]
        fn promotion_pending() {
            let mut board = Board::from_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1").unwrap();
            board.turn(A7, A8, None).unwrap();
            assert_eq!(board.pawn_needs_promotion(), Some(A8));
            assert!(matches!(
                board.promote_pawn('k'),
                Err(BoardError::KingPromotion)
            ));
            board.promote_pawn('Q').unwrap();
            assert_eq!(board.piece_at(A8).unwrap().kind(), PieceKind::Queen);
            assert_eq!(board.pawn_needs_promotion(), None);
            assert!(matches!(
                board.promote_pawn('q'),
                Err(BoardError::NoPendingPromotion)
            ));
            assert_eq!(board.as_fen(), "Q7/7k/8/8/8/8/8/K7 b - - 0 1");
        }
    }

    mod endgame {
        use super::*;
        use crate::state::StateError;

        #[test]
        fn fools_mate() {
            let mut board = Board::new();
            board.play("f3 e5 g4 Qh4#").unwrap();
            assert!(board.is_in_check(Color::White));
            assert_eq!(board.check_attackers(Color::White), vec![H4]);
            let before = board.as_fen();
            assert_eq!(board.check_endgame().unwrap(), Some(Endgame::Checkmate));
            assert_eq!(board.as_fen(), before);
        }

        #[test]
        fn stalemate() {
            let mut board = Board::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
            assert!(!board.is_in_check(Color::Black));
            assert_eq!(board.check_endgame().unwrap(), Some(Endgame::Stalemate));
        }

        #[test]
        fn check_is_not_mate() {
            let mut board = Board::from_fen("4k3/8/8/8/8/8/8/K3R3 b - - 0 1").unwrap();
            assert!(board.is_in_check(Color::Black));
            assert_eq!(board.check_endgame().unwrap(), None);
        }

        #[test]
        fn start_is_not_over() {
            let mut board = Board::new();
            assert_eq!(board.check_endgame().unwrap(), None);
            assert_eq!(board.safe_moves().unwrap().len(), 20);
        }

        #[test]
        fn missing_king_is_an_error() {
            let mut board = Board::from_fen("4k3/8/8/8/8/8/8/4RK2 b - - 0 1").unwrap();
            let king = board.pieces.king(Color::Black).unwrap();
            board.positions.set(E8, None);
            board.pieces.remove(king);
            assert!(matches!(
                board.check_endgame(),
                Err(BoardError::MalformedState(StateError::MissingKing(
                    Color::Black
                )))
            ));
        }

        #[test]
        fn display() {
            assert_eq!(Endgame::Checkmate.to_string(), "checkmate");
            assert_eq!(Endgame::Stalemate.to_string(), "stalemate");
        }
    }

    mod notation {
        use super::*;
        use crate::notation::NotationError;

        #[test]
        fn pgn() {
            let mut board = Board::new();
            board
                .play_pgn("1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 1-0")
                .unwrap();
            assert_eq!(board.side_to_move(), Color::White);
            assert_eq!(board.fullmove_number(), 4);
            assert_eq!(board.piece_at(B5).unwrap().kind(), PieceKind::Bishop);
        }

        #[test]
        fn ambiguous() {
            let mut board = Board::from_fen("4k3/8/8/8/8/8/8/1N2KN2 w - - 0 1").unwrap();
            let err = board.play("Nd2").unwrap_err();
            assert!(matches!(
                err,
                BoardError::Notation(NotationError::Ambiguous { .. })
            ));
            board.play("Nfd2").unwrap();
            assert_eq!(board.piece_at(D2).unwrap().kind(), PieceKind::Knight);
            assert!(board.is_occupied(B1));
            assert!(!board.is_occupied(F1));
        }

        #[test]
        fn no_candidate() {
            let mut board = Board::new();
            assert!(matches!(
                board.play("Qh5"),
                Err(BoardError::Notation(NotationError::NoCandidate(_)))
            ));
            assert!(matches!(
                board.play("O-O"),
                Err(BoardError::Notation(NotationError::CastlingNotLegal(_)))
            ));
        }

        #[test]
        fn exposing_the_king() {
            let mut board = Board::from_fen("4k3/4r3/8/8/8/8/4N3/4K3 w - - 0 1").unwrap();
            let err = board.play("Nc3").unwrap_err();
            match err {
                BoardError::KingLeftInCheck {
                    notation,
                    attackers,
                } => {
                    assert_eq!(notation, "Nc3");
                    assert_eq!(attackers, vec![E7]);
                }
                other => panic!("unexpected error: {}", other),
            }
        }
    }

    mod players {
        use super::*;
        use crate::player::{PlayerKind, RandomMover};

        #[test]
        fn human_to_move_is_a_no_op() {
            let mut board = Board::new();
            board.set_player(
                Color::Black,
                PlayerKind::Computer(Box::new(RandomMover::new(9))),
            );
            assert_eq!(board.do_computer_move().unwrap(), None);
            assert_eq!(board.as_fen(), fen::START_POSITION);
        }

        #[test]
        fn computer_replies() {
            let mut board = Board::new();
            board.set_player(
                Color::Black,
                PlayerKind::Computer(Box::new(RandomMover::new(9))),
            );
            board.play("e4").unwrap();
            assert_eq!(board.do_computer_move().unwrap(), Some(LastMove::Played));
            assert_eq!(board.side_to_move(), Color::White);
            assert_eq!(board.fullmove_number(), 2);
        }

        #[test]
        fn reset_keeps_player_kinds() {
            let mut board = Board::new();
            board.set_player(
                Color::White,
                PlayerKind::Computer(Box::new(RandomMover::new(1))),
            );
            board.reset(None).unwrap();
            assert!(!board.players().get(Color::White).is_human());
            assert!(board.players().get(Color::Black).is_human());
        }
    }
}
