// Copyright 2017-2022 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The two sides of a game and who is making their decisions.

use std::fmt;

use rand::{rngs::SmallRng, seq::SliceRandom, SeedableRng};

use crate::board::Board;
use crate::core::{Color, PieceKind};
use crate::uci::EngineError;

/// Something that can pick a move for the side to move in a position.
pub trait MoveSuggester {
    /// Returns a move in long algebraic notation (`e2e4`, `e7e8q`) for the position `fen`.
    fn best_move(&mut self, fen: &str) -> Result<String, EngineError>;
}

pub enum PlayerKind {
    Human,
    Computer(Box<dyn MoveSuggester>),
}

impl fmt::Debug for PlayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerKind::Human => write!(f, "Human"),
            PlayerKind::Computer(_) => write!(f, "Computer"),
        }
    }
}

#[derive(Debug)]
pub struct Player {
    color: Color,
    kind: PlayerKind,
}

impl Player {
    pub fn human(color: Color) -> Player {
        Player {
            color,
            kind: PlayerKind::Human,
        }
    }

    pub fn computer(color: Color, suggester: Box<dyn MoveSuggester>) -> Player {
        Player {
            color,
            kind: PlayerKind::Computer(suggester),
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn kind(&self) -> &PlayerKind {
        &self.kind
    }

    pub fn is_human(&self) -> bool {
        matches!(self.kind, PlayerKind::Human)
    }

    pub fn suggester(&mut self) -> Option<&mut dyn MoveSuggester> {
        match &mut self.kind {
            PlayerKind::Human => None,
            PlayerKind::Computer(suggester) => Some(suggester.as_mut()),
        }
    }
}

/// Both players and whose turn it is.
#[derive(Debug)]
pub struct Players {
    white: Player,
    black: Player,
    current: Color,
}

impl Players {
    pub fn new() -> Players {
        Players {
            white: Player::human(Color::White),
            black: Player::human(Color::Black),
            current: Color::White,
        }
    }

    pub fn to_move(&self) -> Color {
        self.current
    }

    pub fn get(&self, color: Color) -> &Player {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    pub fn get_mut(&mut self, color: Color) -> &mut Player {
        match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }

    pub fn current(&self) -> &Player {
        self.get(self.current)
    }

    pub fn current_mut(&mut self) -> &mut Player {
        self.get_mut(self.current)
    }

    pub fn idle(&self) -> &Player {
        self.get(self.current.toggle())
    }

    pub fn set(&mut self, color: Color, kind: PlayerKind) {
        *self.get_mut(color) = Player { color, kind };
    }

    pub fn set_current(&mut self, color: Color) {
        self.current = color;
    }

    pub fn switch(&mut self) {
        self.current = self.current.toggle();
    }
}

impl Default for Players {
    fn default() -> Self {
        Players::new()
    }
}

/// Plays a uniformly random move among those that do not leave its own king in check. Pawns
/// reaching the last rank always become queens.
pub struct RandomMover {
    rng: SmallRng,
}

impl RandomMover {
    pub fn new(seed: u64) -> RandomMover {
        RandomMover {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> RandomMover {
        RandomMover {
            rng: SmallRng::from_entropy(),
        }
    }
}

impl MoveSuggester for RandomMover {
    fn best_move(&mut self, fen: &str) -> Result<String, EngineError> {
        let invalid = |e: crate::board::BoardError| EngineError::InvalidPosition(e.to_string());
        let mut board = Board::from_fen(fen).map_err(invalid)?;
        let moves = board.safe_moves().map_err(invalid)?;
        let &(from, to) = moves
            .choose(&mut self.rng)
            .ok_or(EngineError::NoLegalMoves)?;
        let promotes = board.piece_at(from).map_or(false, |piece| {
            piece.kind() == PieceKind::Pawn && to.rank() == piece.color().promotion_rank()
        });

        if promotes {
            Ok(format!("{}{}q", from, to))
        } else {
            Ok(format!("{}{}", from, to))
        }
    }
}
