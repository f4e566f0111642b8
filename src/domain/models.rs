use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const BOARD_SIDE: i32 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opponent(&self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    pub fn is_white(&self) -> bool {
        matches!(self, Color::White)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PieceType {
    Pawn,
    Rook,
    Knight,
    Bishop,
    Queen,
    King,
}

impl PieceType {
    pub fn name(&self) -> &'static str {
        match self {
            PieceType::Pawn => "pawn",
            PieceType::Rook => "rook",
            PieceType::Knight => "knight",
            PieceType::Bishop => "bishop",
            PieceType::Queen => "queen",
            PieceType::King => "king",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Piece {
    pub piece_type: PieceType,
    pub owner: Color,
}

impl Piece {
    pub fn new(piece_type: PieceType, owner: Color) -> Self {
        Self { piece_type, owner }
    }

    pub fn name(&self) -> &'static str {
        self.piece_type.name()
    }

    pub fn is_white(&self) -> bool {
        self.owner.is_white()
    }
}

/// A square on the board. Signed so that off-board requests survive decoding
/// and can be rejected as invalid moves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn is_on_board(&self) -> bool {
        (0..BOARD_SIDE).contains(&self.row) && (0..BOARD_SIDE).contains(&self.col)
    }

    /// Array indices for this square, if it is on the board.
    pub fn index(&self) -> Option<(usize, usize)> {
        self.is_on_board()
            .then(|| (self.row as usize, self.col as usize))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

macro_rules! token_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

token_type!(
    /// Identifies one game session.
    SessionId
);
token_type!(
    /// Identifies one connected participant.
    PlayerToken
);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Move {
    pub mover: PlayerToken,
    pub from: Position,
    pub to: Position,
}
