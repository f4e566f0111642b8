use crate::domain::game::GameError;
use crate::domain::models::{BOARD_SIDE, Color, Piece, PieceType, Position};
use std::fmt;

const SIDE: usize = BOARD_SIDE as usize;

const BACK_RANK: [PieceType; SIDE] = [
    PieceType::Rook,
    PieceType::Knight,
    PieceType::Bishop,
    PieceType::Queen,
    PieceType::King,
    PieceType::Bishop,
    PieceType::Knight,
    PieceType::Rook,
];

/// Fixed 8x8 grid. Row 0 is black's back rank, row 7 is white's.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    cells: [[Option<Piece>; SIDE]; SIDE],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new_empty() -> Self {
        Board {
            cells: [[None; SIDE]; SIDE],
        }
    }

    pub fn new() -> Self {
        let mut board = Self::new_empty();
        board.setup_standard_chess();
        board
    }

    fn setup_standard_chess(&mut self) {
        for (file, piece_type) in BACK_RANK.iter().enumerate() {
            self.cells[0][file] = Some(Piece::new(*piece_type, Color::Black));
            self.cells[1][file] = Some(Piece::new(PieceType::Pawn, Color::Black));
            self.cells[SIDE - 2][file] = Some(Piece::new(PieceType::Pawn, Color::White));
            self.cells[SIDE - 1][file] = Some(Piece::new(*piece_type, Color::White));
        }
    }

    pub fn get_piece(&self, pos: &Position) -> Option<Piece> {
        let (row, col) = pos.index()?;
        self.cells[row][col]
    }

    /// Moves whatever stands on `from` to `to`, overwriting the destination.
    /// Only the board edges are checked. Returns the piece that was overwritten.
    pub fn relocate(&mut self, from: &Position, to: &Position) -> Result<Option<Piece>, GameError> {
        let (from_row, from_col) = from.index().ok_or(GameError::InvalidMove)?;
        let (to_row, to_col) = to.index().ok_or(GameError::InvalidMove)?;
        let piece = self.cells[from_row][from_col].ok_or(GameError::InvalidMove)?;

        self.cells[from_row][from_col] = None;
        let captured = self.cells[to_row][to_col].replace(piece);
        Ok(captured)
    }

    /// Row-major iteration over every cell.
    pub fn rows(&self) -> impl Iterator<Item = &[Option<Piece>; SIDE]> {
        self.cells.iter()
    }

    pub fn piece_count(&self) -> usize {
        self.cells.iter().flatten().filter(|cell| cell.is_some()).count()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.cells {
            for cell in row {
                let symbol = match cell {
                    None => '.',
                    Some(piece) => {
                        let c = match piece.piece_type {
                            PieceType::Pawn => 'p',
                            PieceType::Rook => 'r',
                            PieceType::Knight => 'n',
                            PieceType::Bishop => 'b',
                            PieceType::Queen => 'q',
                            PieceType::King => 'k',
                        };
                        if piece.is_white() { c.to_ascii_uppercase() } else { c }
                    }
                };
                write!(f, "{}", symbol)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(row: i32, col: i32) -> Position {
        Position::new(row, col)
    }

    #[test]
    fn test_relocate_clears_source_and_fills_destination() {
        let mut board = Board::new();
        let captured = board.relocate(&pos(6, 0), &pos(4, 0)).unwrap();

        assert!(captured.is_none());
        assert!(board.get_piece(&pos(6, 0)).is_none());
        assert_eq!(
            board.get_piece(&pos(4, 0)),
            Some(Piece::new(PieceType::Pawn, Color::White))
        );
    }

    #[test]
    fn test_relocate_overwrites_any_occupant() {
        let mut board = Board::new();
        // Own piece: no capture rules apply.
        let captured = board.relocate(&pos(7, 0), &pos(6, 0)).unwrap();

        assert_eq!(captured, Some(Piece::new(PieceType::Pawn, Color::White)));
        assert_eq!(board.piece_count(), 31);
    }

    #[test]
    fn test_relocate_rejects_off_board_destination() {
        let mut board = Board::new();
        let before = board.clone();

        assert_eq!(board.relocate(&pos(6, 0), &pos(8, 0)), Err(GameError::InvalidMove));
        assert_eq!(board.relocate(&pos(6, 0), &pos(5, -1)), Err(GameError::InvalidMove));
        assert_eq!(board, before);
    }

    #[test]
    fn test_relocate_rejects_empty_source() {
        let mut board = Board::new();
        let before = board.clone();

        assert_eq!(board.relocate(&pos(3, 3), &pos(3, 4)), Err(GameError::InvalidMove));
        assert_eq!(board, before);
    }

    #[test]
    fn test_display_layout() {
        let board = Board::new();
        let rendered = board.to_string();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines[0], "rnbqkbnr");
        assert_eq!(lines[1], "pppppppp");
        assert_eq!(lines[3], "........");
        assert_eq!(lines[6], "PPPPPPPP");
        assert_eq!(lines[7], "RNBQKBNR");
    }

    #[test]
    fn test_display_follows_relocation() {
        let mut board = Board::new();
        board
            .relocate(&Position::new(6, 4), &Position::new(4, 4))
            .unwrap();

        let rendered = board.to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[4], "....P...");
        assert_eq!(lines[6], "PPPP.PPP");
    }
}
