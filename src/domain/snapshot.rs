use crate::domain::board::Board;
use crate::domain::models::Piece;
use serde::{Deserialize, Serialize};

/// One board cell as the client sees it. Empty cells serialize as `{}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PieceView {
    Occupied { is_white: bool, name: String },
    Empty {},
}

impl From<Option<Piece>> for PieceView {
    fn from(cell: Option<Piece>) -> Self {
        match cell {
            Some(piece) => PieceView::Occupied {
                is_white: piece.is_white(),
                name: piece.name().to_string(),
            },
            None => PieceView::Empty {},
        }
    }
}

/// The full contents of one player's screen, recomputed after every change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub game_id: String,
    pub is_game_started: bool,
    pub is_white: bool,
    pub is_turn: bool,
    pub board: Vec<Vec<PieceView>>,
    pub msg: String,
}

impl Snapshot {
    /// A message for a player that is not seated in any session.
    pub fn notice(msg: impl Into<String>) -> Self {
        Self {
            game_id: String::new(),
            is_game_started: false,
            is_white: false,
            is_turn: false,
            board: Vec::new(),
            msg: msg.into(),
        }
    }

    pub fn piece_at(&self, row: usize, col: usize) -> Option<&PieceView> {
        self.board.get(row)?.get(col)
    }
}

pub fn board_view(board: &Board) -> Vec<Vec<PieceView>> {
    board
        .rows()
        .map(|row| row.iter().map(|cell| PieceView::from(*cell)).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_cells_serialize_as_empty_objects() {
        let view = board_view(&Board::new());
        let value = serde_json::to_value(&view).unwrap();

        assert_eq!(value[3][3], json!({}));
        assert_eq!(value[0][4], json!({"is_white": false, "name": "king"}));
        assert_eq!(value[7][3], json!({"is_white": true, "name": "queen"}));
    }

    #[test]
    fn snapshot_uses_wire_field_names() {
        let snapshot = Snapshot {
            game_id: "g".to_string(),
            is_game_started: true,
            is_white: true,
            is_turn: false,
            board: board_view(&Board::new()),
            msg: "not your turn".to_string(),
        };
        let value = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(value["game_id"], "g");
        assert_eq!(value["is_game_started"], true);
        assert_eq!(value["is_white"], true);
        assert_eq!(value["is_turn"], false);
        assert_eq!(value["msg"], "not your turn");
        assert_eq!(value["board"].as_array().unwrap().len(), 8);
    }

    #[test]
    fn piece_views_decode_back() {
        let cells: Vec<PieceView> =
            serde_json::from_str(r#"[{}, {"is_white": true, "name": "rook"}]"#).unwrap();

        assert_eq!(cells[0], PieceView::Empty {});
        assert_eq!(
            cells[1],
            PieceView::Occupied {
                is_white: true,
                name: "rook".to_string()
            }
        );
    }
}
