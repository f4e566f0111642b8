use crate::domain::models::{Position, SessionId};
use serde::Deserialize;

/// One message from a client. Every field is always present on the wire, so
/// the fields are evaluated in order to decide what was asked for.
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PlayerAction {
    pub start_game: bool,
    pub join_game: String,
    #[serde(rename = "move")]
    pub mv: MoveRequest,
}

#[derive(Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct MoveRequest {
    pub from: Position,
    pub to: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    StartGame,
    JoinGame(SessionId),
    Move { from: Position, to: Position },
}

impl From<PlayerAction> for ClientAction {
    fn from(action: PlayerAction) -> Self {
        if action.start_game {
            ClientAction::StartGame
        } else if !action.join_game.is_empty() {
            ClientAction::JoinGame(SessionId::from(action.join_game))
        } else {
            ClientAction::Move {
                from: action.mv.from,
                to: action.mv.to,
            }
        }
    }
}

impl PlayerAction {
    /// Decodes one text or binary frame.
    pub fn parse(bytes: impl AsRef<[u8]>) -> Result<ClientAction, serde_json::Error> {
        serde_json::from_slice::<PlayerAction>(bytes.as_ref()).map(ClientAction::from)
    }
}
