use crate::domain::board::Board;
use crate::domain::models::{Color, Move, PlayerToken, SessionId};
use crate::domain::snapshot::{Snapshot, board_view};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

/// Errors raised while playing. The display text is what the player sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("not your turn")]
    NotYourTurn,
    #[error("invalid move")]
    InvalidMove,
    #[error("waiting for an opponent")]
    AwaitingOpponent,
    #[error("player {0} is not part of this session")]
    UnknownPlayer(PlayerToken),
}

pub type SnapshotSender = mpsc::UnboundedSender<Snapshot>;
pub type SnapshotReceiver = mpsc::UnboundedReceiver<Snapshot>;

/// A connected participant. Dropping it closes its outbound channel, which
/// tells the connection's write loop to hang up.
#[derive(Debug)]
pub struct Player {
    pub token: PlayerToken,
    pub session: Option<SessionId>,
    pub color: Color,
    outbound: SnapshotSender,
}

impl Player {
    pub fn new(token: PlayerToken, outbound: SnapshotSender) -> Self {
        Self {
            token,
            session: None,
            color: Color::Black,
            outbound,
        }
    }

    pub fn send(&self, snapshot: Snapshot) {
        if self.outbound.send(snapshot).is_err() {
            debug!(player = %self.token, "outbound channel already closed, snapshot dropped");
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    AwaitingSecondPlayer,
    InProgress,
}

/// One two-player game: the board, its occupants and whose move it is.
pub struct GameSession {
    id: SessionId,
    board: Board,
    players: HashMap<PlayerToken, Player>,
    turn: Option<PlayerToken>,
}

impl GameSession {
    /// Seats `host` in a fresh session and draws its first screen.
    pub fn new(id: SessionId, mut host: Player) -> Self {
        host.session = Some(id.clone());
        let turn = host.color.is_white().then(|| host.token.clone());

        let mut players = HashMap::with_capacity(2);
        players.insert(host.token.clone(), host);

        let session = Self {
            id,
            board: Board::new(),
            players,
            turn,
        };
        session.redraw_all_screens();
        session
    }

    /// Seats the second player. Callers check `is_full` first.
    pub fn add_second_player(&mut self, mut player: Player) {
        debug_assert!(!self.is_full(), "session {} already has two players", self.id);
        player.session = Some(self.id.clone());
        if player.color.is_white() && self.turn.is_none() {
            self.turn = Some(player.token.clone());
        }
        self.players.insert(player.token.clone(), player);
        self.redraw_all_screens();
    }

    /// Applies one move and redraws the affected screens. A rejected move is
    /// reported to the mover only; the board and turn are left as they were.
    pub fn handle_move(&mut self, mv: &Move) -> Result<(), GameError> {
        if !self.players.contains_key(&mv.mover) {
            return Err(GameError::UnknownPlayer(mv.mover.clone()));
        }

        match self.apply_move(mv) {
            Ok(()) => {
                self.redraw_all_screens();
                Ok(())
            }
            Err(err) => {
                self.draw_screen(&mv.mover, &err.to_string());
                Err(err)
            }
        }
    }

    fn apply_move(&mut self, mv: &Move) -> Result<(), GameError> {
        if self.status() == SessionStatus::AwaitingSecondPlayer {
            return Err(GameError::AwaitingOpponent);
        }
        if self.turn.as_ref() != Some(&mv.mover) {
            return Err(GameError::NotYourTurn);
        }

        self.board.relocate(&mv.from, &mv.to)?;
        self.turn = self.opponent_of(&mv.mover).cloned();
        Ok(())
    }

    fn opponent_of(&self, token: &PlayerToken) -> Option<&PlayerToken> {
        self.players.keys().find(|other| *other != token)
    }

    pub fn snapshot_for(&self, token: &PlayerToken, msg: &str) -> Option<Snapshot> {
        let player = self.players.get(token)?;
        Some(Snapshot {
            game_id: self.id.to_string(),
            is_game_started: self.status() == SessionStatus::InProgress,
            is_white: player.color.is_white(),
            is_turn: self.turn.as_ref() == Some(token),
            board: board_view(&self.board),
            msg: msg.to_string(),
        })
    }

    pub fn redraw_all_screens(&self) {
        for (token, player) in &self.players {
            if let Some(snapshot) = self.snapshot_for(token, "") {
                player.send(snapshot);
            }
        }
    }

    pub fn draw_screen(&self, token: &PlayerToken, msg: &str) {
        if let (Some(player), Some(snapshot)) =
            (self.players.get(token), self.snapshot_for(token, msg))
        {
            player.send(snapshot);
        }
    }

    /// Removes every occupant, closing their outbound channels.
    pub fn close(&mut self) -> Vec<PlayerToken> {
        self.turn = None;
        self.players.drain().map(|(token, _)| token).collect()
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn status(&self) -> SessionStatus {
        if self.players.len() == 2 {
            SessionStatus::InProgress
        } else {
            SessionStatus::AwaitingSecondPlayer
        }
    }

    /// The color left for whoever takes the free seat.
    pub fn open_color(&self) -> Color {
        self.players
            .values()
            .next()
            .map_or(Color::White, |seated| seated.color.opponent())
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= 2
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn turn_holder(&self) -> Option<&PlayerToken> {
        self.turn.as_ref()
    }
}
